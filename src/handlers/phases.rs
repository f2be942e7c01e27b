use serde_json::{json, Value};

use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::codec::FieldKind;
use crate::database::{Entity, ListQuery, RowShape, StoreError};
use crate::filter::FilterWhereInfo;
use crate::middleware::{ApiResult, Reply};
use crate::state::AppState;

use super::{acquire, begin, escaped, listing, CREATE, DELETE, EDIT, READ};

pub(crate) const PHASE_FIELDS: &[(&str, FieldKind)] = &[
    ("title", FieldKind::Title),
    ("board_id", FieldKind::Number),
    ("position", FieldKind::Number),
];

const EDITABLE: &[(&str, FieldKind)] = &[("title", FieldKind::Title), ("position", FieldKind::Number)];

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::collection(READ, "phases", Permission::Public, handler(list))
            .arg(ArgSpec::number("board_id").nonzero()),
        RouteSpec::resource(READ, "phases", "phase_id", Permission::Public, handler(show)),
        RouteSpec::collection(CREATE, "phases", Permission::Create, handler(create))
            .arg(ArgSpec::text("title").required())
            .arg(ArgSpec::number("board_id").required().nonzero())
            .arg(ArgSpec::number("position")),
        RouteSpec::resource(EDIT, "phases", "phase_id", Permission::Update, handler(update))
            .arg(ArgSpec::text("title"))
            .arg(ArgSpec::number("position")),
        RouteSpec::resource(DELETE, "phases", "phase_id", Permission::Delete, handler(delete)),
        RouteSpec::collection(DELETE, "phases", Permission::Delete, handler(delete_for_board))
            .arg(ArgSpec::number("board_id").required().nonzero()),
    ]
}

/// GET phases
async fn list(state: AppState, req: RouteRequest) -> ApiResult {
    let store = state.store(Entity::Phase);
    let mut query = ListQuery::new()
        .order(req.order(store.schema())?)
        .paginate(req.pagination());
    if let Some(board_id) = req.opt_id("board_id")? {
        query = query.filter("board_id", board_id);
    }

    let mut conn = acquire(&state).await?;
    let page = store.list(&mut conn, &query).await?;
    Ok(listing(page, RowShape::List, "phase_id", PHASE_FIELDS))
}

/// GET phases/{phase_id}
async fn show(state: AppState, req: RouteRequest) -> ApiResult {
    let phase_id = req.id("phase_id")?;
    let mut conn = acquire(&state).await?;
    let phase = state
        .store(Entity::Phase)
        .get_one(&mut conn, &[FilterWhereInfo::eq("phase_id", phase_id)])
        .await?;
    Ok(escaped(phase, PHASE_FIELDS))
}

/// POST phases
async fn create(state: AppState, req: RouteRequest) -> ApiResult {
    let data = req.sanitized(PHASE_FIELDS);
    let mut conn = acquire(&state).await?;
    let phase_id = state.store(Entity::Phase).insert_id(&mut conn, data).await?;
    Ok(Reply::added("phase_id", phase_id))
}

/// PUT phases/{phase_id} - moving a phase to another board is not supported
async fn update(state: AppState, req: RouteRequest) -> ApiResult {
    let phase_id = req.id("phase_id")?;
    let mut data = req.sanitized(EDITABLE);
    data.insert("phase_id".to_string(), Value::from(phase_id));

    let mut conn = acquire(&state).await?;
    state.store(Entity::Phase).update(&mut conn, data, "phase_id").await?;
    Ok(Reply::updated(json!({ "phase_id": phase_id })))
}

/// DELETE phases/{phase_id}
async fn delete(state: AppState, req: RouteRequest) -> ApiResult {
    let phase_id = req.id("phase_id")?;
    let mut conn = acquire(&state).await?;
    let removed = state
        .store(Entity::Phase)
        .delete(&mut conn, &[FilterWhereInfo::eq("phase_id", phase_id)])
        .await?;
    if removed == 0 {
        return Err(StoreError::NotFound.into());
    }
    Ok(Reply::deleted(json!({ "phase_id": phase_id })))
}

/// DELETE phases?board_id= - every phase of one board
async fn delete_for_board(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let mut tx = begin(&state).await?;
    let removed = state
        .store(Entity::Phase)
        .delete(&mut *tx, &[FilterWhereInfo::eq("board_id", board_id)])
        .await?;
    tx.commit().await?;
    Ok(Reply::deleted(json!({ "board_id": board_id, "phases": removed })))
}
