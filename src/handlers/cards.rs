// Cards live in one table partitioned by `board_id`; writes need a registered card table.

use serde_json::{json, Value};
use tracing::info;

use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::codec::FieldKind;
use crate::database::{Entity, ListQuery, RowShape, StoreError};
use crate::error::ApiError;
use crate::filter::FilterWhereInfo;
use crate::middleware::{ApiResult, Reply};
use crate::state::AppState;

use super::boards::ensure_card_table;
use super::{acquire, begin, escaped, listing, CREATE, DELETE, EDIT, READ};

pub(crate) const CARD_FIELDS: &[(&str, FieldKind)] = &[
    ("title", FieldKind::Title),
    ("notes", FieldKind::Textarea),
    ("phase_id", FieldKind::Number),
    ("post_ids", FieldKind::Array),
    ("position", FieldKind::Number),
    ("card_deadline_date", FieldKind::Date),
    ("is_completed", FieldKind::Checkbox),
    ("card_date", FieldKind::Date),
    ("card_date_gmt", FieldKind::Date),
    ("card_modify_date", FieldKind::Date),
];

/// Client-settable subset of `CARD_FIELDS`
const WRITABLE: &[(&str, FieldKind)] = &[
    ("title", FieldKind::Title),
    ("notes", FieldKind::Textarea),
    ("phase_id", FieldKind::Number),
    ("post_ids", FieldKind::Array),
    ("position", FieldKind::Number),
    ("card_deadline_date", FieldKind::Date),
    ("is_completed", FieldKind::Checkbox),
];

pub fn routes() -> Vec<RouteSpec> {
    let board = || ArgSpec::number("board_id").required().nonzero();
    let filter = |name: &'static str| ArgSpec::number(name).nonzero();
    vec![
        RouteSpec::collection(READ, "cards", Permission::Public, handler(list)).arg(filter("board_id")),
        RouteSpec::resource(READ, "cards", "card_id", Permission::Public, handler(show)).arg(filter("board_id")),
        RouteSpec::collection(CREATE, "cards", Permission::Create, handler(create))
            .arg(board())
            .arg(ArgSpec::text("title"))
            .arg(ArgSpec::number("phase_id"))
            .arg(ArgSpec::array("post_ids"))
            .arg(ArgSpec::number("position"))
            .arg(ArgSpec::bool("is_completed")),
        RouteSpec::resource(EDIT, "cards", "card_id", Permission::Update, handler(update))
            .arg(board())
            .arg(ArgSpec::number("phase_id"))
            .arg(ArgSpec::number("position"))
            .arg(ArgSpec::bool("is_completed")),
        RouteSpec::resource(DELETE, "cards", "card_id", Permission::Delete, handler(delete)).arg(board()),
        RouteSpec::collection(DELETE, "cards", Permission::Delete, handler(delete_many))
            .arg(filter("board_id"))
            .arg(filter("phase_id")),
        RouteSpec::collection(READ, "kanbancards", Permission::Public, handler(kanban))
            .arg(filter("board_id")),
        RouteSpec::collection(DELETE, "uniquecards", Permission::Delete, handler(delete_board_cards)).arg(board()),
    ]
}

/// Shared by `cards` and `kanbancards`: optional board scope plus ordering
async fn list_cards(state: &AppState, req: &RouteRequest, shape: RowShape) -> ApiResult {
    let store = state.store(Entity::Card);
    let mut query = ListQuery::new()
        .order(req.order(store.schema())?)
        .paginate(req.pagination());

    let mut conn = acquire(state).await?;
    if let Some(board_id) = req.opt_id("board_id")? {
        ensure_card_table(state, &mut conn, board_id).await?;
        query = query.filter("board_id", board_id);
    }
    let page = store.list(&mut conn, &query).await?;
    Ok(listing(page, shape, "card_id", CARD_FIELDS))
}

/// GET cards
async fn list(state: AppState, req: RouteRequest) -> ApiResult {
    list_cards(&state, &req, RowShape::List).await
}

/// GET kanbancards - keyed by card id
async fn kanban(state: AppState, req: RouteRequest) -> ApiResult {
    list_cards(&state, &req, RowShape::Keyed).await
}

/// GET cards/{card_id} - `board_id` narrows the lookup but is not needed
async fn show(state: AppState, req: RouteRequest) -> ApiResult {
    let card_id = req.id("card_id")?;
    let mut filters = vec![FilterWhereInfo::eq("card_id", card_id)];
    if let Some(board_id) = req.opt_id("board_id")? {
        filters.push(FilterWhereInfo::eq("board_id", board_id));
    }

    let mut conn = acquire(&state).await?;
    let card = state.store(Entity::Card).get_one(&mut conn, &filters).await?;
    Ok(escaped(card, CARD_FIELDS))
}

/// POST cards
async fn create(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let mut data = req.sanitized(WRITABLE);
    data.insert("board_id".to_string(), Value::from(board_id));

    let mut tx = begin(&state).await?;
    ensure_card_table(&state, &mut *tx, board_id).await?;
    let card_id = state.store(Entity::Card).insert_id(&mut *tx, data).await?;
    tx.commit().await?;

    Ok(Reply::added("card_id", card_id))
}

/// PUT cards/{card_id} - the card must belong to `board_id`
async fn update(state: AppState, req: RouteRequest) -> ApiResult {
    let card_id = req.id("card_id")?;
    let board_id = req.id("board_id")?;
    let mut data = req.sanitized(WRITABLE);
    data.insert("card_id".to_string(), Value::from(card_id));

    let store = state.store(Entity::Card);
    let mut conn = acquire(&state).await?;
    ensure_card_table(&state, &mut conn, board_id).await?;
    store
        .get_one(
            &mut conn,
            &[FilterWhereInfo::eq("card_id", card_id), FilterWhereInfo::eq("board_id", board_id)],
        )
        .await?;
    store.update(&mut conn, data, "card_id").await?;

    Ok(Reply::updated(json!({ "card_id": card_id, "board_id": board_id })))
}

/// DELETE cards/{card_id}
async fn delete(state: AppState, req: RouteRequest) -> ApiResult {
    let card_id = req.id("card_id")?;
    let board_id = req.id("board_id")?;

    let mut tx = begin(&state).await?;
    ensure_card_table(&state, &mut *tx, board_id).await?;
    let removed = state
        .store(Entity::Card)
        .delete(
            &mut *tx,
            &[FilterWhereInfo::eq("card_id", card_id), FilterWhereInfo::eq("board_id", board_id)],
        )
        .await?;
    if removed == 0 {
        return Err(StoreError::NotFound.into());
    }
    tx.commit().await?;

    Ok(Reply::deleted(json!({ "card_id": card_id, "board_id": board_id })))
}

/// DELETE cards?board_id=&phase_id= - needs at least one of the two
async fn delete_many(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.opt_id("board_id")?;
    let phase_id = req.opt_id("phase_id")?;
    let mut filters = Vec::new();
    if let Some(id) = board_id {
        filters.push(FilterWhereInfo::eq("board_id", id));
    }
    if let Some(id) = phase_id {
        filters.push(FilterWhereInfo::eq("phase_id", id));
    }
    if filters.is_empty() {
        return Err(ApiError::invalid_value());
    }

    let mut tx = begin(&state).await?;
    let removed = state.store(Entity::Card).delete(&mut *tx, &filters).await?;
    tx.commit().await?;

    info!("Deleted {} cards (board {:?}, phase {:?})", removed, board_id, phase_id);
    Ok(Reply::deleted(json!({
        "board_id": board_id.unwrap_or(0),
        "phase_id": phase_id.unwrap_or(0),
        "cards": removed,
    })))
}

/// DELETE uniquecards?board_id= - empty a board's card table, keeping the registration
async fn delete_board_cards(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;

    let mut tx = begin(&state).await?;
    ensure_card_table(&state, &mut *tx, board_id).await?;
    let removed = state
        .store(Entity::Card)
        .delete(&mut *tx, &[FilterWhereInfo::eq("board_id", board_id)])
        .await?;
    tx.commit().await?;

    info!("Deleted {} cards of board {}", removed, board_id);
    Ok(Reply::deleted(json!({ "board_id": board_id, "cards": removed })))
}
