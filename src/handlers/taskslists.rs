use serde_json::{json, Value};

use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::codec::FieldKind;
use crate::database::{Entity, ListQuery, RowShape, StoreError};
use crate::filter::FilterWhereInfo;
use crate::middleware::{ApiResult, Reply};
use crate::state::AppState;

use super::{acquire, escaped, listing, CREATE, DELETE, EDIT, READ};

const FIELDS: &[(&str, FieldKind)] = &[("title", FieldKind::Title), ("tasks", FieldKind::Array)];

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::collection(READ, "taskslists", Permission::Public, handler(list)),
        RouteSpec::resource(READ, "taskslists", "taskslist_id", Permission::Public, handler(show)),
        RouteSpec::collection(CREATE, "taskslists", Permission::Create, handler(create))
            .arg(ArgSpec::text("title"))
            .arg(ArgSpec::array("tasks")),
        RouteSpec::resource(EDIT, "taskslists", "taskslist_id", Permission::Update, handler(update))
            .arg(ArgSpec::text("title"))
            .arg(ArgSpec::array("tasks")),
        RouteSpec::resource(DELETE, "taskslists", "taskslist_id", Permission::Delete, handler(delete)),
    ]
}

async fn list(state: AppState, req: RouteRequest) -> ApiResult {
    let store = state.store(Entity::TasksList);
    let query = ListQuery::new()
        .order(req.order(store.schema())?)
        .paginate(req.pagination());

    let mut conn = acquire(&state).await?;
    let page = store.list(&mut conn, &query).await?;
    Ok(listing(page, RowShape::List, "taskslist_id", FIELDS))
}

async fn show(state: AppState, req: RouteRequest) -> ApiResult {
    let id = req.id("taskslist_id")?;
    let mut conn = acquire(&state).await?;
    let row = state
        .store(Entity::TasksList)
        .get_one(&mut conn, &[FilterWhereInfo::eq("taskslist_id", id)])
        .await?;
    Ok(escaped(row, FIELDS))
}

async fn create(state: AppState, req: RouteRequest) -> ApiResult {
    let data = req.sanitized(FIELDS);
    let mut conn = acquire(&state).await?;
    let id = state.store(Entity::TasksList).insert_id(&mut conn, data).await?;
    Ok(Reply::added("taskslist_id", id))
}

async fn update(state: AppState, req: RouteRequest) -> ApiResult {
    let id = req.id("taskslist_id")?;
    let mut data = req.sanitized(FIELDS);
    data.insert("taskslist_id".to_string(), Value::from(id));

    let mut conn = acquire(&state).await?;
    state.store(Entity::TasksList).update(&mut conn, data, "taskslist_id").await?;
    Ok(Reply::updated(json!({ "taskslist_id": id })))
}

async fn delete(state: AppState, req: RouteRequest) -> ApiResult {
    let id = req.id("taskslist_id")?;
    let mut conn = acquire(&state).await?;
    let removed = state
        .store(Entity::TasksList)
        .delete(&mut conn, &[FilterWhereInfo::eq("taskslist_id", id)])
        .await?;
    if removed == 0 {
        return Err(StoreError::NotFound.into());
    }
    Ok(Reply::deleted(json!({ "taskslist_id": id })))
}
