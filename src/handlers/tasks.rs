use serde_json::{json, Value};

use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::codec::FieldKind;
use crate::database::{Entity, ListQuery, RowShape, StoreError};
use crate::filter::FilterWhereInfo;
use crate::middleware::{ApiResult, Reply};
use crate::state::AppState;

use super::{acquire, escaped, listing, CREATE, DELETE, EDIT, READ};

const FIELDS: &[(&str, FieldKind)] = &[
    ("content", FieldKind::Textarea),
    ("board_id", FieldKind::Number),
    ("card_id", FieldKind::Number),
    ("user_id", FieldKind::Number),
    ("position", FieldKind::Number),
    ("is_completed", FieldKind::Checkbox),
];

/// Columns a task listing may be narrowed by, AND-combined
const FILTERS: [&str; 3] = ["board_id", "card_id", "user_id"];

pub fn routes() -> Vec<RouteSpec> {
    let numbers = |spec: RouteSpec| {
        ["board_id", "card_id", "user_id", "position"]
            .into_iter()
            .fold(spec, |spec, name| spec.arg(ArgSpec::number(name)))
    };
    let filters = FILTERS
        .into_iter()
        .fold(RouteSpec::collection(READ, "tasks", Permission::Public, handler(list)), |spec, name| {
            spec.arg(ArgSpec::number(name).nonzero())
        });
    vec![
        filters,
        RouteSpec::resource(READ, "tasks", "task_id", Permission::Public, handler(show)),
        numbers(RouteSpec::collection(CREATE, "tasks", Permission::Create, handler(create)))
            .arg(ArgSpec::text("content"))
            .arg(ArgSpec::bool("is_completed")),
        numbers(RouteSpec::resource(EDIT, "tasks", "task_id", Permission::Update, handler(update)))
            .arg(ArgSpec::bool("is_completed")),
        RouteSpec::resource(DELETE, "tasks", "task_id", Permission::Delete, handler(delete)),
    ]
}

/// GET tasks
async fn list(state: AppState, req: RouteRequest) -> ApiResult {
    let store = state.store(Entity::Task);
    let mut query = ListQuery::new()
        .order(req.order(store.schema())?)
        .paginate(req.pagination());
    for column in FILTERS {
        if let Some(id) = req.opt_id(column)? {
            query = query.filter(column, id);
        }
    }

    let mut conn = acquire(&state).await?;
    let page = store.list(&mut conn, &query).await?;
    Ok(listing(page, RowShape::List, "task_id", FIELDS))
}

/// GET tasks/{task_id}
async fn show(state: AppState, req: RouteRequest) -> ApiResult {
    let task_id = req.id("task_id")?;
    let mut conn = acquire(&state).await?;
    let task = state
        .store(Entity::Task)
        .get_one(&mut conn, &[FilterWhereInfo::eq("task_id", task_id)])
        .await?;
    Ok(escaped(task, FIELDS))
}

/// POST tasks
async fn create(state: AppState, req: RouteRequest) -> ApiResult {
    let data = req.sanitized(FIELDS);
    let mut conn = acquire(&state).await?;
    let task_id = state.store(Entity::Task).insert_id(&mut conn, data).await?;
    Ok(Reply::added("task_id", task_id))
}

/// PUT tasks/{task_id}
async fn update(state: AppState, req: RouteRequest) -> ApiResult {
    let task_id = req.id("task_id")?;
    let mut data = req.sanitized(FIELDS);
    data.insert("task_id".to_string(), Value::from(task_id));

    let mut conn = acquire(&state).await?;
    state.store(Entity::Task).update(&mut conn, data, "task_id").await?;
    Ok(Reply::updated(json!({ "task_id": task_id })))
}

/// DELETE tasks/{task_id}
async fn delete(state: AppState, req: RouteRequest) -> ApiResult {
    let task_id = req.id("task_id")?;
    let mut conn = acquire(&state).await?;
    let removed = state
        .store(Entity::Task)
        .delete(&mut conn, &[FilterWhereInfo::eq("task_id", task_id)])
        .await?;
    if removed == 0 {
        return Err(StoreError::NotFound.into());
    }
    Ok(Reply::deleted(json!({ "task_id": task_id })))
}
