// Boards and the registration of their card collections.

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::access;
use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::codec::{self, FieldKind};
use crate::database::schema;
use crate::database::{Entity, ListQuery, Row, RowShape};
use crate::error::ApiError;
use crate::filter::FilterWhereInfo;
use crate::middleware::{ApiResult, Reply};
use crate::state::AppState;

use super::{acquire, begin, escaped, listing, CREATE, DELETE, EDIT, READ};

pub(crate) const BOARD_FIELDS: &[(&str, FieldKind)] = &[
    ("title", FieldKind::Title),
    ("description", FieldKind::Textarea),
    ("start_date", FieldKind::Date),
    ("end_date", FieldKind::Date),
    ("board_date", FieldKind::Date),
    ("board_date_gmt", FieldKind::Date),
    ("workspace_id", FieldKind::Number),
];

const WRITABLE: &[(&str, FieldKind)] = &[
    ("title", FieldKind::Title),
    ("description", FieldKind::Textarea),
    ("start_date", FieldKind::Date),
    ("end_date", FieldKind::Date),
];

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::collection(READ, "boards", Permission::Public, handler(list)),
        RouteSpec::resource(READ, "boards", "board_id", Permission::Public, handler(show)),
        RouteSpec::collection(CREATE, "boards", Permission::Create, handler(create))
            .arg(ArgSpec::text("title"))
            .arg(ArgSpec::text("description"))
            .arg(ArgSpec::text("start_date"))
            .arg(ArgSpec::text("end_date")),
        RouteSpec::resource(EDIT, "boards", "board_id", Permission::Update, handler(update))
            .arg(ArgSpec::bool("is_global")),
        RouteSpec::resource(DELETE, "boards", "board_id", Permission::Delete, handler(delete)),
        RouteSpec::resource(CREATE, "boardTable", "board_id", Permission::Create, handler(create_table)),
        RouteSpec::resource(DELETE, "boardTable", "board_id", Permission::Delete, handler(drop_table)),
    ]
}

fn by_board(board_id: i64) -> [FilterWhereInfo; 1] {
    [FilterWhereInfo::eq("board_id", board_id)]
}

/// GET boards
async fn list(state: AppState, req: RouteRequest) -> ApiResult {
    let store = state.store(Entity::Board);
    let query = ListQuery::new()
        .order(req.order(store.schema())?)
        .paginate(req.pagination());

    let mut conn = acquire(&state).await?;
    let page = store.list(&mut conn, &query).await?;
    Ok(listing(page, RowShape::List, "board_id", BOARD_FIELDS))
}

/// GET boards/{board_id} - the board plus its visibility and public URL
async fn show(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let mut conn = acquire(&state).await?;
    let mut board = state.store(Entity::Board).get_one(&mut conn, &by_board(board_id)).await?;

    codec::escape_row(&mut board, BOARD_FIELDS);
    access::enrich(&mut conn, &state.db, &state.config.site, board_id, &mut board).await?;
    Ok(Reply::json(Value::Object(board)))
}

/// POST boards - board, access record and surface in one transaction
async fn create(state: AppState, req: RouteRequest) -> ApiResult {
    let mut data = req.sanitized(WRITABLE);
    data.insert("workspace_id".to_string(), Value::from(0));

    let board_id = access::create_board(&state.db, data).await?;
    Ok(Reply::added("board_id", board_id))
}

/// PUT boards/{board_id} - `is_global` flips visibility in the same transaction
async fn update(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let mut data = req.sanitized(WRITABLE);
    data.insert("board_id".to_string(), Value::from(board_id));
    let global = req
        .get("is_global")
        .filter(|_| req.has("is_global"))
        .map(|v| codec::sanitize(v, FieldKind::Checkbox) == Value::Bool(true));

    let mut tx = begin(&state).await?;
    state.store(Entity::Board).update(&mut *tx, data, "board_id").await?;
    if let Some(global) = global {
        access::apply_access(&mut *tx, &state.db, board_id, global).await?;
    }
    tx.commit().await?;

    Ok(Reply::updated(json!({ "board_id": board_id })))
}

/// DELETE boards/{board_id} - cascades to everything the board owns
async fn delete(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    access::delete_board(&state.db, board_id).await?;
    Ok(Reply::deleted(json!({ "board_id": board_id })))
}

/// POST boardTable/{board_id}
async fn create_table(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let mut conn = acquire(&state).await?;
    state.store(Entity::Board).get_one(&mut conn, &by_board(board_id)).await?;

    let tables = state.store(Entity::CardTable);
    if tables.find(&mut conn, &by_board(board_id)).await?.is_some() {
        warn!("Card table for board {} is already registered", board_id);
        return Err(ApiError::conflict("Table already exists. It's not possible to recreate the table."));
    }

    let table_name = schema::table_name(state.db.prefix(), "", Some(board_id));
    let mut data = Row::new();
    data.insert("board_id".to_string(), Value::from(board_id));
    data.insert("table_name".to_string(), Value::String(table_name.clone()));
    tables.insert(&mut conn, data).await?;

    info!("Registered card table {}", table_name);
    Ok(Reply::message(
        "Successfully, created the board.",
        json!({ "board_id": board_id, "table_name": table_name }),
    ))
}

/// DELETE boardTable/{board_id} - the board's cards go with the registration
async fn drop_table(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;

    let mut tx = begin(&state).await?;
    let removed = state.store(Entity::CardTable).delete(&mut *tx, &by_board(board_id)).await?;
    if removed == 0 {
        return Err(ApiError::not_found("Table doesn't exists."));
    }
    let cards = state.store(Entity::Card).delete(&mut *tx, &by_board(board_id)).await?;
    tx.commit().await?;

    info!("Dropped card table of board {} with {} cards", board_id, cards);
    Ok(Reply::deleted(json!({ "board_id": board_id, "cards": cards })))
}

/// Registered card collection of a board, or 404
pub(crate) async fn ensure_card_table(
    state: &AppState,
    conn: &mut sqlx::AnyConnection,
    board_id: i64,
) -> Result<(), ApiError> {
    match state.store(Entity::CardTable).find(conn, &by_board(board_id)).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Table doesn't exists.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::filter::Pagination;
    use crate::license::fake::FakeLicenseClient;
    use crate::testing::TestContext;
    use std::sync::Arc;

    async fn state() -> AppState {
        let ctx = TestContext::new().await.unwrap();
        AppState::new(ctx.db, ctx.config, Arc::new(FakeLicenseClient::default()))
    }

    fn request(params: Value) -> RouteRequest {
        RouteRequest::new(params.as_object().cloned().unwrap(), Session::anonymous(), Pagination::new(1, 10))
    }

    #[tokio::test]
    async fn create_then_show_enriches() {
        let state = state().await;
        create(state.clone(), request(json!({"title": "<b>Launch</b>", "description": "<p>go</p>"})))
            .await
            .unwrap();

        let Reply::Json(board) = show(state.clone(), request(json!({"board_id": 1}))).await.unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(board["title"], "Launch");
        assert_eq!(board["description"], "<p>go</p>");
        assert_eq!(board["is_global"], false);
        assert!(board["public_url"].as_str().unwrap().starts_with(&state.config.site.home_url));
    }

    #[tokio::test]
    async fn update_toggles_visibility() {
        let state = state().await;
        create(state.clone(), request(json!({"title": "Roadmap"}))).await.unwrap();
        update(state.clone(), request(json!({"board_id": 1, "is_global": "true"}))).await.unwrap();

        let Reply::Json(board) = show(state.clone(), request(json!({"board_id": 1}))).await.unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(board["is_global"], true);

        let missing = update(state, request(json!({"board_id": 9, "title": "x"}))).await.unwrap_err();
        assert_eq!(missing.status_code(), 404);
    }

    #[tokio::test]
    async fn card_table_registers_once() {
        let state = state().await;
        let unknown = create_table(state.clone(), request(json!({"board_id": 1}))).await.unwrap_err();
        assert_eq!(unknown.status_code(), 404);

        create(state.clone(), request(json!({"title": "Cards"}))).await.unwrap();
        create_table(state.clone(), request(json!({"board_id": 1}))).await.unwrap();
        let again = create_table(state.clone(), request(json!({"board_id": 1}))).await.unwrap_err();
        assert_eq!(again.error_code(), "conflict");
        assert_eq!(again.status_code(), 403);

        drop_table(state.clone(), request(json!({"board_id": 1}))).await.unwrap();
        let gone = drop_table(state, request(json!({"board_id": 1}))).await.unwrap_err();
        assert_eq!(gone.message(), "Table doesn't exists.");
    }
}
