// Routes outside the namespace: service info, health and the public board page.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::access::{self, surface, SurfaceStatus};
use crate::auth::Session;
use crate::codec::{self, FieldKind};
use crate::database::{Entity, ListQuery, Page};
use crate::error::ApiError;
use crate::filter::{FilterOrderInfo, FilterWhereInfo, Pagination, SortDirection};
use crate::state::AppState;

use super::acquire;
use super::boards::BOARD_FIELDS;
use super::cards::CARD_FIELDS;
use super::phases::PHASE_FIELDS;

const PAGE_PHASES: i64 = 15;
const PAGE_CARDS: i64 = 100;

/// GET /
pub async fn service_info(State(state): State<AppState>) -> Json<Value> {
    let base = state.config.route_base();
    Json(json!({
        "name": "Nakama API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Kanban boards, phases, cards and tasks over a relational store",
        "namespace": base,
        "endpoints": {
            "boards": format!("{}/boards[/:board_id]", base),
            "phases": format!("{}/phases[/:phase_id]", base),
            "cards": format!("{}/cards[/:card_id], {}/kanbancards, {}/uniquecards", base, base, base),
            "tasks": format!("{}/tasks[/:task_id], {}/taskslists[/:taskslist_id]", base, base),
            "access": format!("{}/boardaccess/:board_id, {}/boardTable/:board_id", base, base),
            "settings": format!("{}/options, {}/license", base, base),
            "public": "/wpn/boards/:slug",
        }
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": now, "database": "ok" })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "timestamp": now, "database": "unavailable" })),
            )
        }
    }
}

fn by_position() -> Option<FilterOrderInfo> {
    Some(FilterOrderInfo { column: "position".to_string(), sort: SortDirection::Asc })
}

fn rows(page: Page, fields: &[(&str, FieldKind)]) -> Value {
    let rows = page.rows.into_iter().map(|mut row| {
        codec::escape_row(&mut row, fields);
        Value::Object(row)
    });
    Value::Array(rows.collect())
}

/// GET /wpn/boards/{slug} - a private board is only shown to a signed-in session
pub async fn board_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    session: Option<Extension<Session>>,
) -> Result<Json<Value>, ApiError> {
    let session = session.map(|Extension(s)| s).unwrap_or_default();
    let not_found = || ApiError::not_found("Board not found");

    let mut conn = acquire(&state).await?;
    let page = surface::find_by_slug(&mut conn, &state.db, slug.trim())
        .await?
        .ok_or_else(not_found)?;
    let published = page.get("status").and_then(Value::as_str).and_then(SurfaceStatus::parse) == Some(SurfaceStatus::Publish);
    if !published && !session.is_logged_in() {
        return Err(not_found());
    }
    let board_id = page.get("board_id").and_then(Value::as_i64).ok_or_else(not_found)?;

    let mut board = state
        .store(Entity::Board)
        .get_one(&mut conn, &[FilterWhereInfo::eq("board_id", board_id)])
        .await?;
    codec::escape_row(&mut board, BOARD_FIELDS);
    access::enrich(&mut conn, &state.db, &state.config.site, board_id, &mut board).await?;

    let phases = state
        .store(Entity::Phase)
        .list(
            &mut conn,
            &ListQuery::new()
                .filter("board_id", board_id)
                .order(by_position())
                .paginate(Pagination::new(1, PAGE_PHASES)),
        )
        .await?;
    let cards = state
        .store(Entity::Card)
        .list(
            &mut conn,
            &ListQuery::new()
                .filter("board_id", board_id)
                .order(by_position())
                .paginate(Pagination::new(1, PAGE_CARDS)),
        )
        .await?;

    Ok(Json(json!({
        "board": board,
        "phases": rows(phases, PHASE_FIELDS),
        "cards": rows(cards, CARD_FIELDS),
    })))
}
