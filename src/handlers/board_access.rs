// Direct access to a board's visibility record.

use serde_json::{json, Value};
use tracing::warn;

use crate::access::{self, AccessValue};
use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::database::{Entity, StoreError};
use crate::error::ApiError;
use crate::filter::FilterWhereInfo;
use crate::middleware::{ApiResult, Reply};
use crate::state::AppState;

use super::{acquire, begin, DELETE, EDIT, READ};

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::resource(READ, "boardaccess", "board_id", Permission::Public, handler(show)),
        RouteSpec::resource(EDIT, "boardaccess", "board_id", Permission::Update, handler(update))
            .arg(ArgSpec::array("access_value").required()),
        RouteSpec::resource(DELETE, "boardaccess", "board_id", Permission::Delete, handler(delete)),
    ]
}

/// GET boardaccess/{board_id}
async fn show(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let mut conn = acquire(&state).await?;
    let stored = access::access_for(&mut conn, &state.db, board_id)
        .await?
        .ok_or(StoreError::NotFound)?;

    let access = AccessValue::decode(stored.get("access_value").unwrap_or(&Value::Null));
    Ok(Reply::json(json!({
        "board_id": board_id,
        "access_value": access,
        "is_global": access.global,
        "global_id": access.global_id,
    })))
}

/// PUT boardaccess/{board_id} - only `global` is taken from the request
async fn update(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let requested = AccessValue::decode(req.get("access_value").unwrap_or(&Value::Null));

    let mut tx = begin(&state).await?;
    let access = access::apply_access(&mut *tx, &state.db, board_id, requested.global).await?;
    tx.commit().await?;

    Ok(Reply::updated(json!({ "board_id": board_id, "access_value": access })))
}

/// DELETE boardaccess/{board_id} - only an orphaned record can go; a live board keeps its access
async fn delete(state: AppState, req: RouteRequest) -> ApiResult {
    let board_id = req.id("board_id")?;
    let by_board = [FilterWhereInfo::eq("board_id", board_id)];
    let mut conn = acquire(&state).await?;
    if state.store(Entity::Board).find(&mut conn, &by_board).await?.is_some() {
        warn!("Refused to delete the access record of live board {}", board_id);
        return Err(ApiError::forbidden("Board access can't be deleted while the board exists."));
    }
    let removed = state
        .store(Entity::BoardAccess)
        .delete(&mut conn, &by_board)
        .await?;
    if removed == 0 {
        return Err(StoreError::NotFound.into());
    }
    Ok(Reply::deleted(json!({ "board_id": board_id })))
}
