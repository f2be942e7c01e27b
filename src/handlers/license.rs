use serde_json::{json, Value};

use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::error::ApiError;
use crate::license;
use crate::middleware::{ApiResult, Reply};
use crate::state::AppState;

use super::{acquire, CREATE, DELETE, READ, WRITE};

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::collection(READ, "license", Permission::Public, handler(status)),
        RouteSpec::collection(WRITE, "license", Permission::Update, handler(set_key))
            .arg(ArgSpec::text("license_key")),
        RouteSpec::collection(DELETE, "license", Permission::Delete, handler(delete)),
        RouteSpec::collection(CREATE, "license/activate", Permission::Update, handler(activate)),
        RouteSpec::collection(CREATE, "license/deactivate", Permission::Update, handler(deactivate)),
    ]
}

/// GET license - `{status, usage, limit}`
async fn status(state: AppState, _req: RouteRequest) -> ApiResult {
    let mut conn = acquire(&state).await?;
    let summary = license::status(&state.options(), &mut conn).await?;
    Ok(Reply::json(summary))
}

/// PUT license - validated remotely before it is stored
async fn set_key(state: AppState, req: RouteRequest) -> ApiResult {
    let key = req
        .text("license_key")
        .ok_or_else(|| ApiError::from(license::LicenseError::KeyRequired))?;
    let mut conn = acquire(&state).await?;
    license::set_key(&state.options(), &mut conn, state.license.as_ref(), &state.config.site, &key).await?;
    Ok(Reply::message("Successfully added the license key!", Value::Null))
}

/// DELETE license
async fn delete(state: AppState, _req: RouteRequest) -> ApiResult {
    let mut conn = acquire(&state).await?;
    license::delete(&state.options(), &mut conn).await?;
    Ok(Reply::message("Successfully deleted the license key!", Value::Null))
}

/// POST license/activate
async fn activate(state: AppState, _req: RouteRequest) -> ApiResult {
    let options = state.options();
    let mut conn = acquire(&state).await?;
    license::activate(&options, &mut conn, state.license.as_ref(), &state.config.site).await?;
    let summary = license::status(&options, &mut conn).await?;
    Ok(Reply::message("Successfully activated the license key!", summary))
}

/// POST license/deactivate
async fn deactivate(state: AppState, _req: RouteRequest) -> ApiResult {
    let options = state.options();
    let mut conn = acquire(&state).await?;
    license::deactivate(&options, &mut conn, state.license.as_ref()).await?;
    let summary = license::status(&options, &mut conn).await?;
    Ok(Reply::message("Successfully deactivated the license key!", summary))
}
