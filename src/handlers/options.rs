// Whitelisted site options readable by any client; two of them writable.

use serde_json::{json, Map, Value};
use tracing::info;

use crate::api::{handler, ArgSpec, Permission, RouteRequest, RouteSpec};
use crate::codec::{self, FieldKind};
use crate::error::ApiError;
use crate::middleware::{ApiResult, Reply};
use crate::options::{PublicOption, RATING, UPDATE_INDICATOR, USING_PERMALINKS};
use crate::state::AppState;

use super::{acquire, READ, WRITE};

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::collection(READ, "options", Permission::Public, handler(read)).arg(ArgSpec::text("option_name")),
        RouteSpec::collection(WRITE, "options", Permission::Update, handler(write))
            .arg(ArgSpec::text(UPDATE_INDICATOR))
            .arg(ArgSpec::array(RATING)),
    ]
}

/// A missing option reads as `false`
fn stored(raw: Option<String>) -> Value {
    raw.map(Value::String).unwrap_or(Value::Bool(false))
}

/// GET options - one whitelisted option, or the default bundle
async fn read(state: AppState, req: RouteRequest) -> ApiResult {
    let options = state.options();
    let mut conn = acquire(&state).await?;

    if let Some(name) = req.text("option_name").filter(|n| !n.trim().is_empty()) {
        let option = PublicOption::parse(name.trim())
            .ok_or_else(|| ApiError::invalid_value_msg("Invaild options name passed."))?;
        let value = match option {
            PublicOption::Blogname => Value::String(state.config.site.blogname.clone()),
            other => stored(options.get(&mut conn, other.name()).await?),
        };
        return Ok(Reply::json(codec::escape(&value, option.kind())));
    }

    let indicator = stored(options.get(&mut conn, UPDATE_INDICATOR).await?);
    let rating = stored(options.get(&mut conn, RATING).await?);
    Ok(Reply::json(json!({
        UPDATE_INDICATOR: codec::escape(&indicator, FieldKind::Text),
        USING_PERMALINKS: state.config.site.pretty_permalinks,
        RATING: codec::escape(&rating, FieldKind::Array),
    })))
}

/// PUT options - writes whichever writable options were supplied
async fn write(state: AppState, req: RouteRequest) -> ApiResult {
    let options = state.options();
    let mut conn = acquire(&state).await?;

    let mut written = Map::new();
    for option in PublicOption::writable() {
        let Some(value) = req.get(option.name()).filter(|_| req.has(option.name())) else {
            continue;
        };
        let value = codec::sanitize(value, option.kind());
        let text = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        options.set(&mut conn, option.name(), &text).await?;
        written.insert(option.name().to_string(), codec::escape(&value, option.kind()));
    }

    if written.is_empty() {
        return Err(ApiError::invalid_value_msg("Something, went wrong, while update the option."));
    }
    info!("Updated options: {:?}", written.keys().collect::<Vec<_>>());
    Ok(Reply::message("Successfully updated!", Value::Object(written)))
}
