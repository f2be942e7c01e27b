//! Route registration: verb + path pattern + permission + argument schema, compiled into an axum router.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, RawQuery, State},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::warn;

use crate::auth::{Capability, Session};
use crate::codec::{self, FieldKind};
use crate::config::ApiConfig;
use crate::database::{EntitySchema, Row};
use crate::error::ApiError;
use crate::filter::{FilterOrder, FilterOrderInfo, Pagination};
use crate::middleware::ApiResult;
use crate::state::AppState;

pub type HandlerFn = Arc<dyn Fn(AppState, RouteRequest) -> BoxFuture<'static, ApiResult> + Send + Sync>;

/// Box an `async fn(AppState, RouteRequest) -> ApiResult` into a `HandlerFn`
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(AppState, RouteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult> + Send + 'static,
{
    Arc::new(move |state, request| Box::pin(f(state, request)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Public,
    Create,
    Update,
    Delete,
}

impl Permission {
    pub fn capability(&self) -> Option<Capability> {
        match self {
            Permission::Public => None,
            Permission::Create | Permission::Update => Some(Capability::EditPosts),
            Permission::Delete => Some(Capability::DeletePosts),
        }
    }

    pub fn check(&self, session: &Session) -> Result<(), ApiError> {
        let Some(cap) = self.capability() else {
            return Ok(());
        };
        if session.can(cap) {
            return Ok(());
        }
        let action = match self {
            Permission::Create => "create",
            Permission::Update => "update",
            _ => "delete",
        };
        Err(ApiError::permission_denied(format!(
            "Do not have permission to {} entry in the database.",
            action
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteShape {
    Collection,
    /// One numeric path variable
    Resource { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Number,
    Text,
    Array,
    Bool,
}

#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub nonzero: bool,
}

impl ArgSpec {
    pub fn new(name: &'static str, kind: ArgKind) -> Self {
        Self { name, kind, required: false, nonzero: false }
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, ArgKind::Number)
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, ArgKind::Text)
    }

    pub fn array(name: &'static str) -> Self {
        Self::new(name, ArgKind::Array)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, ArgKind::Bool)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nonzero(mut self) -> Self {
        self.nonzero = true;
        self
    }

    fn validate(&self, params: &Map<String, Value>) -> Result<(), ApiError> {
        let value = match params.get(self.name) {
            Some(v) if !is_blank(v) => v,
            _ if self.required => return Err(ApiError::missing_argument(self.name)),
            _ => return Ok(()),
        };
        match self.kind {
            ArgKind::Number => {
                let n = parse_int(value).ok_or_else(|| ApiError::invalid_param(self.name, "must be an integer"))?;
                if self.nonzero && n <= 0 {
                    return Err(ApiError::invalid_value());
                }
            }
            ArgKind::Bool => {
                parse_bool(value).ok_or_else(|| ApiError::invalid_param(self.name, "must be a boolean"))?;
            }
            ArgKind::Text | ArgKind::Array => {}
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RouteSpec {
    pub methods: Vec<Method>,
    pub path: &'static str,
    pub shape: RouteShape,
    pub permission: Permission,
    pub args: Vec<ArgSpec>,
    handler: HandlerFn,
}

impl RouteSpec {
    pub fn collection(methods: &[Method], path: &'static str, permission: Permission, handler: HandlerFn) -> Self {
        Self {
            methods: methods.to_vec(),
            path,
            shape: RouteShape::Collection,
            permission,
            args: Vec::new(),
            handler,
        }
    }

    /// Route with a numeric path variable; the variable is a required nonzero argument
    pub fn resource(
        methods: &[Method],
        path: &'static str,
        var: &'static str,
        permission: Permission,
        handler: HandlerFn,
    ) -> Self {
        Self {
            methods: methods.to_vec(),
            path,
            shape: RouteShape::Resource { var },
            permission,
            args: vec![ArgSpec::number(var).required().nonzero()],
            handler,
        }
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.retain(|a| a.name != arg.name);
        self.args.push(arg);
        self
    }

    /// axum path pattern relative to the namespace base
    pub fn pattern(&self) -> String {
        match &self.shape {
            RouteShape::Collection => format!("/{}", self.path),
            RouteShape::Resource { var } => format!("/{}/:{}", self.path, var),
        }
    }

    /// Pattern in the `{var}` display form
    pub fn display_path(&self) -> String {
        match &self.shape {
            RouteShape::Collection => self.path.to_string(),
            RouteShape::Resource { var } => format!("{}/{{{}}}", self.path, var),
        }
    }

    async fn dispatch(
        &self,
        state: AppState,
        path_var: Option<String>,
        query: Option<String>,
        headers: &HeaderMap,
        session: Session,
        body: &Bytes,
    ) -> ApiResult {
        let mut params = Map::new();
        merge_query(&mut params, query.as_deref());
        merge_body(&mut params, headers, body)?;

        if let (RouteShape::Resource { var }, Some(raw)) = (&self.shape, path_var) {
            let id = parse_path_var(&raw).ok_or_else(|| ApiError::not_found("No route was found matching the URL and request method."))?;
            params.insert(var.to_string(), Value::from(id));
        }

        self.permission.check(&session)?;
        for arg in &self.args {
            arg.validate(&params)?;
        }

        let pagination = match self.shape {
            RouteShape::Collection => parse_pagination(&params, &state.config.api)?,
            RouteShape::Resource { .. } => Pagination::unbounded(),
        };

        (self.handler)(state, RouteRequest { params, session, pagination }).await
    }
}

/// Every route the service exposes, built once at startup
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteSpec>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spec: RouteSpec) -> &mut Self {
        self.routes.push(spec);
        self
    }

    pub fn extend(&mut self, specs: impl IntoIterator<Item = RouteSpec>) -> &mut Self {
        self.routes.extend(specs);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteSpec> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Specs sharing a pattern are merged into one `MethodRouter`
    pub fn into_router(self) -> Router<AppState> {
        let mut grouped: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();
        for spec in self.routes {
            let pattern = spec.pattern();
            let spec = Arc::new(spec);
            for method in spec.methods.clone() {
                let filter = match MethodFilter::try_from(method.clone()) {
                    Ok(filter) => filter,
                    Err(_) => {
                        warn!("Skipping unsupported method {} on {}", method, pattern);
                        continue;
                    }
                };
                let entry = grouped.entry(pattern.clone()).or_insert_with(MethodRouter::new);
                let current = std::mem::replace(entry, MethodRouter::new());
                *entry = match spec.shape {
                    RouteShape::Collection => current.on(filter, collection_endpoint(spec.clone())),
                    RouteShape::Resource { .. } => current.on(filter, resource_endpoint(spec.clone())),
                };
            }
        }

        grouped
            .into_iter()
            .fold(Router::new(), |router, (pattern, method_router)| router.route(&pattern, method_router))
    }
}

fn collection_endpoint(
    spec: Arc<RouteSpec>,
) -> impl Fn(State<AppState>, RawQuery, HeaderMap, Option<Extension<Session>>, Bytes) -> BoxFuture<'static, Response>
       + Clone
       + Send
       + Sync
       + 'static {
    move |State(state): State<AppState>,
          RawQuery(query): RawQuery,
          headers: HeaderMap,
          session: Option<Extension<Session>>,
          body: Bytes| {
        let spec = spec.clone();
        Box::pin(async move {
            let session = session.map(|Extension(s)| s).unwrap_or_default();
            spec.dispatch(state, None, query, &headers, session, &body).await.into_response()
        })
    }
}

#[allow(clippy::type_complexity)]
fn resource_endpoint(
    spec: Arc<RouteSpec>,
) -> impl Fn(State<AppState>, Path<String>, RawQuery, HeaderMap, Option<Extension<Session>>, Bytes) -> BoxFuture<'static, Response>
       + Clone
       + Send
       + Sync
       + 'static {
    move |State(state): State<AppState>,
          Path(var): Path<String>,
          RawQuery(query): RawQuery,
          headers: HeaderMap,
          session: Option<Extension<Session>>,
          body: Bytes| {
        let spec = spec.clone();
        Box::pin(async move {
            let session = session.map(|Extension(s)| s).unwrap_or_default();
            spec.dispatch(state, Some(var), query, &headers, session, &body).await.into_response()
        })
    }
}

/// Validated request handed to a route handler
#[derive(Debug, Clone)]
pub struct RouteRequest {
    params: Map<String, Value>,
    session: Session,
    pagination: Pagination,
}

impl RouteRequest {
    pub fn new(params: Map<String, Value>, session: Session, pagination: Pagination) -> Self {
        Self { params, session, pagination }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Present and not blank
    pub fn has(&self, name: &str) -> bool {
        self.params.get(name).is_some_and(|v| !is_blank(v))
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, ApiError> {
        match self.params.get(name) {
            Some(v) if !is_blank(v) => parse_int(v)
                .map(Some)
                .ok_or_else(|| ApiError::invalid_param(name, "must be an integer")),
            _ => Ok(None),
        }
    }

    /// Positive identifier; absent or zero is rejected
    pub fn id(&self, name: &str) -> Result<i64, ApiError> {
        match self.int(name)? {
            Some(id) if id > 0 => Ok(id),
            _ => Err(ApiError::invalid_value()),
        }
    }

    /// Positive identifier when given; absent means no filter, zero is rejected
    pub fn opt_id(&self, name: &str) -> Result<Option<i64>, ApiError> {
        match self.int(name)? {
            Some(id) if id > 0 => Ok(Some(id)),
            Some(_) => Err(ApiError::invalid_value()),
            None => Ok(None),
        }
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.params.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// `order_by` / `order` validated against the entity's columns
    pub fn order(&self, schema: &EntitySchema) -> Result<Option<FilterOrderInfo>, ApiError> {
        let Some(order_by) = self.text("order_by") else {
            return Ok(None);
        };
        let order_by = order_by.trim().to_string();
        if order_by.is_empty() {
            return Err(ApiError::invalid_value_msg("Invaild order field passed."));
        }
        let order = match self.text("order") {
            Some(o) if o.trim().is_empty() => return Err(ApiError::invalid_value_msg("Invaild order passed.")),
            Some(o) => o,
            None => "asc".to_string(),
        };
        let info = FilterOrder::validate_and_parse(&order_by, &order)?;
        if !schema.has_column(&info.column) {
            return Err(ApiError::invalid_param("order_by", format!("Unknown field {}", info.column)));
        }
        Ok(Some(info))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sanitized copy of the listed fields that were supplied
    pub fn sanitized(&self, fields: &[(&str, FieldKind)]) -> Row {
        let mut row = Row::new();
        for (name, kind) in fields {
            if let Some(value) = self.params.get(*name) {
                row.insert(name.to_string(), codec::sanitize(value, *kind));
            }
        }
        row
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_path_var(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn merge_query(params: &mut Map<String, Value>, query: Option<&str>) {
    let Some(query) = query else { return };
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params.insert(key.into_owned(), Value::String(value.into_owned()));
    }
}

fn merge_body(params: &mut Map<String, Value>, headers: &HeaderMap, body: &Bytes) -> Result<(), ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/x-www-form-urlencoded") {
        for (key, value) in url::form_urlencoded::parse(body) {
            params.insert(key.into_owned(), Value::String(value.into_owned()));
        }
        return Ok(());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => {
            params.extend(fields);
            Ok(())
        }
        Ok(_) => Err(ApiError::invalid_json("Request body must be a JSON object")),
        Err(e) => Err(ApiError::invalid_json(format!("Invalid JSON body: {}", e))),
    }
}

fn parse_pagination(params: &Map<String, Value>, api: &ApiConfig) -> Result<Pagination, ApiError> {
    let read = |name: &str, default: i64| -> Result<i64, ApiError> {
        match params.get(name) {
            Some(v) if !is_blank(v) => {
                let n = parse_int(v).ok_or_else(|| ApiError::invalid_param(name, "must be an integer"))?;
                if n < 1 {
                    return Err(ApiError::invalid_param(name, "must be greater than or equal to 1"));
                }
                Ok(n)
            }
            _ => Ok(default),
        }
    };
    let page = read("page", 1)?;
    let per_page = read("per_page", api.default_per_page)?.min(api.max_per_page);
    let pagination = Pagination::new(page, per_page);
    if pagination.checked_offset().is_none() {
        return Err(ApiError::invalid_param("page", "is out of range"));
    }
    Ok(pagination)
}
