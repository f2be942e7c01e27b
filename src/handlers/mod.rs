// Route handlers, one module per resource. Every route is declared in `route_table()`.

pub mod board_access;
pub mod boards;
pub mod cards;
pub mod license;
pub mod options;
pub mod phases;
pub mod public;
pub mod tasks;
pub mod taskslists;

use axum::http::Method;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::{Any, Transaction};

use crate::api::RouteTable;
use crate::codec::{self, FieldKind};
use crate::database::{Page, Row, RowShape};
use crate::error::ApiError;
use crate::middleware::Reply;
use crate::state::AppState;

pub(crate) const READ: &[Method] = &[Method::GET];
pub(crate) const CREATE: &[Method] = &[Method::POST];
pub(crate) const EDIT: &[Method] = &[Method::PUT, Method::PATCH];
/// Settings-style endpoints accept both verbs
pub(crate) const WRITE: &[Method] = &[Method::PUT, Method::POST];
pub(crate) const DELETE: &[Method] = &[Method::DELETE];

/// Every namespaced route of the service
pub fn route_table() -> RouteTable {
    let mut table = RouteTable::new();
    table
        .extend(boards::routes())
        .extend(phases::routes())
        .extend(cards::routes())
        .extend(tasks::routes())
        .extend(taskslists::routes())
        .extend(options::routes())
        .extend(board_access::routes())
        .extend(license::routes());
    table
}

pub(crate) async fn acquire(state: &AppState) -> Result<PoolConnection<Any>, ApiError> {
    Ok(state.db.pool().acquire().await?)
}

pub(crate) async fn begin(state: &AppState) -> Result<Transaction<'static, Any>, ApiError> {
    Ok(state.db.pool().begin().await?)
}

/// Escape each listed row for output and wrap the page with its totals
pub(crate) fn listing(mut page: Page, shape: RowShape, key: &str, fields: &[(&str, FieldKind)]) -> Reply {
    let (total, total_pages) = (page.total, page.total_pages);
    for row in page.rows.iter_mut() {
        codec::escape_row(row, fields);
    }
    Reply::listing(page.into_value(shape, key), total, total_pages)
}

pub(crate) fn escaped(mut row: Row, fields: &[(&str, FieldKind)]) -> Reply {
    codec::escape_row(&mut row, fields);
    Reply::json(Value::Object(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Permission, RouteShape};

    #[test]
    fn every_resource_route_captures_a_numeric_id() {
        let table = route_table();
        assert!(!table.is_empty());
        for spec in table.iter() {
            if let RouteShape::Resource { var } = spec.shape {
                assert!(var.ends_with("_id"), "{} has var {}", spec.path, var);
                let arg = spec.args.iter().find(|a| a.name == var).unwrap();
                assert!(arg.required && arg.nonzero);
            }
        }
    }

    #[test]
    fn writes_are_never_public() {
        for spec in route_table().iter() {
            let read_only = spec.methods.iter().all(|m| m == Method::GET);
            assert_eq!(read_only, spec.permission == Permission::Public, "{:?} {}", spec.methods, spec.path);
        }
    }

    #[test]
    fn patterns_do_not_collide_per_method() {
        let mut seen = std::collections::HashSet::new();
        for spec in route_table().iter() {
            for method in &spec.methods {
                assert!(seen.insert((method.clone(), spec.pattern())), "duplicate {} {}", method, spec.pattern());
            }
        }
    }
}
