pub mod install;
pub mod manager;
pub mod schema;
pub mod store;

pub use manager::{Database, DatabaseError, Dialect};
pub use schema::{Entity, EntitySchema};
pub use store::{ListQuery, Page, RecordStore, Row, RowShape, StoreError};
