//! Board visibility: the access record, the paired surface and its permalink.
//!
//! A board is created private together with its access record and surface in one transaction,
//! and removed with everything it owns in one transaction. Tasks are not owned by the board.

pub mod surface;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::AnyConnection;
use sqlx::{Any, Transaction};
use tracing::info;

use crate::codec::{self, FieldKind};
use crate::config::SiteConfig;
use crate::database::{Database, Entity, RecordStore, Row, StoreError};
use crate::filter::FilterWhereInfo;

pub use surface::SurfaceStatus;

/// Stored in `access_value` as a serialized array blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessValue {
    #[serde(default, deserialize_with = "loose_bool")]
    pub global: bool,
    #[serde(default)]
    pub global_id: i64,
}

fn loose_bool<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(codec::sanitize(&value, FieldKind::Checkbox) == Value::Bool(true))
}

impl AccessValue {
    pub fn private(global_id: i64) -> Self {
        Self { global: false, global_id }
    }

    /// Decode a stored or client-supplied value; anything unreadable is private
    pub fn decode(raw: &Value) -> Self {
        let structured = codec::escape(raw, FieldKind::Array);
        serde_json::from_value(structured).unwrap_or_default()
    }

    pub fn encode(&self) -> Value {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        codec::sanitize(&value, FieldKind::Array)
    }
}

pub async fn begin(db: &Database) -> Result<Transaction<'static, Any>, StoreError> {
    db.pool().begin().await.map_err(|source| StoreError::WriteFailed {
        table: db.table(Entity::Board),
        source,
    })
}

async fn commit(db: &Database, tx: Transaction<'static, Any>) -> Result<(), StoreError> {
    tx.commit().await.map_err(|source| StoreError::WriteFailed {
        table: db.table(Entity::Board),
        source,
    })
}

/// Insert a board with its private surface and access record; returns the board id
pub async fn create_board(db: &Database, data: Row) -> Result<i64, StoreError> {
    let title = data.get("title").and_then(Value::as_str).unwrap_or_default().to_string();

    let mut tx = begin(db).await?;
    let board_id = RecordStore::for_entity(db, Entity::Board).insert_id(&mut *tx, data).await?;
    let surface_id = surface::create(&mut *tx, db, board_id, &title).await?;

    let mut access = Row::new();
    access.insert("board_id".to_string(), Value::from(board_id));
    access.insert("access_value".to_string(), AccessValue::private(surface_id).encode());
    RecordStore::for_entity(db, Entity::BoardAccess).insert(&mut *tx, access).await?;
    commit(db, tx).await?;

    info!("Created board {} with private surface {}", board_id, surface_id);
    Ok(board_id)
}

/// Delete a board and everything it owns; a missing board is `NotFound`
pub async fn delete_board(db: &Database, board_id: i64) -> Result<(), StoreError> {
    let by_board = [FilterWhereInfo::eq("board_id", board_id)];

    let mut tx = begin(db).await?;
    let boards = RecordStore::for_entity(db, Entity::Board);
    if boards.delete(&mut *tx, &by_board).await? == 0 {
        return Err(StoreError::NotFound);
    }
    for entity in [Entity::Phase, Entity::Card, Entity::CardTable, Entity::BoardAccess] {
        RecordStore::for_entity(db, entity).delete(&mut *tx, &by_board).await?;
    }
    surface::delete_for_board(&mut *tx, db, board_id).await?;
    commit(db, tx).await?;

    info!("Deleted board {}", board_id);
    Ok(())
}

pub async fn access_for(conn: &mut AnyConnection, db: &Database, board_id: i64) -> Result<Option<Row>, StoreError> {
    RecordStore::for_entity(db, Entity::BoardAccess)
        .find(conn, &[FilterWhereInfo::eq("board_id", board_id)])
        .await
}

/// Apply a requested visibility to the board's surface and access record.
///
/// The surface id always comes from the stored record, never from the request.
pub async fn apply_access(
    conn: &mut AnyConnection,
    db: &Database,
    board_id: i64,
    global: bool,
) -> Result<AccessValue, StoreError> {
    let stored = access_for(conn, db, board_id).await?.ok_or(StoreError::NotFound)?;
    let current = AccessValue::decode(stored.get("access_value").unwrap_or(&Value::Null));
    let next = AccessValue { global, global_id: current.global_id };

    if current.global_id > 0 {
        let status = if global { SurfaceStatus::Publish } else { SurfaceStatus::Private };
        match surface::set_status(conn, db, current.global_id, status).await {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(e),
        }
    }

    let mut data = Row::new();
    data.insert("board_id".to_string(), Value::from(board_id));
    data.insert("access_value".to_string(), next.encode());
    RecordStore::for_entity(db, Entity::BoardAccess).update(conn, data, "board_id").await?;

    if current.global != global {
        info!("Board {} is now {}", board_id, if global { "global" } else { "private" });
    }
    Ok(next)
}

/// Add `is_global`, `global_id` and `public_url` to a board row when it has an access record
pub async fn enrich(
    conn: &mut AnyConnection,
    db: &Database,
    site: &SiteConfig,
    board_id: i64,
    board: &mut Row,
) -> Result<(), StoreError> {
    let Some(stored) = access_for(conn, db, board_id).await? else {
        return Ok(());
    };
    let access = AccessValue::decode(stored.get("access_value").unwrap_or(&Value::Null));
    let slug = surface::find(conn, db, access.global_id)
        .await?
        .and_then(|s| s.get("slug").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();

    board.insert("is_global".to_string(), Value::Bool(access.global));
    board.insert("global_id".to_string(), Value::from(access.global_id));
    board.insert(
        "public_url".to_string(),
        Value::String(surface::permalink(site, &slug, access.global_id)),
    );
    Ok(())
}
