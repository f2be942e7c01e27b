//! The publishable page paired with each board.

use chrono::{Local, Months};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::AnyConnection;
use uuid::Uuid;

use crate::config::SiteConfig;
use crate::database::schema::DATE_FORMAT;
use crate::database::{Database, Entity, RecordStore, Row, StoreError};
use crate::filter::FilterWhereInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Private,
    Publish,
}

impl SurfaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceStatus::Private => "private",
            SurfaceStatus::Publish => "publish",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "private" => Some(SurfaceStatus::Private),
            "publish" => Some(SurfaceStatus::Publish),
            _ => None,
        }
    }
}

/// Eight hex characters derived from the title and a random salt
pub fn make_slug(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

/// Publish date that keeps a private surface out of any "published" listing
pub fn far_future() -> String {
    let now = Local::now();
    now.checked_add_months(Months::new(12 * 100))
        .unwrap_or(now)
        .format(DATE_FORMAT)
        .to_string()
}

pub fn permalink(site: &SiteConfig, slug: &str, surface_id: i64) -> String {
    let home = site.home_url.trim_end_matches('/');
    if site.pretty_permalinks {
        format!("{}/wpn/boards/{}", home, slug)
    } else {
        format!("{}/?post_type=wpn_boards&p={}", home, surface_id)
    }
}

fn store(db: &Database) -> RecordStore {
    RecordStore::for_entity(db, Entity::Surface)
}

/// Create the private surface of a new board and return its id
pub async fn create(conn: &mut AnyConnection, db: &Database, board_id: i64, title: &str) -> Result<i64, StoreError> {
    let mut data = Row::new();
    data.insert("board_id".to_string(), Value::from(board_id));
    data.insert("title".to_string(), Value::String(title.to_string()));
    data.insert("slug".to_string(), Value::String(make_slug(title)));
    data.insert("status".to_string(), Value::String(SurfaceStatus::Private.as_str().to_string()));
    data.insert("publish_date".to_string(), Value::String(far_future()));
    store(db).insert_id(conn, data).await
}

pub async fn find(conn: &mut AnyConnection, db: &Database, surface_id: i64) -> Result<Option<Row>, StoreError> {
    store(db).find(conn, &[FilterWhereInfo::eq("surface_id", surface_id)]).await
}

pub async fn find_by_slug(conn: &mut AnyConnection, db: &Database, slug: &str) -> Result<Option<Row>, StoreError> {
    store(db).find(conn, &[FilterWhereInfo::eq("slug", slug)]).await
}

/// Publishing stamps the current time; going private pushes the date a century out
pub async fn set_status(
    conn: &mut AnyConnection,
    db: &Database,
    surface_id: i64,
    status: SurfaceStatus,
) -> Result<(), StoreError> {
    let publish_date = match status {
        SurfaceStatus::Publish => Local::now().format(DATE_FORMAT).to_string(),
        SurfaceStatus::Private => far_future(),
    };
    let mut data = Row::new();
    data.insert("surface_id".to_string(), Value::from(surface_id));
    data.insert("status".to_string(), Value::String(status.as_str().to_string()));
    data.insert("publish_date".to_string(), Value::String(publish_date));
    store(db).update(conn, data, "surface_id").await
}

pub async fn delete_for_board(conn: &mut AnyConnection, db: &Database, board_id: i64) -> Result<u64, StoreError> {
    store(db).delete(conn, &[FilterWhereInfo::eq("board_id", board_id)]).await
}
