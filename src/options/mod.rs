//! Key-value settings persisted in the options table.

use serde_json::{json, Map, Value};
use sqlx::AnyConnection;

use crate::codec::FieldKind;
use crate::database::{Database, Entity, RecordStore, StoreError};
use crate::filter::FilterWhereInfo;

pub const UPDATE_INDICATOR: &str = "wpnakama_update_indicator";
pub const RATING: &str = "wpnakama_rating";
pub const BLOGNAME: &str = "blogname";
pub const USING_PERMALINKS: &str = "using_permalinks";
pub const LICENSE_KEY: &str = "wpnakama_license_key";
pub const LICENSE_MESSAGE: &str = "wpnakama_license_message";

/// Options the public `options` route may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicOption {
    UpdateIndicator,
    Blogname,
    Rating,
}

impl PublicOption {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            UPDATE_INDICATOR => Some(PublicOption::UpdateIndicator),
            BLOGNAME => Some(PublicOption::Blogname),
            RATING => Some(PublicOption::Rating),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PublicOption::UpdateIndicator => UPDATE_INDICATOR,
            PublicOption::Blogname => BLOGNAME,
            PublicOption::Rating => RATING,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            PublicOption::Rating => FieldKind::Array,
            _ => FieldKind::Text,
        }
    }

    /// Options a client may write through the `options` route
    pub fn writable() -> [PublicOption; 2] {
        [PublicOption::UpdateIndicator, PublicOption::Rating]
    }
}

/// Value seeded for the rating prompt on install
pub fn default_rating() -> Value {
    json!({
        "status": "not_rated",
        "last_asked": chrono::Utc::now().timestamp(),
        "times_asked": 0,
        "rate_btn_clicked": false,
    })
}

#[derive(Debug, Clone)]
pub struct OptionsStore {
    store: RecordStore,
}

impl OptionsStore {
    pub fn new(db: &Database) -> Self {
        Self { store: RecordStore::for_entity(db, Entity::Setting) }
    }

    pub async fn get(&self, conn: &mut AnyConnection, name: &str) -> Result<Option<String>, StoreError> {
        let row = self.store.find(conn, &[FilterWhereInfo::eq("option_name", name)]).await?;
        Ok(row.and_then(|r| r.get("option_value").and_then(Value::as_str).map(str::to_string)))
    }

    /// Insert or replace
    pub async fn set(&self, conn: &mut AnyConnection, name: &str, value: &str) -> Result<(), StoreError> {
        match self.store.update(conn, option_row(name, value), "option_name").await {
            Err(StoreError::NotFound) => self.store.insert(conn, option_row(name, value)).await.map(|_| ()),
            other => other,
        }
    }

    /// Insert only when the option does not exist; returns whether it was written
    pub async fn add(&self, conn: &mut AnyConnection, name: &str, value: &str) -> Result<bool, StoreError> {
        if self.get(conn, name).await?.is_some() {
            return Ok(false);
        }
        self.store.insert(conn, option_row(name, value)).await?;
        Ok(true)
    }

    pub async fn delete(&self, conn: &mut AnyConnection, name: &str) -> Result<bool, StoreError> {
        let removed = self.store.delete(conn, &[FilterWhereInfo::eq("option_name", name)]).await?;
        Ok(removed > 0)
    }
}

fn option_row(name: &str, value: &str) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("option_name".to_string(), Value::String(name.to_string()));
    row.insert("option_value".to_string(), Value::String(value.to_string()));
    row
}

/// Seed the install-time defaults; returns how many options were written
pub async fn seed_defaults(db: &Database) -> Result<usize, StoreError> {
    let options = OptionsStore::new(db);
    let mut conn = db.pool().acquire().await.map_err(|source| StoreError::WriteFailed {
        table: db.table(Entity::Setting),
        source,
    })?;

    let mut seeded = 0;
    if options.add(&mut conn, UPDATE_INDICATOR, "3").await? {
        seeded += 1;
    }
    if options.add(&mut conn, RATING, &default_rating().to_string()).await? {
        seeded += 1;
    }
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[test]
    fn whitelist_is_closed() {
        assert_eq!(PublicOption::parse("blogname"), Some(PublicOption::Blogname));
        assert_eq!(PublicOption::parse(LICENSE_KEY), None);
        assert_eq!(PublicOption::parse("siteurl"), None);
        assert_eq!(PublicOption::Rating.kind(), FieldKind::Array);
        assert!(!PublicOption::writable().contains(&PublicOption::Blogname));
    }

    #[tokio::test]
    async fn set_replaces_and_delete_removes() {
        let ctx = TestContext::new().await.unwrap();
        let options = OptionsStore::new(&ctx.db);
        let mut conn = ctx.db.pool().acquire().await.unwrap();

        options.set(&mut conn, LICENSE_KEY, "abc").await.unwrap();
        options.set(&mut conn, LICENSE_KEY, "def").await.unwrap();
        assert_eq!(options.get(&mut conn, LICENSE_KEY).await.unwrap().as_deref(), Some("def"));

        assert!(!options.add(&mut conn, LICENSE_KEY, "ghi").await.unwrap());
        assert!(options.delete(&mut conn, LICENSE_KEY).await.unwrap());
        assert!(!options.delete(&mut conn, LICENSE_KEY).await.unwrap());
        assert_eq!(options.get(&mut conn, LICENSE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn seeding_keeps_existing_values() {
        let ctx = TestContext::new().await.unwrap();
        let options = OptionsStore::new(&ctx.db);
        {
            let mut conn = ctx.db.pool().acquire().await.unwrap();
            options.set(&mut conn, UPDATE_INDICATOR, "5").await.unwrap();
        }
        assert_eq!(seed_defaults(&ctx.db).await.unwrap(), 0);

        let mut conn = ctx.db.pool().acquire().await.unwrap();
        assert_eq!(options.get(&mut conn, UPDATE_INDICATOR).await.unwrap().as_deref(), Some("5"));
    }
}
