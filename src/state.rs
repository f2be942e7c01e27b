use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{Database, Entity, RecordStore};
use crate::license::LicenseClient;
use crate::options::OptionsStore;

/// Shared handles every handler receives
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub license: Arc<dyn LicenseClient>,
}

impl AppState {
    pub fn new(db: Database, config: Arc<AppConfig>, license: Arc<dyn LicenseClient>) -> Self {
        Self { db, config, license }
    }

    pub fn store(&self, entity: Entity) -> RecordStore {
        RecordStore::for_entity(&self.db, entity)
    }

    pub fn options(&self) -> OptionsStore {
        OptionsStore::new(&self.db)
    }
}
