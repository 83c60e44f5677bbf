use std::sync::Arc;

use db::DBService;
use services::services::profile_sync::ProfileSync;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    sync: Arc<ProfileSync<DBService>>,
}

impl AppState {
    pub fn new(sync: ProfileSync<DBService>) -> Self {
        Self {
            sync: Arc::new(sync),
        }
    }

    pub fn sync(&self) -> &ProfileSync<DBService> {
        &self.sync
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.sync.store().pool
    }
}
