use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::storage::Storage;
use crate::webpush::Notifier;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub storage: Storage,
    /// None when push notifications are disabled in config.
    pub notifier: Option<Arc<Notifier>>,
}
