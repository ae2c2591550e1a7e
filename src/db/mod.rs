pub mod from_row;
pub mod queries;
mod schema;

pub use schema::{init_audit_db, init_db};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::events::EventSink;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding database pools and configuration
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (receipts, items, share tokens, disputes, settings)
    pub db: DbPool,
    /// Event sink backed by the audit database (separate file to isolate growth)
    pub events: EventSink,
    /// Base URL for verification links (e.g., https://verify.example.com)
    pub base_url: String,
    /// Payment processor API base URL, when order snapshot fetches are enabled
    pub processor_api_url: Option<String>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
