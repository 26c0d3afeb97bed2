use log::*;

#[cfg(feature = "sqlite")]
use crate::SqliteDatabase;

/// Loads `.env.test` (if there is one) and initialises logging. Safe to call from every test.
pub fn prepare_test_env() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    trace!("🚀️ Test environment ready");
}

#[cfg(feature = "sqlite")]
/// A fresh, migrated, in-memory database.
///
/// Every SQLite connection to `sqlite::memory:` gets its own database, so the pool is limited to a single connection.
pub async fn memory_database() -> SqliteDatabase {
    prepare_test_env();
    let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database");
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ In-memory database ready");
    db
}
