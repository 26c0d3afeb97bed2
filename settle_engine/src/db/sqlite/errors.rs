use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Bill #{0} does not exist")]
    BillNotFound(i64),
    #[error("Table #{0} does not exist")]
    TableNotFound(i64),
    #[error("Bill #{0} is closed and cannot be modified")]
    BillClosed(i64),
}

impl From<SqliteDatabaseError> for StoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::BillNotFound(id) => StoreError::BillNotFound(id),
            SqliteDatabaseError::TableNotFound(id) => StoreError::TableNotFound(id),
            SqliteDatabaseError::BillClosed(id) => StoreError::BillClosed(id),
            e => StoreError::Backend(e.to_string()),
        }
    }
}
