use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use super::{bills, new_pool, SqliteDatabaseError};
use crate::{
    db::{BillStore, StoreError},
    db_types::{Bill, BillItem, BillStatus, NewBill, Table},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object. The database file is created if it doesn't exist yet.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }

    pub async fn insert_table(&self, business_id: i64, code: &str, name: &str) -> Result<Table, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        bills::insert_table(business_id, code, name, &mut conn).await
    }

    /// Saves a new bill and its items in a single transaction and returns the stored bill.
    pub async fn insert_bill(&self, bill: NewBill) -> Result<Bill, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let id = bills::insert_bill(&bill, &mut tx).await?;
        tx.commit().await?;
        let mut conn = self.pool.acquire().await?;
        let stored = bills::fetch_bill(id, &mut conn).await?;
        let items = bills::fetch_bill_items(id, &mut conn).await?;
        Ok(stored.with_items(items))
    }

    /// Staff action: freezes the bill. Neither the event path nor the reconciliation sweep will touch it afterwards.
    pub async fn close_bill(&self, bill_id: i64) -> Result<(), SqliteDatabaseError> {
        let result = sqlx::query("UPDATE bills SET status = 'closed', updated_at = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(bill_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(SqliteDatabaseError::BillNotFound(bill_id));
        }
        Ok(())
    }
}

impl BillStore for SqliteDatabase {
    async fn fetch_bill(&self, bill_id: i64) -> Result<Bill, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(bills::fetch_bill(bill_id, &mut conn).await?)
    }

    async fn update_bill(&self, bill: &Bill) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(bills::update_payment_fields(bill, &mut conn).await?)
    }

    async fn fetch_bill_items(&self, bill_id: i64) -> Result<Vec<BillItem>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(bills::fetch_bill_items(bill_id, &mut conn).await?)
    }

    async fn fetch_bills_by_status(&self, status: BillStatus) -> Result<Vec<Bill>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(bills::fetch_bills_by_status(status, &mut conn).await?)
    }

    async fn fetch_table(&self, table_id: i64) -> Result<Table, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(bills::fetch_table(table_id, &mut conn).await?)
    }
}
