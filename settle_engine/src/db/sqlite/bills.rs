use log::{debug, trace};
use settle_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Bill, BillItem, BillStatus, NewBill, Table},
};

const BILL_COLUMNS: &str = "id, business_id, table_id, subtotal, tax_amount, service_fee_amount, total_amount, \
                            paid_amount, tip_amount, status, created_at, updated_at";

pub async fn fetch_bill(bill_id: i64, conn: &mut SqliteConnection) -> Result<Bill, SqliteDatabaseError> {
    let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = $1");
    let bill = sqlx::query_as::<_, Bill>(&sql)
        .bind(bill_id)
        .fetch_optional(conn)
        .await?
        .ok_or(SqliteDatabaseError::BillNotFound(bill_id))?;
    trace!("🗃️ Fetched bill #{bill_id}: {} of {} paid", bill.paid_amount, bill.total_amount);
    Ok(bill)
}

pub async fn fetch_bill_items(bill_id: i64, conn: &mut SqliteConnection) -> Result<Vec<BillItem>, SqliteDatabaseError> {
    let items = sqlx::query_as::<_, BillItem>(
        "SELECT id, bill_id, name, unit_price, quantity, subtotal FROM bill_items WHERE bill_id = $1 ORDER BY id",
    )
    .bind(bill_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn fetch_bills_by_status(
    status: BillStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<Bill>, SqliteDatabaseError> {
    let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE status = $1 ORDER BY id");
    let bills = sqlx::query_as::<_, Bill>(&sql).bind(status).fetch_all(conn).await?;
    trace!("🗃️ {} bills with status {status}", bills.len());
    Ok(bills)
}

/// Overwrites the payment fields of the bill. Closed bills are left untouched and an error is returned.
pub async fn update_payment_fields(bill: &Bill, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE bills SET paid_amount = $1, tip_amount = $2, status = $3, updated_at = $4 WHERE id = $5 AND status \
         != 'closed'",
    )
    .bind(bill.paid_amount)
    .bind(bill.tip_amount)
    .bind(bill.status)
    .bind(bill.updated_at)
    .bind(bill.id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        // Either the bill doesn't exist, or it was closed underneath us
        let existing = fetch_bill(bill.id, conn).await?;
        debug!("🗃️ Refusing to update bill #{} with status {}", bill.id, existing.status);
        return Err(SqliteDatabaseError::BillClosed(bill.id));
    }
    debug!("🗃️ Bill #{} updated: paid {} tip {} [{}]", bill.id, bill.paid_amount, bill.tip_amount, bill.status);
    Ok(())
}

pub async fn fetch_table(table_id: i64, conn: &mut SqliteConnection) -> Result<Table, SqliteDatabaseError> {
    sqlx::query_as::<_, Table>("SELECT id, business_id, code, name FROM restaurant_tables WHERE id = $1")
        .bind(table_id)
        .fetch_optional(conn)
        .await?
        .ok_or(SqliteDatabaseError::TableNotFound(table_id))
}

pub async fn insert_table(
    business_id: i64,
    code: &str,
    name: &str,
    conn: &mut SqliteConnection,
) -> Result<Table, SqliteDatabaseError> {
    let table = sqlx::query_as::<_, Table>(
        "INSERT INTO restaurant_tables (business_id, code, name) VALUES ($1, $2, $3) RETURNING id, business_id, \
         code, name",
    )
    .bind(business_id)
    .bind(code)
    .bind(name)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Table {} ({}) saved with id {}", table.code, table.name, table.id);
    Ok(table)
}

/// Inserts the bill and its items. This is not atomic on its own; call it inside a transaction and pass `&mut *tx`.
pub async fn insert_bill(bill: &NewBill, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    if bill.items.iter().any(|i| i.quantity <= 0) {
        return Err(SqliteDatabaseError::QueryError("Item quantities must be positive".into()));
    }
    let subtotal = bill.subtotal();
    let total = bill.total();
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO bills (business_id, table_id, subtotal, tax_amount, service_fee_amount, total_amount) VALUES \
         ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(bill.business_id)
    .bind(bill.table_id)
    .bind(subtotal)
    .bind(bill.tax_amount)
    .bind(bill.service_fee_amount)
    .bind(total)
    .fetch_one(&mut *conn)
    .await?;
    for item in &bill.items {
        let line: Money = item.unit_price * item.quantity;
        sqlx::query("INSERT INTO bill_items (bill_id, name, unit_price, quantity, subtotal) VALUES ($1, $2, $3, $4, $5)")
            .bind(id)
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(line)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🗃️ Bill #{id} saved with {} items, total {total}", bill.items.len());
    Ok(id)
}
