//! An in-process [`BillStore`] for tests and local experiments.
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
        Mutex,
        RwLock,
    },
    time::Duration,
};

use chrono::Utc;
use settle_common::Money;

use crate::{
    db::{BillStore, StoreError},
    db_types::{Bill, BillItem, BillStatus, NewBill, Table},
};

#[derive(Default)]
struct MemoryState {
    bills: BTreeMap<i64, Bill>,
    items: BTreeMap<i64, Vec<BillItem>>,
    tables: BTreeMap<i64, Table>,
    next_item_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryBillStore {
    state: Arc<RwLock<MemoryState>>,
    offline: Arc<AtomicBool>,
    updates: Arc<AtomicUsize>,
    update_delay: Arc<Mutex<Option<Duration>>>,
}

impl MemoryBillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every call fails with a backend error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes `update_bill` slow to return. The bill is written before the delay.
    pub fn set_update_delay(&self, delay: Option<Duration>) {
        *self.update_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// The number of successful `update_bill` calls.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn add_table(&self, id: i64, business_id: i64, code: &str) -> Table {
        let table = Table { id, business_id, code: code.to_string(), name: format!("Table {code}") };
        if let Ok(mut state) = self.state.write() {
            state.tables.insert(id, table.clone());
        }
        table
    }

    /// Stores a bill under the given id, deriving the subtotal and total from the items.
    pub fn add_bill(&self, id: i64, bill: NewBill) -> Bill {
        let now = Utc::now();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let items = bill
            .items
            .iter()
            .map(|i| {
                state.next_item_id += 1;
                BillItem::new(state.next_item_id, id, i.name.clone(), i.unit_price, i.quantity)
            })
            .collect::<Vec<_>>();
        let stored = Bill {
            id,
            business_id: bill.business_id,
            table_id: bill.table_id,
            subtotal: bill.subtotal(),
            tax_amount: bill.tax_amount,
            service_fee_amount: bill.service_fee_amount,
            total_amount: bill.total(),
            paid_amount: Money::ZERO,
            tip_amount: Money::ZERO,
            status: BillStatus::Open,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.bills.insert(id, stored.clone());
        state.items.insert(id, items.clone());
        stored.with_items(items)
    }

    /// Directly overwrites a stored bill, bypassing the closed-bill guard. Test setup only.
    pub fn put_bill(&self, bill: Bill) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.bills.insert(bill.id, Bill { items: Vec::new(), ..bill });
    }

    pub fn bill(&self, id: i64) -> Option<Bill> {
        self.state.read().ok().and_then(|s| s.bills.get(&id).cloned())
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Backend("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.check_online()?;
        let state = self.state.read().map_err(|e| StoreError::Backend(e.to_string()))?;
        f(&state)
    }
}

impl BillStore for MemoryBillStore {
    async fn fetch_bill(&self, bill_id: i64) -> Result<Bill, StoreError> {
        self.read(|s| s.bills.get(&bill_id).cloned().ok_or(StoreError::BillNotFound(bill_id)))
    }

    async fn update_bill(&self, bill: &Bill) -> Result<(), StoreError> {
        self.check_online()?;
        {
            let mut state = self.state.write().map_err(|e| StoreError::Backend(e.to_string()))?;
            let stored = state.bills.get_mut(&bill.id).ok_or(StoreError::BillNotFound(bill.id))?;
            if stored.is_closed() {
                return Err(StoreError::BillClosed(bill.id));
            }
            stored.paid_amount = bill.paid_amount;
            stored.tip_amount = bill.tip_amount;
            stored.status = bill.status;
            stored.updated_at = bill.updated_at;
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        let delay = *self.update_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn fetch_bill_items(&self, bill_id: i64) -> Result<Vec<BillItem>, StoreError> {
        self.read(|s| Ok(s.items.get(&bill_id).cloned().unwrap_or_default()))
    }

    async fn fetch_bills_by_status(&self, status: BillStatus) -> Result<Vec<Bill>, StoreError> {
        self.read(|s| Ok(s.bills.values().filter(|b| b.status == status).cloned().collect()))
    }

    async fn fetch_table(&self, table_id: i64) -> Result<Table, StoreError> {
        self.read(|s| s.tables.get(&table_id).cloned().ok_or(StoreError::TableNotFound(table_id)))
    }
}
