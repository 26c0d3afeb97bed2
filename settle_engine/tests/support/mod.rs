#![allow(dead_code)]
use std::time::Duration;

use settle_common::Money;
use settle_engine::{
    db_types::{Bill, NewBill},
    events::EventProducers,
    hub::Subscriber,
    test_utils::{prepare_test_env, MockChain},
    ConnectionHub,
    HubConfig,
    HubHandle,
    MemoryBillStore,
    MonitorConfig,
    PaymentMonitor,
    Room,
};

pub const BUSINESS_ID: i64 = 1;
pub const TABLE_ID: i64 = 3;
pub const TABLE_CODE: &str = "A12";

pub struct TestSystem {
    pub store: MemoryBillStore,
    pub chain: MockChain,
    pub hub: HubHandle,
    pub monitor: PaymentMonitor<MemoryBillStore, MockChain>,
}

pub fn quick_config() -> MonitorConfig {
    MonitorConfig {
        reconcile_interval: Duration::from_millis(100),
        query_timeout: Duration::from_millis(250),
        ..MonitorConfig::default()
    }
}

pub fn setup() -> TestSystem {
    setup_with(quick_config(), EventProducers::default())
}

pub fn setup_with(config: MonitorConfig, producers: EventProducers) -> TestSystem {
    prepare_test_env();
    let store = MemoryBillStore::new();
    store.add_table(TABLE_ID, BUSINESS_ID, TABLE_CODE);
    let chain = MockChain::new();
    let (hub, _) = ConnectionHub::spawn(HubConfig::default());
    let monitor = PaymentMonitor::new(store.clone(), chain.clone(), hub.clone(), producers, config);
    TestSystem { store, chain, hub, monitor }
}

/// Opens bill `id` for the given whole-unit total, with nothing paid.
pub fn open_bill(store: &MemoryBillStore, id: i64, total: i64) -> Bill {
    store.add_bill(id, NewBill::new(BUSINESS_ID, TABLE_ID).with_item("Dinner", Money::from_units(total), 1))
}

pub async fn subscribe(hub: &HubHandle, room: Room) -> Subscriber {
    hub.register([room]).await.expect("hub has stopped")
}

/// Every message currently queued for the subscriber, decoded as JSON.
pub async fn drain(hub: &HubHandle, sub: &mut Subscriber) -> Vec<serde_json::Value> {
    // the hub handles requests in order, so once this returns earlier broadcasts have been queued
    hub.connection_count().await.expect("hub has stopped");
    let mut result = Vec::new();
    while let Ok(msg) = sub.receiver.try_recv() {
        result.push(serde_json::from_str(&msg).expect("notification is not JSON"));
    }
    result
}

/// Polls the store until the bill's paid amount matches, or gives up after two seconds.
pub async fn wait_for_paid(store: &MemoryBillStore, bill_id: i64, expected: Money) -> Bill {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let bill = store.bill(bill_id).expect("bill does not exist");
        if bill.paid_amount == expected || tokio::time::Instant::now() > deadline {
            return bill;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
