use std::time::Duration;

use settle_common::Money;
use settle_engine::{
    db_types::{Bill, BillStatus},
    events::EventProducers,
    monitor::ReconcileOutcome,
    test_utils::payment_event,
    MonitorConfig,
    MonitorError,
    Room,
    SweepReport,
};

use crate::support::*;

mod support;

#[tokio::test]
async fn sweep_overwrites_paid_amount_with_chain_total() {
    let sys = setup();
    let bill = open_bill(&sys.store, 7, 60);
    let mut bill_view = subscribe(&sys.hub, Room::bill(7)).await;
    let mut bill_at_55 = bill.clone();
    bill_at_55.apply_payment(Money::from_units(50), Money::from_units(5));
    sys.store.put_bill(bill_at_55);
    sys.chain.set_total_paid(7, Money::from_units(60));

    let report = sys.monitor.reconcile_once().await;
    assert_eq!(report, SweepReport { checked: 1, corrected: 1, unchanged: 0, failed: 0 });
    let stored = sys.store.bill(7).unwrap();
    assert_eq!(stored.paid_amount, Money::from_units(60));
    assert_eq!(stored.status, BillStatus::Paid);
    // only the paid amount is overwritten
    assert_eq!(stored.tip_amount, Money::from_units(5));

    let msgs = drain(&sys.hub, &mut bill_view).await;
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0]["type"], "bill_update");
    assert_eq!(msgs[0]["paid_amount"], "60.00");
    assert_eq!(msgs[0]["status"], "paid");
}

#[tokio::test]
async fn sweep_leaves_agreeing_and_settled_bills_alone() {
    let sys = setup();
    open_bill(&sys.store, 1, 10);
    let paid = open_bill(&sys.store, 2, 10);
    let closed = open_bill(&sys.store, 3, 10);
    sys.store.put_bill(Bill { status: BillStatus::Paid, paid_amount: Money::from_units(10), ..paid });
    sys.store.put_bill(Bill { status: BillStatus::Closed, ..closed });
    sys.chain.set_total_paid(2, Money::from_units(4));
    sys.chain.set_total_paid(3, Money::from_units(10));

    let report = sys.monitor.reconcile_once().await;
    assert_eq!(report, SweepReport { checked: 1, corrected: 0, unchanged: 1, failed: 0 });
    assert_eq!(sys.store.update_count(), 0);
    assert_eq!(sys.store.bill(2).unwrap().paid_amount, Money::from_units(10));
    assert_eq!(sys.store.bill(3).unwrap().status, BillStatus::Closed);
    assert_eq!(sys.monitor.reconcile_bill(3).await, Ok(ReconcileOutcome::Skipped));
}

#[tokio::test]
async fn one_failing_bill_does_not_stop_the_sweep() {
    let config = MonitorConfig { query_timeout: Duration::from_millis(50), ..quick_config() };
    let sys = setup_with(config, EventProducers::default());
    for id in 1..=4 {
        open_bill(&sys.store, id, 10);
        sys.chain.set_total_paid(id, Money::from_units(3));
    }
    sys.chain.fail_queries_for(2);

    let report = sys.monitor.reconcile_once().await;
    assert_eq!(report, SweepReport { checked: 4, corrected: 3, unchanged: 0, failed: 1 });
    assert_eq!(sys.store.bill(2).unwrap().paid_amount, Money::ZERO);
    assert_eq!(sys.store.bill(4).unwrap().status, BillStatus::Partial);

    sys.chain.heal(2);
    let report = sys.monitor.reconcile_once().await;
    assert_eq!(report.corrected, 1);
    assert_eq!(sys.store.bill(2).unwrap().paid_amount, Money::from_units(3));
}

#[tokio::test]
async fn stalled_chain_queries_time_out() {
    let config = MonitorConfig { query_timeout: Duration::from_millis(50), ..quick_config() };
    let sys = setup_with(config, EventProducers::default());
    open_bill(&sys.store, 1, 10);
    sys.chain.set_total_paid(1, Money::from_units(10));
    sys.chain.set_query_delay(Some(Duration::from_secs(5)));

    let report = tokio::time::timeout(Duration::from_secs(1), sys.monitor.reconcile_once()).await.unwrap();
    assert_eq!(report.failed, 1);
    let err = sys.monitor.reconcile_bill(1).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn first_sweep_runs_at_start_up() {
    let sys = setup();
    open_bill(&sys.store, 7, 30);
    // paid while the monitor was down
    sys.chain.pay_silently(7, Money::from_units(10), Money::ZERO);
    sys.monitor.start().await.unwrap();
    let bill = wait_for_paid(&sys.store, 7, Money::from_units(10)).await;
    assert_eq!(bill.paid_amount, Money::from_units(10));
    assert_eq!(bill.status, BillStatus::Partial);
    sys.monitor.stop().await;
}

#[tokio::test]
async fn sweep_recovers_dropped_events() {
    let config = MonitorConfig { reconcile_interval: Duration::from_secs(3600), ..quick_config() };
    let sys = setup_with(config, EventProducers::default());
    open_bill(&sys.store, 7, 30);
    sys.monitor.start().await.unwrap();
    while sys.chain.query_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    sys.chain.pay(7, Money::from_units(10), Money::ZERO);
    sys.chain.pay_silently(7, Money::from_units(10), Money::ZERO);
    sys.chain.pay(7, Money::from_units(10), Money::ZERO);
    let bill = wait_for_paid(&sys.store, 7, Money::from_units(20)).await;
    assert_eq!(bill.paid_amount, Money::from_units(20));
    assert_eq!(bill.status, BillStatus::Partial);

    let report = sys.monitor.reconcile_once().await;
    assert_eq!(report.corrected, 1);
    let bill = sys.store.bill(7).unwrap();
    assert_eq!(bill.paid_amount, sys.chain.total_paid(7));
    assert_eq!(bill.status, BillStatus::Paid);
    sys.monitor.stop().await;
}

#[tokio::test]
async fn concurrent_add_and_set_are_serialized() {
    let sys = setup();
    open_bill(&sys.store, 7, 100);
    sys.chain.set_total_paid(7, Money::from_units(30));
    sys.chain.set_query_delay(Some(Duration::from_millis(100)));

    let monitor = sys.monitor.clone();
    let sweep = tokio::spawn(async move { monitor.reconcile_bill(7).await });
    while sys.chain.query_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    // the sweep now holds the bill while it waits on the chain
    let event = payment_event(7, Money::from_units(20), Money::ZERO, 1);
    sys.monitor.process_payment_event(event).await.unwrap();

    assert!(matches!(sweep.await.unwrap(), Ok(ReconcileOutcome::Corrected(_))));
    let bill = sys.store.bill(7).unwrap();
    assert_eq!(bill.paid_amount, Money::from_units(50));
    assert_eq!(bill.status, BillStatus::Partial);
}

#[tokio::test]
async fn stop_finishes_the_payment_in_hand() {
    let config = MonitorConfig { reconcile_interval: Duration::from_secs(3600), ..quick_config() };
    let sys = setup_with(config, EventProducers::default());
    open_bill(&sys.store, 7, 60);
    let mut staff = subscribe(&sys.hub, Room::business(BUSINESS_ID)).await;
    let mut bill_view = subscribe(&sys.hub, Room::bill(7)).await;
    sys.monitor.start().await.unwrap();
    while sys.chain.query_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    sys.store.set_update_delay(Some(Duration::from_millis(200)));
    sys.chain.pay(7, Money::from_units(20), Money::ZERO);
    // the bill is written, but update_bill has not returned yet
    let bill = wait_for_paid(&sys.store, 7, Money::from_units(20)).await;
    assert_eq!(bill.paid_amount, Money::from_units(20));
    sys.monitor.stop().await;

    let msgs = drain(&sys.hub, &mut staff).await;
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0]["type"], "payment_received");
    let msgs = drain(&sys.hub, &mut bill_view).await;
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0]["type"], "bill_update");
    assert_eq!(msgs[0]["paid_amount"], "20.00");
}

#[tokio::test]
async fn stop_ends_the_ticker_and_the_subscription() {
    let sys = setup();
    open_bill(&sys.store, 7, 60);
    sys.monitor.start().await.unwrap();
    assert!(sys.monitor.is_running().await);
    assert_eq!(sys.monitor.start().await, Err(MonitorError::AlreadyStarted));

    tokio::time::timeout(Duration::from_millis(500), sys.monitor.stop()).await.unwrap();
    assert!(!sys.monitor.is_running().await);
    let queries = sys.chain.query_count();

    sys.chain.pay(7, Money::from_units(5), Money::ZERO);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sys.chain.query_count(), queries);
    assert_eq!(sys.store.bill(7).unwrap().paid_amount, Money::ZERO);

    // stopping twice is harmless, and the monitor can be started again
    sys.monitor.stop().await;
    sys.monitor.start().await.unwrap();
    assert!(sys.monitor.is_running().await);
    sys.monitor.stop().await;
}

#[tokio::test]
async fn start_reports_subscription_failure() {
    let sys = setup();
    sys.chain.refuse_subscriptions(true);
    let err = sys.monitor.start().await.unwrap_err();
    assert!(matches!(err, MonitorError::Fatal(_)));
    assert!(!err.is_transient());
    assert!(!sys.monitor.is_running().await);
    sys.chain.refuse_subscriptions(false);
    assert!(sys.monitor.start().await.is_ok());
    sys.monitor.stop().await;
}

#[tokio::test]
async fn payment_confirmation_is_broadcast() {
    let sys = setup();
    open_bill(&sys.store, 7, 60);
    let mut staff = subscribe(&sys.hub, Room::business(BUSINESS_ID)).await;
    let mut bill_view = subscribe(&sys.hub, Room::bill(7)).await;
    let mut table_view = subscribe(&sys.hub, Room::table(TABLE_CODE)).await;

    let bill = sys.monitor.notify_payment_confirmation(7, "0xabc").await.unwrap();
    assert_eq!(bill.id, 7);
    for sub in [&mut staff, &mut bill_view] {
        let msgs = drain(&sys.hub, sub).await;
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["type"], "payment_confirmed");
        assert_eq!(msgs[0]["tx_hash"], "0xabc");
    }
    assert!(drain(&sys.hub, &mut table_view).await.is_empty());
    assert_eq!(sys.monitor.notify_payment_confirmation(8, "0xabc").await, Err(MonitorError::BillNotFound(8)));
}
