use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use settle_common::Money;

use crate::{
    chain::{ChainClient, ChainError, EventFeed, PaymentEvent, RawPaymentLog, Subscription},
    events::Handler,
};

/// A scriptable stand-in for the payment contract.
///
/// Payments made with [`MockChain::pay`] update the chain's totals and are pushed through an [`EventFeed`], the same
/// way a relay would deliver them. [`MockChain::pay_silently`] updates the totals without an event, simulating a lost
/// delivery.
#[derive(Clone)]
pub struct MockChain {
    feed: EventFeed,
    state: Arc<MockChainState>,
}

#[derive(Default)]
struct MockChainState {
    totals: Mutex<HashMap<i64, Money>>,
    failing: Mutex<HashSet<i64>>,
    query_delay: Mutex<Option<Duration>>,
    refuse_subscriptions: AtomicBool,
    queries: AtomicUsize,
    next_tx: AtomicUsize,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self { feed: EventFeed::new(64), state: Arc::new(MockChainState::default()) }
    }

    pub fn feed(&self) -> &EventFeed {
        &self.feed
    }

    pub fn set_total_paid(&self, bill_id: i64, amount: Money) {
        self.state.totals.lock().unwrap().insert(bill_id, amount);
    }

    pub fn total_paid(&self, bill_id: i64) -> Money {
        self.state.totals.lock().unwrap().get(&bill_id).copied().unwrap_or_default()
    }

    /// Total paid queries for this bill fail until [`MockChain::heal`] is called.
    pub fn fail_queries_for(&self, bill_id: i64) {
        self.state.failing.lock().unwrap().insert(bill_id);
    }

    pub fn heal(&self, bill_id: i64) {
        self.state.failing.lock().unwrap().remove(&bill_id);
    }

    pub fn set_query_delay(&self, delay: Option<Duration>) {
        *self.state.query_delay.lock().unwrap() = delay;
    }

    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.state.refuse_subscriptions.store(refuse, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.state.queries.load(Ordering::SeqCst)
    }

    /// Makes a payment on-chain and publishes its event.
    pub fn pay(&self, bill_id: i64, amount: Money, tip: Money) -> RawPaymentLog {
        let log = self.pay_silently(bill_id, amount, tip);
        self.feed.publish(log.clone()).expect("Mock event feed is full");
        log
    }

    /// Makes a payment on-chain, but its event is never delivered.
    pub fn pay_silently(&self, bill_id: i64, amount: Money, tip: Money) -> RawPaymentLog {
        let mut totals = self.state.totals.lock().unwrap();
        *totals.entry(bill_id).or_default() += amount + tip;
        let n = self.state.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        payment_log(bill_id, amount, tip, n as u64)
    }
}

/// A well-formed payment log. Different values of `n` give different transaction hashes.
pub fn payment_log(bill_id: i64, amount: Money, tip: Money, n: u64) -> RawPaymentLog {
    RawPaymentLog {
        bill_id,
        payer: format!("0x{:040x}", 0xc0ffee_u64),
        amount: amount.to_string(),
        tip_amount: Some(tip.to_string()),
        platform_fee: None,
        timestamp: 1_717_200_000 + n as i64,
        tx_hash: format!("0x{n:064x}"),
    }
}

/// The validated form of [`payment_log`].
pub fn payment_event(bill_id: i64, amount: Money, tip: Money, n: u64) -> PaymentEvent {
    PaymentEvent::try_from(payment_log(bill_id, amount, tip, n)).expect("Mock payment log is malformed")
}

impl ChainClient for MockChain {
    async fn monitor_payments(&self, handler: Handler<PaymentEvent>) -> Result<Subscription, ChainError> {
        if self.state.refuse_subscriptions.load(Ordering::SeqCst) {
            return Err(ChainError::SubscriptionFailed("The mock chain is refusing subscriptions".into()));
        }
        self.feed.subscribe(handler)
    }

    async fn bill_total_paid(&self, bill_id: i64) -> Result<Money, ChainError> {
        self.state.queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.query_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.failing.lock().unwrap().contains(&bill_id) {
            return Err(ChainError::QueryFailed(format!("RPC node refused the query for bill {bill_id}")));
        }
        Ok(self.total_paid(bill_id))
    }
}
