use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use log::*;
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex as AsyncMutex, Semaphore},
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};

use crate::{
    chain::{ChainClient, ChainError, PaymentEvent, Subscription},
    db::BillStore,
    db_types::{Bill, BillStatus},
    events::{handler_fn, BillUpdatedEvent, EventProducers, UpdateSource},
    hub::{HubHandle, Notification, Room},
    monitor::{
        BillLocks,
        EventOutcome,
        MonitorConfig,
        MonitorError,
        RecentTransactions,
        ReconcileOutcome,
        SweepReport,
    },
};

/// Applies on-chain payments to bills and reconciles bills against the chain.
///
/// The monitor is cheap to clone. Clones share the same state, including the running subscription and ticker.
pub struct PaymentMonitor<S, C> {
    inner: Arc<MonitorInner<S, C>>,
    running: Arc<AsyncMutex<Option<Running>>>,
}

impl<S, C> Clone for PaymentMonitor<S, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), running: Arc::clone(&self.running) }
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    ticker: JoinHandle<()>,
    subscription: Subscription,
}

struct MonitorInner<S, C> {
    store: S,
    chain: C,
    hub: HubHandle,
    producers: EventProducers,
    config: MonitorConfig,
    locks: BillLocks,
    recent: Mutex<RecentTransactions>,
}

impl<S, C> PaymentMonitor<S, C>
where
    S: BillStore,
    C: ChainClient,
{
    pub fn new(store: S, chain: C, hub: HubHandle, producers: EventProducers, config: MonitorConfig) -> Self {
        let recent = Mutex::new(RecentTransactions::new(config.dedupe_capacity));
        let inner = MonitorInner { store, chain, hub, producers, config, locks: BillLocks::new(), recent };
        Self { inner: Arc::new(inner), running: Arc::new(AsyncMutex::new(None)) }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn hub(&self) -> &HubHandle {
        &self.inner.hub
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Subscribes to payment events and starts the reconciliation ticker.
    ///
    /// If the subscription cannot be set up, nothing is started and [`MonitorError::Fatal`] is returned. Calling
    /// `start` on a running monitor returns [`MonitorError::AlreadyStarted`].
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }
        let inner = Arc::clone(&self.inner);
        let handler = handler_fn(move |event: PaymentEvent| {
            let inner = Arc::clone(&inner);
            async move { inner.handle_event(event).await }
        });
        let subscription = self.inner.chain.monitor_payments(handler).await.map_err(|e| {
            error!("💰️ Could not subscribe to payment events. The payment monitor will not start. {e}");
            MonitorError::Fatal(e.to_string())
        })?;
        let (shutdown, signal) = watch::channel(false);
        let ticker = tokio::spawn(run_ticker(Arc::clone(&self.inner), signal));
        *running = Some(Running { shutdown, ticker, subscription });
        info!(
            "💰️ Payment monitor started. Bills will be reconciled every {}s",
            self.inner.config.reconcile_interval.as_secs_f64()
        );
        Ok(())
    }

    /// Stops the reconciliation ticker and releases the event subscription. A sweep or payment event that is under way
    /// is allowed to finish first, notifications included. Calling `stop` on a monitor that is not running does
    /// nothing.
    pub async fn stop(&self) {
        let Some(mut running) = self.running.lock().await.take() else {
            debug!("💰️ Payment monitor is not running. Nothing to stop");
            return;
        };
        let _ = running.shutdown.send(true);
        running.subscription.shutdown().await;
        if let Err(e) = running.ticker.await {
            warn!("💰️ Reconciliation ticker did not shut down cleanly. {e}");
        }
        info!("💰️ Payment monitor stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Adds the payment to its bill and publishes the change. Redelivered transactions are ignored.
    pub async fn process_payment_event(&self, event: PaymentEvent) -> Result<EventOutcome, MonitorError> {
        self.inner.process_payment_event(event).await
    }

    /// Runs a single reconciliation sweep over every open and partially paid bill.
    pub async fn reconcile_once(&self) -> SweepReport {
        self.inner.reconcile_once().await
    }

    /// Brings one bill into line with the chain's total paid.
    pub async fn reconcile_bill(&self, bill_id: i64) -> Result<ReconcileOutcome, MonitorError> {
        self.inner.reconcile_bill(bill_id).await
    }

    /// Tells the bill's business and viewers that a payment transaction has been confirmed. The bill itself is not
    /// changed.
    pub async fn notify_payment_confirmation(&self, bill_id: i64, tx_hash: &str) -> Result<Bill, MonitorError> {
        let bill = self.inner.store.fetch_bill(bill_id).await?;
        let message = Notification::payment_confirmed(&bill, tx_hash);
        self.inner.publish(&Room::business(bill.business_id), &message).await;
        self.inner.publish(&Room::bill(bill.id), &message).await;
        info!("💰️ Payment confirmation for bill #{bill_id} (tx {tx_hash}) sent");
        Ok(bill)
    }
}

async fn run_ticker<S, C>(inner: Arc<MonitorInner<S, C>>, mut shutdown: watch::Receiver<bool>)
where
    S: BillStore,
    C: ChainClient,
{
    let mut interval = tokio::time::interval(inner.config.reconcile_interval.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!("🔁️ Reconciliation ticker started");
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                let report = inner.reconcile_once().await;
                if report.corrected > 0 || report.failed > 0 {
                    info!(
                        "🔁️ Reconciled {} bills. {} corrected, {} failed",
                        report.checked, report.corrected, report.failed
                    );
                } else {
                    debug!("🔁️ Reconciled {} bills. All in step with the chain", report.checked);
                }
            },
        }
    }
    debug!("🔁️ Reconciliation ticker stopped");
}

impl<S, C> MonitorInner<S, C>
where
    S: BillStore,
    C: ChainClient,
{
    async fn handle_event(&self, event: PaymentEvent) {
        let bill_id = event.bill_id;
        let tx_hash = event.tx_hash.clone();
        match self.process_payment_event(event).await {
            Ok(EventOutcome::Applied(_)) => {},
            Ok(EventOutcome::Duplicate) => {
                debug!("💰️ Transaction {tx_hash} has already been applied to bill #{bill_id}")
            },
            Ok(EventOutcome::BillClosed) => {
                warn!("💰️ Payment {tx_hash} arrived for bill #{bill_id}, which is closed. It has been ignored")
            },
            Err(e) if e.is_transient() => {
                warn!("💰️ Could not apply payment {tx_hash} to bill #{bill_id}. The next sweep will catch it. {e}")
            },
            Err(e) => error!("💰️ Could not apply payment {tx_hash} to bill #{bill_id}. {e}"),
        }
    }

    async fn process_payment_event(&self, event: PaymentEvent) -> Result<EventOutcome, MonitorError> {
        let guard = self.locks.lock(event.bill_id).await;
        if self.is_known_transaction(&event.tx_hash) {
            return Ok(EventOutcome::Duplicate);
        }
        let old = self.store.fetch_bill(event.bill_id).await?;
        if old.is_closed() {
            return Ok(EventOutcome::BillClosed);
        }
        let mut bill = old.clone();
        bill.apply_payment(event.amount, event.tip_amount);
        bill.updated_at = Utc::now();
        self.store.update_bill(&bill).await?;
        self.remember_transaction(&event.tx_hash);
        info!(
            "💰️ Payment of {} (tip {}) from {} applied to bill #{}. {} of {} paid. Bill is {}",
            event.amount, event.tip_amount, event.payer, bill.id, bill.paid_amount, bill.total_amount, bill.status
        );
        self.publish(&Room::business(bill.business_id), &Notification::payment_received(&event, &bill)).await;
        self.publish_bill_update(&bill).await;
        drop(guard);

        let update = BillUpdatedEvent::new(old, bill.clone(), UpdateSource::PaymentEvent).with_tx_hash(event.tx_hash);
        self.producers.publish_bill_updated(update).await;
        Ok(EventOutcome::Applied(bill))
    }

    async fn reconcile_once(self: &Arc<Self>) -> SweepReport {
        let mut report = SweepReport::default();
        let mut bill_ids = Vec::new();
        for status in [BillStatus::Open, BillStatus::Partial] {
            match self.store.fetch_bills_by_status(status).await {
                Ok(bills) => bill_ids.extend(bills.into_iter().map(|b| b.id)),
                Err(e) => error!("🔁️ Could not fetch {status} bills for reconciliation. {e}"),
            }
        }
        trace!("🔁️ Reconciling {} bills", bill_ids.len());
        let permits = Arc::new(Semaphore::new(self.config.sweep_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for bill_id in bill_ids {
            let inner = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (bill_id, inner.reconcile_bill(bill_id).await)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            report.checked += 1;
            match joined {
                Ok((_, Ok(ReconcileOutcome::Corrected(_)))) => report.corrected += 1,
                Ok((_, Ok(_))) => report.unchanged += 1,
                Ok((bill_id, Err(e))) => {
                    warn!("🔁️ Could not reconcile bill #{bill_id}. It will be retried on the next sweep. {e}");
                    report.failed += 1;
                },
                Err(e) => {
                    error!("🔁️ A reconciliation task failed. {e}");
                    report.failed += 1;
                },
            }
        }
        report
    }

    async fn reconcile_bill(&self, bill_id: i64) -> Result<ReconcileOutcome, MonitorError> {
        let guard = self.locks.lock(bill_id).await;
        let old = self.store.fetch_bill(bill_id).await?;
        if !old.status.is_settling() {
            return Ok(ReconcileOutcome::Skipped);
        }
        let on_chain = tokio::time::timeout(self.config.query_timeout, self.chain.bill_total_paid(bill_id))
            .await
            .map_err(|_| ChainError::Timeout)??;
        if on_chain == old.paid_amount {
            return Ok(ReconcileOutcome::Unchanged);
        }
        let mut bill = old.clone();
        bill.set_paid_amount(on_chain);
        bill.updated_at = Utc::now();
        self.store.update_bill(&bill).await?;
        info!(
            "🔁️ Bill #{bill_id} was out of step with the chain. Paid amount changed from {} to {on_chain}. Now {}",
            old.paid_amount, bill.status
        );
        self.publish_bill_update(&bill).await;
        drop(guard);

        let update = BillUpdatedEvent::new(old, bill.clone(), UpdateSource::Reconciliation);
        self.producers.publish_bill_updated(update).await;
        Ok(ReconcileOutcome::Corrected(bill))
    }

    async fn publish_bill_update(&self, bill: &Bill) {
        let update = Notification::bill_update(bill);
        self.publish(&Room::bill(bill.id), &update).await;
        match self.store.fetch_table(bill.table_id).await {
            Ok(table) => self.publish(&Room::table(&table.code), &update).await,
            Err(e) => {
                let table_id = bill.table_id;
                warn!("💰️ Could not look up table #{table_id} for bill #{}. Guests were not notified. {e}", bill.id)
            },
        }
    }

    async fn publish<T: Serialize + Sync>(&self, room: &Room, message: &T) {
        if let Err(e) = self.hub.broadcast_to_room(room, message).await {
            warn!("💰️ Could not publish to {room}. {e}");
        }
    }

    fn is_known_transaction(&self, tx_hash: &str) -> bool {
        self.recent.lock().map(|r| r.contains(tx_hash)).unwrap_or(false)
    }

    fn remember_transaction(&self, tx_hash: &str) {
        if let Ok(mut recent) = self.recent.lock() {
            recent.insert(tx_hash);
        }
    }
}
