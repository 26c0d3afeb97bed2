use std::future::Future;

use log::*;
use settle_common::Money;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    chain::{ChainError, PaymentEvent},
    events::Handler,
};

/// Read access to the payment contract.
pub trait ChainClient: Clone + Send + Sync + 'static {
    /// Starts delivering payment events to `handler`, one at a time, in the order they are received.
    ///
    /// Only fails if the subscription cannot be set up. Delivery stops when the returned [`Subscription`] is
    /// unsubscribed or dropped.
    fn monitor_payments(
        &self,
        handler: Handler<PaymentEvent>,
    ) -> impl Future<Output = Result<Subscription, ChainError>> + Send;

    /// The authoritative amount paid against the bill so far, tips included.
    fn bill_total_paid(&self, bill_id: i64) -> impl Future<Output = Result<Money, ChainError>> + Send;
}

/// A live payment event subscription. Dropping it has the same effect as calling [`Subscription::unsubscribe`].
///
/// The delivery task watches the `stop` channel between events. Stopping never interrupts an event that is being
/// handled: it is seen through to the end, and nothing after it is delivered.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new<S: Into<String>>(name: S, stop: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { name: name.into(), stop, task: Some(task) }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Asks the delivery task to stop once the current event, if any, has been handled. Does not wait for it.
    pub fn unsubscribe(&mut self) {
        if self.task.take().is_some() {
            let _ = self.stop.send(true);
            debug!("⛓️ Unsubscribed from {}", self.name);
        }
    }

    /// Stops event delivery and waits for the event in hand to finish.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.stop.send(true);
            if let Err(e) = task.await {
                warn!("⛓️ Delivery from {} did not end cleanly. {e}", self.name);
            }
            debug!("⛓️ Unsubscribed from {}", self.name);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
