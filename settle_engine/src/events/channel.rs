//! Hook delivery for engine events.
//!
//! The payment monitor publishes an event whenever it changes a bill, and host code (receipts, audit logs, the
//! server's own logging) can hang a hook off it. Hooks only see the event. They cannot reach into the monitor, the
//! store or the hub, so a slow or failing hook never holds up payment processing.
//!
//! Every event is handled on its own task. A hook that panics is logged and forgotten.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Wraps an async closure as a [`Handler`].
pub fn handler_fn<E, F, Fut>(f: F) -> Handler<E>
where
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |e| Box::pin(f(e)) as Pin<Box<dyn Future<Output = ()> + Send>>)
}

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for the hooks still running.
    pub async fn start_handler(mut self) {
        debug!("🪝️ Hook handler started");
        // only producers keep the channel open from here on
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            while let Some(done) = jobs.try_join_next() {
                report(done);
            }
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move { (handler)(ev).await });
            trace!("🪝️ Hook dispatched. {} running", jobs.len());
        }
        if !jobs.is_empty() {
            debug!("🪝️ Waiting for {} hooks to finish", jobs.len());
        }
        while let Some(done) = jobs.join_next().await {
            report(done);
        }
        debug!("🪝️ Hook handler has shut down");
    }
}

fn report(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        warn!("🪝️ A hook did not complete. {e}");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Waits for room in the hook queue. If the handler has gone away the event is logged and dropped.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("🪝️ No hook handler is listening. Event dropped. {e}");
        }
    }
}
