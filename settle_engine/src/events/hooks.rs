use std::future::Future;

use crate::events::{handler_fn, BillUpdatedEvent, EventHandler, EventProducer, Handler};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub bill_updated_producer: Vec<EventProducer<BillUpdatedEvent>>,
}

impl EventProducers {
    pub async fn publish_bill_updated(&self, event: BillUpdatedEvent) {
        for producer in &self.bill_updated_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_bill_updated: Option<EventHandler<BillUpdatedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_bill_updated = hooks.on_bill_updated.map(|f| EventHandler::new(buffer_size, f));
        Self { on_bill_updated }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_bill_updated {
            result.bill_updated_producer.push(handler.subscribe());
        }
        result
    }

    pub fn start_handlers(self) {
        if let Some(handler) = self.on_bill_updated {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_bill_updated: Option<Handler<BillUpdatedEvent>>,
}

impl EventHooks {
    pub fn on_bill_updated<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(BillUpdatedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_bill_updated = Some(handler_fn(f));
        self
    }
}
