use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, OrderVerifiedEvent, PayoutCreatedEvent};

/// The publishing side of every registered hook. Cheap to clone; hand one to each API object.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_verified_producer: Vec<EventProducer<OrderVerifiedEvent>>,
    pub payout_created_producer: Vec<EventProducer<PayoutCreatedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_verified(&self, event: OrderVerifiedEvent) {
        for producer in &self.order_verified_producer {
            trace!("📬️ Publishing verification of order {}", event.order.order_code);
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payout_created(&self, event: PayoutCreatedEvent) {
        for producer in &self.payout_created_producer {
            trace!("📬️ Publishing payout #{}", event.payout.id);
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_verified: Option<EventHandler<OrderVerifiedEvent>>,
    pub on_payout_created: Option<EventHandler<PayoutCreatedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_verified = hooks.on_order_verified.map(|f| EventHandler::new(buffer_size, f));
        let on_payout_created = hooks.on_payout_created.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_verified, on_payout_created }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_verified {
            result.order_verified_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_created {
            result.payout_created_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns one background task per registered hook. Each task ends once all of its producers are dropped.
    pub fn start_handlers(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(handler) = self.on_order_verified {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_payout_created {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_verified: Option<Handler<OrderVerifiedEvent>>,
    pub on_payout_created: Option<Handler<PayoutCreatedEvent>>,
}

impl EventHooks {
    pub fn on_order_verified<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderVerifiedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_verified = Some(Arc::new(f));
        self
    }

    pub fn on_payout_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payout_created = Some(Arc::new(f));
        self
    }
}
