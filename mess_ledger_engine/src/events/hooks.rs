use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{AllowanceExceededEvent, AllowanceResetEvent, EventHandler, EventProducer, Handler, PurchaseEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub purchase_producer: Vec<EventProducer<PurchaseEvent>>,
    pub allowance_exceeded_producer: Vec<EventProducer<AllowanceExceededEvent>>,
    pub reset_producer: Vec<EventProducer<AllowanceResetEvent>>,
}

pub struct EventHandlers {
    pub on_purchase: Option<EventHandler<PurchaseEvent>>,
    pub on_allowance_exceeded: Option<EventHandler<AllowanceExceededEvent>>,
    pub on_reset: Option<EventHandler<AllowanceResetEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_purchase = hooks.on_purchase.map(|f| EventHandler::new(buffer_size, f));
        let on_allowance_exceeded = hooks.on_allowance_exceeded.map(|f| EventHandler::new(buffer_size, f));
        let on_reset = hooks.on_reset.map(|f| EventHandler::new(buffer_size, f));
        Self { on_purchase, on_allowance_exceeded, on_reset }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_purchase {
            result.purchase_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_allowance_exceeded {
            result.allowance_exceeded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_reset {
            result.reset_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_purchase {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_allowance_exceeded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_reset {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_purchase: Option<Handler<PurchaseEvent>>,
    pub on_allowance_exceeded: Option<Handler<AllowanceExceededEvent>>,
    pub on_reset: Option<Handler<AllowanceResetEvent>>,
}

impl EventHooks {
    pub fn on_purchase<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PurchaseEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_purchase = Some(Arc::new(f));
        self
    }

    pub fn on_allowance_exceeded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AllowanceExceededEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_allowance_exceeded = Some(Arc::new(f));
        self
    }

    pub fn on_reset<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AllowanceResetEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_reset = Some(Arc::new(f));
        self
    }
}
