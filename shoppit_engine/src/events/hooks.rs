use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CustomerRegisteredEvent, EventHandler, EventProducer, Handler, TransactionCompletedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub transaction_completed_producer: Vec<EventProducer<TransactionCompletedEvent>>,
    pub customer_registered_producer: Vec<EventProducer<CustomerRegisteredEvent>>,
}

pub struct EventHandlers {
    pub on_transaction_completed: Option<EventHandler<TransactionCompletedEvent>>,
    pub on_customer_registered: Option<EventHandler<CustomerRegisteredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_transaction_completed = hooks.on_transaction_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_customer_registered = hooks.on_customer_registered.map(|f| EventHandler::new(buffer_size, f));
        Self { on_transaction_completed, on_customer_registered }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_transaction_completed {
            result.transaction_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_customer_registered {
            result.customer_registered_producer.push(handler.subscribe());
        }
        result
    }

    pub fn start_handlers(self) {
        if let Some(handler) = self.on_transaction_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_customer_registered {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_transaction_completed: Option<Handler<TransactionCompletedEvent>>,
    pub on_customer_registered: Option<Handler<CustomerRegisteredEvent>>,
}

impl EventHooks {
    pub fn on_transaction_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static
    {
        self.on_transaction_completed = Some(Arc::new(f));
        self
    }

    pub fn on_customer_registered<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CustomerRegisteredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static
    {
        self.on_customer_registered = Some(Arc::new(f));
        self
    }
}
