//! Simple stateless pub-sub event plumbing.
//!
//! Settlement and reset outcomes are announced as events so that other components (the audit log, notification
//! senders) can react without being wired into the settlement path. Handlers receive only the event payload, never
//! engine internals, and each event runs on its own task so a slow subscriber cannot stall a settlement.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinHandle};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the dispatch loop until every producer has been dropped, then waits for in-flight subscriber tasks to
    /// finish before returning.
    pub async fn start_handler(mut self) {
        debug!("📬️ Event handler running for {}", std::any::type_name::<E>());
        // The handler holds one sender of its own; it must go, or the loop below never ends.
        drop(self.sender);
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Dispatching event");
            let handler = Arc::clone(&self.handler);
            in_flight.push(tokio::spawn(async move { (handler)(ev).await }));
            in_flight.retain(|task| !task.is_finished());
        }
        for task in in_flight {
            if let Err(e) = task.await {
                warn!("📬️ An event subscriber task did not finish cleanly: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
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

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to publish event: {e}");
        }
    }
}
