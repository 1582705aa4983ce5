//! In-process event bus backed by std mpsc channels.

use std::sync::{Mutex, mpsc};

use crate::bus::{EventBus, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// The subscriber list lock was poisoned.
    Poisoned,
}

/// Broadcast bus for a single process: every subscriber gets its own channel
/// and a copy of every message published after it subscribed.
///
/// Delivery is best-effort and at-least-once from the consumer's point of
/// view; the store's transaction log stays the source of truth.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        // A failed send means the subscription was dropped; prune it here
        // rather than keeping dead channels around.
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_each_receive_published_messages() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(7).unwrap();

        assert_eq!(first.recv().unwrap(), 7);
        assert_eq!(second.recv().unwrap(), 7);
    }

    #[test]
    fn dropped_subscriptions_are_pruned_on_publish() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let keeper = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(1).unwrap();
        bus.publish(2).unwrap();

        assert_eq!(keeper.recv().unwrap(), 1);
        assert_eq!(keeper.recv().unwrap(), 2);
    }

    #[test]
    fn messages_published_before_subscribing_are_not_delivered() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        bus.publish(1).unwrap();

        let late = bus.subscribe();
        bus.publish(2).unwrap();

        assert_eq!(late.recv().unwrap(), 2);
        assert!(late.try_recv().is_err());
    }
}
