//! The in-process pub/sub event bus (§4.5). Subscribers pick either one
//! property name or the wildcard channel; each gets its own bounded queue so
//! one slow subscriber can never stall the tick loop or another subscriber.

use shared::ChangeEvent;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Named(String),
}

impl Filter {
    fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            Filter::All => true,
            Filter::Named(name) => name == &event.name,
        }
    }
}

struct Subscriber {
    filter: Filter,
    sender: mpsc::Sender<ChangeEvent>,
}

/// Default per-subscriber buffer depth (§4.5: "a bounded buffer, default
/// 256").
pub const DEFAULT_BUFFER: usize = 256;

pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    buffer: usize,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            buffer: buffer.max(1),
        }
    }

    pub async fn subscribe(&self, filter: Filter) -> mpsc::Receiver<ChangeEvent> {
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.subscribers.lock().await.push(Subscriber { filter, sender });
        receiver
    }

    /// Fans `event` out to every matching subscriber. A subscriber whose
    /// queue is full is slow by definition — it is disconnected rather than
    /// retried, so the tick loop never blocks on a reader (§4.5 "slow
    /// subscribers are dropped with a warning").
    pub async fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|subscriber| {
            if !subscriber.filter.matches(&event) {
                return true;
            }
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(property = %event.name, "subscriber buffer full, dropping subscriber");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PropertyValue;

    #[tokio::test]
    async fn named_subscriber_only_sees_its_property() {
        let bus = EventBus::new(4);
        let mut hp = bus.subscribe(Filter::Named("hp".to_string())).await;
        bus.publish(ChangeEvent::new("hp", PropertyValue::Integer(1))).await;
        bus.publish(ChangeEvent::new("mp", PropertyValue::Integer(2))).await;
        assert_eq!(hp.recv().await.unwrap().name, "hp");
        assert!(hp.try_recv().is_err());
    }

    #[tokio::test]
    async fn wildcard_subscriber_sees_everything() {
        let bus = EventBus::new(4);
        let mut all = bus.subscribe(Filter::All).await;
        bus.publish(ChangeEvent::new("hp", PropertyValue::Integer(1))).await;
        bus.publish(ChangeEvent::new("mp", PropertyValue::Integer(2))).await;
        assert_eq!(all.recv().await.unwrap().name, "hp");
        assert_eq!(all.recv().await.unwrap().name, "mp");
    }

    #[tokio::test]
    async fn a_full_subscriber_buffer_drops_the_subscriber_not_the_publish() {
        let bus = EventBus::new(1);
        let mut slow = bus.subscribe(Filter::All).await;
        bus.publish(ChangeEvent::new("hp", PropertyValue::Integer(1))).await;
        // Buffer is now full (capacity 1, unread); the next publish overflows it.
        bus.publish(ChangeEvent::new("hp", PropertyValue::Integer(2))).await;
        assert_eq!(slow.recv().await.unwrap().value, PropertyValue::Integer(1));
        assert!(slow.recv().await.is_none());
    }
}
