use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
/// Broadcast bus for playback events
///
/// Hosts subscribe to learn when sounds start and stop without holding a
/// reference to any particular player.
use std::sync::Arc;

use super::events::PlaybackEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<PlaybackEvent>,
}

/// Cloneable handle; clones share the subscriber list
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<RwLock<usize>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribe to playback events, returns a receiver and subscription ID
    pub fn subscribe(&self) -> (Receiver<PlaybackEvent>, SubscriberId) {
        let (tx, rx) = unbounded();

        let id = {
            let mut next_id = self.next_id.write();
            let id = SubscriberId(*next_id);
            *next_id += 1;
            id
        };

        self.subscribers.write().push(Subscriber { id, sender: tx });
        (rx, id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Send `event` to every subscriber. Closed receivers are pruned.
    pub fn publish(&self, event: PlaybackEvent) {
        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for subscriber in subscribers.iter() {
                if subscriber.sender.try_send(event.clone()).is_err() {
                    closed.push(subscriber.id);
                }
            }
        }
        if !closed.is_empty() {
            self.subscribers.write().retain(|s| !closed.contains(&s.id));
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::source::SoundId;

    fn started(id: &str) -> PlaybackEvent {
        PlaybackEvent::Started {
            sound_id: SoundId::new(id),
        }
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();
        let (_rx, id) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let (rx1, _) = bus.subscribe();
        let (rx2, _) = bus.subscribe();

        bus.publish(started("pop"));

        assert_eq!(rx1.try_recv().unwrap(), started("pop"));
        assert_eq!(rx2.try_recv().unwrap(), started("pop"));
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let bus = EventBus::new();
        let (rx, _) = bus.subscribe();
        drop(rx);

        bus.publish(started("pop"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();

        let (_rx, _id) = bus1.subscribe();
        assert_eq!(bus2.subscriber_count(), 1);

        bus2.clear();
        assert_eq!(bus1.subscriber_count(), 0);
    }
}
