//! Broadcast event publisher
//!
//! Fans settings events out to every subscriber through a
//! `tokio::sync::broadcast` channel.

use crate::domain::events::{EventPublisher, SettingsEvent};
use tokio::sync::broadcast;

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 256;

/// Publisher backed by a broadcast channel
///
/// Publishing with no subscriber is not an error; the event is dropped.
/// Slow subscribers lag and miss the oldest events.
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<SettingsEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingsEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait::async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: SettingsEvent) -> anyhow::Result<()> {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
        Ok(())
    }
}
