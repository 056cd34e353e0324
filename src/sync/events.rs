//! Protocol events and status levels
//!
//! The manager publishes every observable change as a [`ParamEvent`] on an
//! [`EventBus`]. Any number of subscribers (table view, logger, test) can
//! listen; publishing with nobody listening is not an error.

use tokio::sync::broadcast;

use crate::parameters::{ComponentId, ParamRef, ParamValue};

/// Severity of a human-readable status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusLevel {
    Ok = 0,
    Warning = 2,
    Error = 4,
}

/// Observable protocol event
#[derive(Debug, Clone, PartialEq)]
pub enum ParamEvent {
    /// A value arrived from the vehicle
    ParameterChanged {
        component: ComponentId,
        index: u16,
        value: ParamValue,
    },
    /// A value arrived, with list context for progress display
    ValueConfirmed {
        uas: u8,
        component: ComponentId,
        count: u16,
        index: u16,
        name: String,
        value: ParamValue,
    },
    /// Every parameter of the list transfer has been received
    ListUpToDate,
    /// A read request (first or repeated) was handed to the link
    UpdateRequested {
        component: ComponentId,
        target: ParamRef,
    },
    /// A write request (first or repeated) was handed to the link
    CommitPending {
        component: ComponentId,
        name: String,
        value: ParamValue,
    },
    /// Human-readable status update
    StatusMessage { text: String, level: StatusLevel },
}

/// Broadcast fan-out for [`ParamEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ParamEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ParamEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: ParamEvent) {
        // Err only means there are no subscribers
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(ParamEvent::ListUpToDate);
    }

    #[test]
    fn test_every_subscriber_sees_event() {
        let bus = EventBus::new(4);
        let mut ui = bus.subscribe();
        let mut logger = bus.subscribe();

        bus.publish(ParamEvent::StatusMessage {
            text: "Requested parameter list".into(),
            level: StatusLevel::Ok,
        });

        for rx in [&mut ui, &mut logger] {
            match rx.try_recv() {
                Ok(ParamEvent::StatusMessage { level, .. }) => assert_eq!(level, StatusLevel::Ok),
                other => panic!("Expected StatusMessage, got {:?}", other),
            }
        }
    }
}
