use crate::session::Lifecycle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What produced a jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Sensor,
    Camera,
    Manual,
}

/// Events published by a detection session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A jump was accepted and the count incremented
    JumpDetected {
        session_id: Uuid,
        count: u32,
        timestamp_millis: u64,
        source: TriggerSource,
    },
    /// The count was explicitly zeroed
    CountReset { session_id: Uuid, previous: u32 },
    /// The session moved between lifecycle states
    LifecycleChanged {
        session_id: Uuid,
        from: Lifecycle,
        to: Lifecycle,
    },
    /// The camera handle now points at another device
    DeviceSwitched { session_id: Uuid, device_index: u32 },
    /// An input was skipped because it could not be processed
    InputRejected { session_id: Uuid, reason: String },
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::JumpDetected { session_id, .. }
            | SessionEvent::CountReset { session_id, .. }
            | SessionEvent::LifecycleChanged { session_id, .. }
            | SessionEvent::DeviceSwitched { session_id, .. }
            | SessionEvent::InputRejected { session_id, .. } => *session_id,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::JumpDetected {
                count,
                timestamp_millis,
                source,
                ..
            } => format!(
                "Jump #{} at {}ms ({:?})",
                count, timestamp_millis, source
            ),
            SessionEvent::CountReset { previous, .. } => {
                format!("Count reset from {}", previous)
            }
            SessionEvent::LifecycleChanged { from, to, .. } => {
                format!("Lifecycle {:?} -> {:?}", from, to)
            }
            SessionEvent::DeviceSwitched { device_index, .. } => {
                format!("Switched to camera device {}", device_index)
            }
            SessionEvent::InputRejected { reason, .. } => format!("Input rejected: {}", reason),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::JumpDetected { .. } => "jump_detected",
            SessionEvent::CountReset { .. } => "count_reset",
            SessionEvent::LifecycleChanged { .. } => "lifecycle_changed",
            SessionEvent::DeviceSwitched { .. } => "device_switched",
            SessionEvent::InputRejected { .. } => "input_rejected",
        }
    }
}

/// Broadcast bus for asynchronous consumers of session events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many subscribers received it.
    ///
    /// Never blocks. Publishing with no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) -> usize {
        match &event {
            SessionEvent::JumpDetected { .. } | SessionEvent::DeviceSwitched { .. } => {
                info!("{}", event.description());
            }
            SessionEvent::InputRejected { reason, .. } => {
                warn!("Input rejected: {}", reason);
            }
            _ => debug!("{}", event.description()),
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Why the count changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountCause {
    Jump(TriggerSource),
    Reset,
}

/// Consistent snapshot handed to count listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUpdate {
    pub session_id: Uuid,
    pub count: u32,
    pub cause: CountCause,
    /// Input timestamp of the jump; `None` for resets
    pub timestamp_millis: Option<u64>,
}

/// Synchronous observer of count changes.
///
/// Invoked on the feeding thread after the count has been updated and before
/// the feeding call returns, in registration order.
pub trait CountListener: Send + Sync {
    fn on_count(&self, update: &CountUpdate);
}

impl<F> CountListener for F
where
    F: Fn(&CountUpdate) + Send + Sync,
{
    fn on_count(&self, update: &CountUpdate) {
        self(update)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct CountListeners {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn CountListener>)>,
}

impl CountListeners {
    pub fn add(&mut self, listener: Arc<dyn CountListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listeners in registration order, detached from the registry
    pub fn snapshot(&self) -> Vec<Arc<dyn CountListener>> {
        self.entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::time::{timeout, Duration};

    fn jump(count: u32) -> SessionEvent {
        SessionEvent::JumpDetected {
            session_id: Uuid::nil(),
            count,
            timestamp_millis: 1000,
            source: TriggerSource::Sensor,
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        assert_eq!(event_bus.publish(jump(3)), 1);

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        match received {
            SessionEvent::JumpDetected { count, .. } => assert_eq!(count, 3),
            other => panic!("Unexpected event type: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(4);
        assert_eq!(event_bus.subscriber_count(), 0);
        assert_eq!(event_bus.publish(jump(1)), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::LifecycleChanged {
            session_id: Uuid::nil(),
            from: Lifecycle::Idle,
            to: Lifecycle::Initializing,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "lifecycle_changed");
        assert_eq!(event.event_type(), "lifecycle_changed");
        assert_eq!(event.session_id(), Uuid::nil());
        assert_eq!(event.description(), "Lifecycle Idle -> Initializing");
    }

    #[test]
    fn test_listeners_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = CountListeners::default();

        let first = Arc::clone(&seen);
        let id = listeners.add(Arc::new(move |update: &CountUpdate| {
            first.lock().push(("first", update.count));
        }));
        let second = Arc::clone(&seen);
        listeners.add(Arc::new(move |update: &CountUpdate| {
            second.lock().push(("second", update.count));
        }));

        let update = CountUpdate {
            session_id: Uuid::nil(),
            count: 7,
            cause: CountCause::Jump(TriggerSource::Camera),
            timestamp_millis: Some(10),
        };
        for listener in listeners.snapshot() {
            listener.on_count(&update);
        }
        assert_eq!(*seen.lock(), vec![("first", 7), ("second", 7)]);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        assert_eq!(listeners.len(), 1);
    }
}
