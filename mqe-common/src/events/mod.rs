//! Event types for the MQE push channel
//!
//! Provides the meeting event definitions and the EventBus used to fan them out
//! to every viewer of a meeting.

mod meeting_types;

pub use meeting_types::{MeetingChange, ParticipantInfo};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::Phase;

/// MQE event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// Delivery is best-effort: clients reconcile by querying authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MeetingEvent {
    /// Roster membership or presence changed
    ///
    /// Triggers:
    /// - SSE: Refresh roster display
    ParticipantsUpdated {
        meeting_id: Uuid,
        /// Full roster after the change
        participants: Vec<ParticipantInfo>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Meeting data changed (submission, task edit, approval)
    ///
    /// Triggers:
    /// - SSE: Re-fetch voting info / statistics
    MeetingUpdated {
        meeting_id: Uuid,
        change: MeetingChange,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Authoritative phase advanced
    ///
    /// Triggers:
    /// - SSE: Move every viewer to the new phase
    PhaseChanged {
        meeting_id: Uuid,
        old_phase: Phase,
        new_phase: Phase,
        /// Creator who triggered the transition
        changed_by: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MeetingEvent {
    /// Get event type as string for SSE event names
    pub fn event_type(&self) -> &str {
        match self {
            MeetingEvent::ParticipantsUpdated { .. } => "ParticipantsUpdated",
            MeetingEvent::MeetingUpdated { .. } => "MeetingUpdated",
            MeetingEvent::PhaseChanged { .. } => "PhaseChanged",
        }
    }

    /// Meeting the event belongs to (used to filter per-meeting streams)
    pub fn meeting_id(&self) -> Uuid {
        match self {
            MeetingEvent::ParticipantsUpdated { meeting_id, .. }
            | MeetingEvent::MeetingUpdated { meeting_id, .. }
            | MeetingEvent::PhaseChanged { meeting_id, .. } => *meeting_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use mqe_common::events::{EventBus, MeetingEvent};
/// use mqe_common::Phase;
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(MeetingEvent::PhaseChanged {
///     meeting_id: Uuid::new_v4(),
///     old_phase: Phase::EmotionalEvaluation,
///     new_phase: Phase::UnderstandingContribution,
///     changed_by: Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "PhaseChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MeetingEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers lose old events;
    ///   zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MeetingEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MeetingEvent,
    ) -> Result<usize, broadcast::error::SendError<MeetingEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// All protocol notifications go through here: the push channel is
    /// fire-and-forget.
    pub fn emit_lossy(&self, event: MeetingEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_changed(meeting_id: Uuid) -> MeetingEvent {
        MeetingEvent::PhaseChanged {
            meeting_id,
            old_phase: Phase::TaskPlanning,
            new_phase: Phase::TaskEvaluation,
            changed_by: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_zero_capacity_is_raised() {
        let bus = EventBus::new(0);
        assert_eq!(bus.capacity(), 1);

        let mut rx = bus.subscribe();
        bus.emit_lossy(phase_changed(Uuid::new_v4()));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(phase_changed(Uuid::new_v4())).is_err());
        // Lossy variant swallows the same condition
        bus.emit_lossy(phase_changed(Uuid::new_v4()));
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let meeting_id = Uuid::new_v4();
        assert_eq!(bus.emit(phase_changed(meeting_id)).unwrap(), 2);

        assert_eq!(rx1.try_recv().unwrap().meeting_id(), meeting_id);
        assert_eq!(rx2.try_recv().unwrap().meeting_id(), meeting_id);
    }

    #[test]
    fn test_eventbus_emit_lossy_full_channel() {
        let bus = EventBus::new(2);
        let _rx = bus.subscribe();
        for _ in 0..10 {
            bus.emit_lossy(phase_changed(Uuid::new_v4()));
        }
        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let meeting_id = Uuid::new_v4();
        let participant_id = Uuid::new_v4();
        let event = MeetingEvent::MeetingUpdated {
            meeting_id,
            change: MeetingChange::SubmissionRecorded {
                phase: Phase::EmotionalEvaluation,
                participant_id,
                revision: 2,
            },
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("Event serialization should succeed");
        assert!(json.contains("\"type\":\"MeetingUpdated\""));
        assert!(json.contains("\"kind\":\"submission_recorded\""));
        assert!(json.contains("\"phase\":\"emotional_evaluation\""));

        let back: MeetingEvent = serde_json::from_str(&json).unwrap();
        match back {
            MeetingEvent::MeetingUpdated { change, .. } => {
                assert_eq!(
                    change,
                    MeetingChange::SubmissionRecorded {
                        phase: Phase::EmotionalEvaluation,
                        participant_id,
                        revision: 2,
                    }
                );
            }
            other => panic!("Wrong event type deserialized: {}", other.event_type()),
        }
    }

    #[test]
    fn test_event_type_and_meeting_id() {
        let meeting_id = Uuid::new_v4();
        let events = vec![
            (
                MeetingEvent::ParticipantsUpdated {
                    meeting_id,
                    participants: vec![],
                    timestamp: chrono::Utc::now(),
                },
                "ParticipantsUpdated",
            ),
            (
                MeetingEvent::MeetingUpdated {
                    meeting_id,
                    change: MeetingChange::Created { creator_id: Uuid::new_v4() },
                    timestamp: chrono::Utc::now(),
                },
                "MeetingUpdated",
            ),
            (phase_changed(meeting_id), "PhaseChanged"),
        ];

        for (event, expected_type) in events {
            assert_eq!(event.event_type(), expected_type);
            assert_eq!(event.meeting_id(), meeting_id);
        }
    }
}
