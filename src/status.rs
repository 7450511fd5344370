//! Status reporter
//!
//! Derives human-readable progress lines from engine activity, mirrors them
//! to the log, and retains the most recent ones for display surfaces.

use std::collections::VecDeque;
use std::sync::Arc;

use skygrid_shared::{Drone, Event, EventStatus};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Clone)]
pub struct StatusReporter {
    lines: Arc<RwLock<VecDeque<String>>>,
    capacity: usize,
}

impl StatusReporter {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Publish one status line
    pub async fn publish(&self, message: impl Into<String>) {
        let message = message.into();
        info!("[STATUS] {}", message);

        let mut lines = self.lines.write().await;
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(message);
    }

    /// Most recent lines, oldest first
    pub async fn recent(&self) -> Vec<String> {
        self.lines.read().await.iter().cloned().collect()
    }
}

/// One-line description of an event for display
pub fn event_line(event: &Event) -> String {
    match (event.status, event.responding_drone_id) {
        (EventStatus::Pending, _) => format!("Event at {} awaiting dispatch", event.location()),
        (EventStatus::Responding, Some(id)) => {
            format!("Drone {} responding to event at {}", id, event.location())
        }
        (EventStatus::Responding, None) => {
            format!("Event at {} dispatching", event.location())
        }
        (EventStatus::Resolved, Some(id)) => {
            format!("Event at {} resolved by drone {}", event.location(), id)
        }
        (EventStatus::Resolved, None) => format!("Event at {} resolved", event.location()),
    }
}

/// One-line description of a drone for display
pub fn drone_line(drone: &Drone) -> String {
    format!("Drone {} {:?} at {}", drone.id, drone.status, drone.location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skygrid_shared::{EventStatus, LatLng};

    #[tokio::test]
    async fn test_capacity_keeps_newest_lines() {
        let reporter = StatusReporter::new(2);
        reporter.publish("one").await;
        reporter.publish("two").await;
        reporter.publish("three").await;

        assert_eq!(reporter.recent().await, vec!["two", "three"]);
    }

    #[test]
    fn test_event_line_includes_responder() {
        let mut event = skygrid_shared::Event::pending(LatLng::new(42.0, -93.6));
        event.responding_drone_id = Some(3);
        event.status = EventStatus::Responding;
        assert_eq!(
            event_line(&event),
            "Drone 3 responding to event at (-93.6, 42)"
        );
    }
}
