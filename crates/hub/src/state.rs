use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::actuators::{ActuatorConfig, ControlOutcome};
use crate::sensors::{SensorField, SensorSnapshot};

/// Maximum number of events retained in the ring buffer.
const MAX_EVENTS: usize = 200;

// ---------------------------------------------------------------------------
// Public type alias
// ---------------------------------------------------------------------------

pub type SharedState = Arc<RwLock<SystemState>>;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

pub struct SystemState {
    pub started_at: Instant,
    pub sensors: SensorSnapshot,
    pub actuators: ActuatorConfig,
    pub events: VecDeque<SystemEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub kind: EventKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reading,
    Actuator,
    Automation,
    Error,
    System,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub events: Vec<SystemEvent>,
}

// ---------------------------------------------------------------------------
// Construction & mutation
// ---------------------------------------------------------------------------

impl SystemState {
    /// Sensors start with random in-range readings, actuators as given.
    pub fn new(actuators: ActuatorConfig) -> Self {
        Self {
            started_at: Instant::now(),
            sensors: SensorSnapshot::randomized(),
            actuators,
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn shared(actuators: ActuatorConfig) -> SharedState {
        Arc::new(RwLock::new(Self::new(actuators)))
    }

    /// Record a merged hardware update.
    pub fn record_reading(&mut self, fields: &[SensorField]) {
        let detail = if fields.is_empty() {
            "update with no recognised fields".to_string()
        } else {
            fields
                .iter()
                .map(|f| match self.sensors.get(*f) {
                    Some(v) => format!("{}={v}", f.key()),
                    None => format!("{}=?", f.key()),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.push_event(EventKind::Reading, detail);
    }

    pub fn record_control(&mut self, outcome: &ControlOutcome) {
        self.push_event(EventKind::Actuator, outcome.message());
    }

    /// Replace the whole actuator config with an automation result.
    pub fn apply_automation(&mut self, plant_name: &str, actuators: ActuatorConfig) {
        let changed = self.actuators.changed_switches(&actuators);
        let detail = format!(
            "{plant_name}: {} switch{} changed, grow light {}%",
            changed.len(),
            if changed.len() == 1 { "" } else { "es" },
            actuators.grow_light_intensity
        );
        self.actuators = actuators;
        self.push_event(EventKind::Automation, detail);
    }

    /// Record an error event.
    pub fn record_error(&mut self, detail: String) {
        self.push_event(EventKind::Error, detail);
    }

    /// Record a generic system event.
    pub fn record_system(&mut self, detail: String) {
        self.push_event(EventKind::System, detail);
    }

    /// Build the JSON-serialisable status snapshot, newest event first.
    pub fn to_status(&self) -> StatusResponse {
        StatusResponse {
            uptime_secs: self.started_at.elapsed().as_secs(),
            events: self.events.iter().rev().cloned().collect(),
        }
    }

    fn push_event(&mut self, kind: EventKind, detail: String) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(SystemEvent {
            ts: OffsetDateTime::now_utc(),
            kind,
            detail,
        });
    }
}
