//! Structured status events surfaced on the installation.
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

pub const PROCESSING_ERROR_REASON: &str = "ProcessingError";
pub const INSTALLATION_COMPLETED_REASON: &str = "InstallationCompleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub kind: EventKind,
    pub reason: String,
    pub message: String,
    pub installation: String,
    pub timestamp_utc: String,
}

impl StatusEvent {
    pub fn new(kind: EventKind, reason: &str, installation: &str, message: String) -> Self {
        Self {
            kind,
            reason: reason.to_string(),
            message,
            installation: installation.to_string(),
            timestamp_utc: OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string()),
        }
    }

    /// Warning naming the stage that failed and the wrapped cause.
    pub fn processing_error(
        installation: &str,
        stage_message: &str,
        err: &dyn std::error::Error,
    ) -> Self {
        Self::new(
            EventKind::Warning,
            PROCESSING_ERROR_REASON,
            installation,
            format!("{stage_message}:\n{err}"),
        )
    }

    pub fn product_completed(installation: &str, stage: &str, product: &str) -> Self {
        Self::new(
            EventKind::Normal,
            INSTALLATION_COMPLETED_REASON,
            installation,
            format!("{product} was installed successfully in the {stage} stage"),
        )
    }
}

pub trait EventRecorder: Send + Sync {
    fn record(&self, event: StatusEvent);
}

/// Keeps every event in memory and mirrors it to the log.
#[derive(Default)]
pub struct InMemoryEventRecorder {
    events: Mutex<Vec<StatusEvent>>,
}

impl InMemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<StatusEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }
}

impl EventRecorder for InMemoryEventRecorder {
    fn record(&self, event: StatusEvent) {
        match event.kind {
            EventKind::Warning => warn!(
                reason = %event.reason,
                installation = %event.installation,
                detail = ?event.message,
                "status event"
            ),
            EventKind::Normal => info!(
                reason = %event.reason,
                installation = %event.installation,
                detail = ?event.message,
                "status event"
            ),
        }
        self.events.lock().expect("events lock poisoned").push(event);
    }
}
