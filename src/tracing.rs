//! Event tracing for debugging tasklane.
//!
//! Provides a ring buffer of recent protocol events and task transitions so
//! that out-of-order or late compositor events can be reconstructed after
//! the fact.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::state::TaskTransition;

/// Maximum number of events to keep in the trace buffer
const DEFAULT_MAX_ENTRIES: usize = 1000;

/// A single entry in the event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toplevel: Option<u32>,
    pub details: String,
}

/// Event tracer with ring buffer storage
pub struct EventTracer {
    entries: VecDeque<EventLogEntry>,
    max_entries: usize,
    sequence: u64,
    start_time: Instant,
}

impl EventTracer {
    /// Create a new event tracer with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a new event tracer with specified capacity
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
            sequence: 0,
            start_time: Instant::now(),
        }
    }

    /// Get the current timestamp in milliseconds since tracer start
    fn timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Trace a protocol event received for a toplevel
    pub fn trace_protocol_event(&mut self, event_type: &str, toplevel: Option<u32>, details: &str) {
        self.add_entry(event_type.to_string(), toplevel, details.to_string());
    }

    /// Trace a protocol violation (event for a released handle, double close)
    pub fn trace_violation(&mut self, toplevel: Option<u32>, details: &str) {
        self.add_entry("protocol_violation".to_string(), toplevel, details.to_string());
    }

    /// Trace a state transition
    pub fn trace_transition(&mut self, toplevel: Option<u32>, transition: &TaskTransition) {
        let (event_type, details) = match transition {
            TaskTransition::TaskCreated { task, toplevel } => {
                ("task_created", format!("task={} toplevel={}", task, toplevel))
            }
            TaskTransition::AppIdChanged { task, app_id } => {
                ("app_id_changed", format!("task={} app_id={}", task, app_id))
            }
            TaskTransition::StateChanged { task, active, minimized } => (
                "state_changed",
                format!("task={} active={} minimized={}", task, active, minimized),
            ),
            TaskTransition::RequestSent { task, request } => {
                ("request_sent", format!("task={} request={}", task, request))
            }
            TaskTransition::TaskClosed { task, reason } => {
                let reason_str = serde_json::to_string(reason).unwrap_or_else(|_| "unknown".to_string());
                ("task_closed", format!("task={} reason={}", task, reason_str))
            }
        };
        self.add_entry(event_type.to_string(), toplevel, details);
    }

    /// Add an entry to the trace buffer
    fn add_entry(&mut self, event_type: String, toplevel: Option<u32>, details: String) {
        if self.max_entries == 0 {
            return;
        }

        // Remove oldest entry if at capacity
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }

        self.sequence += 1;
        self.entries.push_back(EventLogEntry {
            sequence: self.sequence,
            timestamp_ms: self.timestamp(),
            event_type,
            toplevel,
            details,
        });
    }

    /// Get the last N entries
    pub fn get_last(&self, n: usize) -> Vec<EventLogEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }

    /// Get all entries
    pub fn get_all(&self) -> Vec<EventLogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Clear the trace buffer
    pub fn clear(&mut self) {
        self.entries.clear();
        self.sequence = 0;
    }

    /// Get the number of entries in the buffer
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventTracer {
    fn default() -> Self {
        Self::new()
    }
}
