// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Monitoring sink for delivery metrics and error reports.
//!
//! Sinks are infallible by signature: a broken metrics backend must never
//! surface as an error inside the core.

use serde_json::Value;

/// Receiver for operational events and errors.
pub trait MonitoringSink: Send + Sync {
    fn record_event(&self, name: &str, value: f64, category: &str, metadata: Value);
    fn record_error(&self, category: &str, message: &str, metadata: Value);
}

/// Default sink: structured log lines via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitor;

impl MonitoringSink for TracingMonitor {
    fn record_event(&self, name: &str, value: f64, category: &str, metadata: Value) {
        tracing::info!(
            metric = name,
            value,
            category,
            metadata = %metadata,
            "Metric recorded"
        );
    }

    fn record_error(&self, category: &str, message: &str, metadata: Value) {
        tracing::error!(category, error = message, metadata = %metadata, "Error recorded");
    }
}

/// In-memory sink for unit tests.
#[cfg(test)]
pub(crate) mod recording {
    use super::MonitoringSink;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedEvent {
        pub name: String,
        pub value: f64,
        pub category: String,
        pub metadata: Value,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedError {
        pub category: String,
        pub message: String,
        pub metadata: Value,
    }

    #[derive(Debug, Default)]
    pub struct RecordingMonitor {
        events: Mutex<Vec<RecordedEvent>>,
        errors: Mutex<Vec<RecordedError>>,
    }

    impl RecordingMonitor {
        pub fn events(&self) -> Vec<RecordedEvent> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        pub fn errors(&self) -> Vec<RecordedError> {
            self.errors.lock().map(|e| e.clone()).unwrap_or_default()
        }

        pub fn events_named(&self, name: &str) -> Vec<RecordedEvent> {
            self.events()
                .into_iter()
                .filter(|e| e.name == name)
                .collect()
        }
    }

    impl MonitoringSink for RecordingMonitor {
        fn record_event(&self, name: &str, value: f64, category: &str, metadata: Value) {
            if let Ok(mut events) = self.events.lock() {
                events.push(RecordedEvent {
                    name: name.to_string(),
                    value,
                    category: category.to_string(),
                    metadata,
                });
            }
        }

        fn record_error(&self, category: &str, message: &str, metadata: Value) {
            if let Ok(mut errors) = self.errors.lock() {
                errors.push(RecordedError {
                    category: category.to_string(),
                    message: message.to_string(),
                    metadata,
                });
            }
        }
    }
}
