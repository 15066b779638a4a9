// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use pulse_engine::config::Config;
use pulse_engine::routes::create_router;
use pulse_engine::services::{
    ChannelError, EmailSender, LiveConnection, MonitoringSink, PushSender, TransportError,
};
use pulse_engine::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Live connection that records every payload it is sent.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockConnection {
    received: Mutex<Vec<Value>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl MockConnection {
    pub fn failing() -> Self {
        let conn = Self::default();
        conn.set_failing(true);
        conn
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    /// Event `type`s received, in order.
    pub fn types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn events_of(&self, kind: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e["type"] == kind)
            .collect()
    }
}

impl LiveConnection for MockConnection {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("mock failure".to_string()));
        }
        let value = serde_json::from_str(payload)
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        self.received.lock().unwrap().push(value);
        Ok(())
    }
}

/// How a mock channel adapter behaves.
#[derive(Clone, Copy)]
#[allow(dead_code)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang(Duration),
}

/// Push/email adapter that records who it was asked to reach.
#[allow(dead_code)]
pub struct MockChannel {
    behavior: Behavior,
    sent_to: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            sent_to: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent_to.lock().unwrap().clone()
    }

    async fn attempt(&self, user_id: &str) -> Result<(), ChannelError> {
        self.sent_to.lock().unwrap().push(user_id.to_string());
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ChannelError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
            Behavior::Hang(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PushSender for MockChannel {
    async fn send(&self, user_id: &str, _: &str, _: &str, _: &Value) -> Result<(), ChannelError> {
        self.attempt(user_id).await
    }
}

#[async_trait]
impl EmailSender for MockChannel {
    async fn send(
        &self,
        user_id: &str,
        _: &str,
        _: &str,
        _: Option<&str>,
    ) -> Result<(), ChannelError> {
        self.attempt(user_id).await
    }
}

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedEvent {
    pub name: String,
    pub value: f64,
    pub metadata: Value,
}

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedError {
    pub category: String,
    pub message: String,
}

/// Monitoring sink that keeps everything it is handed.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingMonitor {
    events: Mutex<Vec<RecordedEvent>>,
    errors: Mutex<Vec<RecordedError>>,
}

#[allow(dead_code)]
impl RecordingMonitor {
    pub fn events_named(&self, name: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn errors(&self) -> Vec<RecordedError> {
        self.errors.lock().unwrap().clone()
    }
}

impl MonitoringSink for RecordingMonitor {
    fn record_event(&self, name: &str, value: f64, _category: &str, metadata: Value) {
        self.events.lock().unwrap().push(RecordedEvent {
            name: name.to_string(),
            value,
            metadata,
        });
    }

    fn record_error(&self, category: &str, message: &str, _metadata: Value) {
        self.errors.lock().unwrap().push(RecordedError {
            category: category.to_string(),
            message: message.to_string(),
        });
    }
}

/// Services wired with mock adapters.
#[allow(dead_code)]
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub push: Arc<MockChannel>,
    pub email: Arc<MockChannel>,
    pub monitor: Arc<RecordingMonitor>,
}

#[allow(dead_code)]
pub fn harness(push: Behavior, email: Behavior) -> TestHarness {
    harness_with(Config::test_default(), push, email)
}

#[allow(dead_code)]
pub fn harness_with(config: Config, push: Behavior, email: Behavior) -> TestHarness {
    let push = MockChannel::new(push);
    let email = MockChannel::new(email);
    let monitor = Arc::new(RecordingMonitor::default());
    let state = Arc::new(AppState::new(
        config,
        push.clone(),
        email.clone(),
        monitor.clone(),
    ));
    TestHarness {
        state,
        push,
        email,
        monitor,
    }
}

/// Create a test app with mock adapters.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let h = harness(Behavior::Succeed, Behavior::Succeed);
    (create_router(h.state.clone()), h.state)
}
