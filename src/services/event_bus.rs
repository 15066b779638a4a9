// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event bus: fans realtime events out to live connections.
//!
//! Each user has at most one registered connection. An event is serialized
//! once per broadcast and pushed to every connection in turn; a connection
//! that fails is dropped (and its user removed from presence) without
//! affecting delivery to the others. Events for offline users are discarded
//! here. Durable delivery is the notification pipeline's job.

use crate::models::{EventPayload, PresenceAction, RealtimeEvent};
use crate::services::presence::PresenceRegistry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transport half of a live connection.
pub trait LiveConnection: Send + Sync {
    /// Push one serialized event. An error means the connection is dead.
    fn send(&self, payload: &str) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Send rejected: {0}")]
    Rejected(String),
}

/// Connection backed by an unbounded channel; the receiving half is
/// drained by whatever owns the socket.
pub struct ChannelConnection {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelConnection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LiveConnection for ChannelConnection {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        self.tx
            .send(payload.to_string())
            .map_err(|_| TransportError::Closed)
    }
}

struct Registered {
    connection_id: String,
    connection: Arc<dyn LiveConnection>,
}

pub struct EventBus {
    connections: DashMap<String, Registered>,
    presence: Arc<PresenceRegistry>,
}

impl EventBus {
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self {
            connections: DashMap::new(),
            presence,
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Register (or replace) the live connection for `user_id`.
    ///
    /// Marks the user present and broadcasts `user_joined` (joined).
    /// Returns an id that [`release_connection`](Self::release_connection)
    /// uses to avoid tearing down a newer connection.
    pub fn register_connection(
        &self,
        user_id: &str,
        connection: Arc<dyn LiveConnection>,
    ) -> String {
        let connection_id = uuid::Uuid::new_v4().to_string();
        let replaced = self
            .connections
            .insert(
                user_id.to_string(),
                Registered {
                    connection_id: connection_id.clone(),
                    connection,
                },
            )
            .is_some();
        self.presence.touch(user_id);

        tracing::info!(user_id, connection_id = %connection_id, replaced, "Connection registered");

        self.broadcast(&RealtimeEvent::new(
            user_id,
            EventPayload::UserJoined {
                action: PresenceAction::Joined,
            },
        ));
        connection_id
    }

    /// Remove the user's connection regardless of which one it is.
    ///
    /// Removes the user from presence and broadcasts `user_joined` (left).
    pub fn unregister_connection(&self, user_id: &str) -> bool {
        let removed = self.connections.remove(user_id).is_some();
        self.after_removal(user_id, removed);
        removed
    }

    /// Remove the user's connection only if it is still `connection_id`.
    pub fn release_connection(&self, user_id: &str, connection_id: &str) -> bool {
        let removed = self
            .connections
            .remove_if(user_id, |_, r| r.connection_id == connection_id)
            .is_some();
        self.after_removal(user_id, removed);
        removed
    }

    fn after_removal(&self, user_id: &str, removed: bool) {
        if !removed {
            return;
        }
        self.presence.remove(user_id);
        tracing::info!(user_id, "Connection unregistered");
        self.broadcast(&RealtimeEvent::new(
            user_id,
            EventPayload::UserJoined {
                action: PresenceAction::Left,
            },
        ));
    }

    /// Refresh presence for a connected user (inbound frame or ping).
    pub fn heartbeat(&self, user_id: &str) {
        if self.connections.contains_key(user_id) {
            self.presence.touch(user_id);
        }
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Push an event to every live connection. Returns how many accepted it.
    pub fn broadcast(&self, event: &RealtimeEvent) -> usize {
        let Some(payload) = serialize(event) else {
            return 0;
        };

        // Snapshot so no map lock is held while sending.
        let targets: Vec<(String, String, Arc<dyn LiveConnection>)> = self
            .connections
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.connection_id.clone(),
                    Arc::clone(&entry.connection),
                )
            })
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (user_id, connection_id, connection) in targets {
            match connection.send(&payload) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        event = event.kind(),
                        error = %e,
                        "Broadcast to connection failed, dropping it"
                    );
                    failed.push((user_id, connection_id));
                }
            }
        }

        for (user_id, connection_id) in failed {
            self.release_connection(&user_id, &connection_id);
        }

        tracing::debug!(event = event.kind(), delivered, "Event broadcast");
        delivered
    }

    /// Push an event to one user's live connection.
    ///
    /// Returns false (and queues nothing) if the user has no connection or
    /// the send failed.
    pub fn send_to_user(&self, user_id: &str, event: &RealtimeEvent) -> bool {
        let Some((connection_id, connection)) = self
            .connections
            .get(user_id)
            .map(|r| (r.connection_id.clone(), Arc::clone(&r.connection)))
        else {
            tracing::debug!(user_id, event = event.kind(), "No live connection, event dropped");
            return false;
        };

        let Some(payload) = serialize(event) else {
            return false;
        };

        match connection.send(&payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    user_id,
                    event = event.kind(),
                    error = %e,
                    "Send to connection failed, dropping it"
                );
                self.release_connection(user_id, &connection_id);
                false
            }
        }
    }
}

fn serialize(event: &RealtimeEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::error!(event = event.kind(), error = %e, "Failed to serialize event");
            None
        }
    }
}
