// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Delivery scheduler: the only consumer of the pending notification queue.
//!
//! Each drain walks the queue and, per notification, applies in order:
//!
//! 1. expiry (dropped from the queue, never sent)
//! 2. missing preferences (marked delivered without sending)
//! 3. category toggle (marked delivered without sending)
//! 4. quiet hours (rescheduled to the end of the window, stays queued)
//! 5. daily cap (rescheduled to 09:00 local the next day, stays queued)
//! 6. delivery on every enabled channel, concurrently, each under a timeout
//!
//! One success is enough to mark a notification delivered. If every
//! channel fails the error is reported to the monitoring sink and the
//! notification leaves the queue undelivered; hard failures are not
//! retried automatically.
//!
//! Users are processed concurrently; one user's notifications are processed
//! in queue order so the daily cap sees earlier deliveries of the same batch.

use crate::config::{Config, RETENTION_DAYS};
use crate::db::MemoryDb;
use crate::models::{Notification, NotificationPreferences};
use crate::services::channels::{ChannelError, EmailSender, InAppChannel, PushSender};
use crate::services::monitoring::MonitoringSink;
use crate::time_utils::{local_datetime, local_midnight, next_day_at, next_occurrence};
use chrono::{DateTime, NaiveTime, Utc};
use futures_util::future::{join_all, BoxFuture};
use futures_util::{stream, FutureExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest timer period `spawn` will use.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Local time a capped notification is retried the next day.
fn cap_retry_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Push,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    NoPreferences,
    CategoryDisabled,
    NoChannels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    QuietHours,
    DailyCap,
}

/// What happened to one queued notification during a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(Vec<Channel>),
    Suppressed(SuppressReason),
    Deferred {
        reason: DeferReason,
        until: DateTime<Utc>,
    },
    /// Scheduled for later; left in the queue untouched.
    NotDue,
    Expired,
    /// Every enabled channel failed.
    Failed,
    /// Removed from the store or already delivered; dropped from the queue.
    Stale,
}

/// Counts for one drain, also recorded as the `queue_drained` metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub promoted: usize,
    pub processed: usize,
    pub delivered: usize,
    pub suppressed: usize,
    pub deferred: usize,
    pub not_due: usize,
    pub expired: usize,
    pub failed: usize,
    pub stale: usize,
}

impl DrainReport {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        self.processed += 1;
        match outcome {
            DeliveryOutcome::Delivered(_) => self.delivered += 1,
            DeliveryOutcome::Suppressed(_) => self.suppressed += 1,
            DeliveryOutcome::Deferred { .. } => self.deferred += 1,
            DeliveryOutcome::NotDue => self.not_due += 1,
            DeliveryOutcome::Expired => self.expired += 1,
            DeliveryOutcome::Failed => self.failed += 1,
            DeliveryOutcome::Stale => self.stale += 1,
        }
    }
}

pub struct DeliveryScheduler {
    db: MemoryDb,
    in_app: InAppChannel,
    push: Arc<dyn PushSender>,
    email: Arc<dyn EmailSender>,
    monitor: Arc<dyn MonitoringSink>,
    channel_timeout: Duration,
    max_concurrent: usize,
    retention: chrono::Duration,
}

impl DeliveryScheduler {
    pub fn new(
        config: &Config,
        db: MemoryDb,
        in_app: InAppChannel,
        push: Arc<dyn PushSender>,
        email: Arc<dyn EmailSender>,
        monitor: Arc<dyn MonitoringSink>,
    ) -> Self {
        Self {
            db,
            in_app,
            push,
            email,
            monitor,
            channel_timeout: config.channel_timeout,
            max_concurrent: config.max_concurrent_deliveries.max(1),
            retention: chrono::Duration::days(config.notification_retention_days.clamp(
                *RETENTION_DAYS.start(),
                *RETENTION_DAYS.end(),
            )),
        }
    }

    pub async fn process_queue(&self) -> DrainReport {
        self.process_queue_at(Utc::now()).await
    }

    /// Drain the queue once as of `now`.
    pub async fn process_queue_at(&self, now: DateTime<Utc>) -> DrainReport {
        let promoted = self.promote_due(now);

        // Group by user, keeping queue order within each user.
        let mut order: Vec<String> = Vec::new();
        let mut by_user: HashMap<String, Vec<String>> = HashMap::new();
        for id in self.db.queued_ids() {
            let Some(n) = self.db.get_notification(&id) else {
                self.db.dequeue(&id);
                continue;
            };
            let ids = by_user.entry(n.user_id.clone()).or_insert_with(|| {
                order.push(n.user_id.clone());
                Vec::new()
            });
            ids.push(id);
        }

        let report = Mutex::new(DrainReport {
            promoted,
            ..Default::default()
        });

        let batches: Vec<Vec<String>> = order
            .into_iter()
            .filter_map(|user| by_user.remove(&user))
            .collect();

        stream::iter(batches)
            .for_each_concurrent(self.max_concurrent, |ids| {
                let report = &report;
                async move {
                    for id in ids {
                        let outcome = self.process_one(&id, now).await;
                        if let Ok(mut r) = report.lock() {
                            r.record(&outcome);
                        }
                    }
                }
            })
            .await;

        let report = report.into_inner().unwrap_or_else(|p| p.into_inner());

        tracing::info!(
            processed = report.processed,
            delivered = report.delivered,
            deferred = report.deferred,
            failed = report.failed,
            "Notification queue drained"
        );
        self.monitor.record_event(
            "queue_drained",
            report.processed as f64,
            "notifications",
            json!(report),
        );
        report
    }

    /// Move held notifications whose time has come into the ready queue.
    fn promote_due(&self, now: DateTime<Utc>) -> usize {
        let mut promoted = 0;
        for id in self.db.held_ids() {
            match self.db.get_notification(&id) {
                None => self.db.dequeue(&id),
                Some(n) if n.is_due(now) => {
                    if self.db.enqueue(&id) {
                        promoted += 1;
                    }
                }
                Some(_) => {}
            }
        }
        promoted
    }

    async fn process_one(&self, id: &str, now: DateTime<Utc>) -> DeliveryOutcome {
        let Some(notification) = self.db.get_notification(id) else {
            self.db.dequeue(id);
            return DeliveryOutcome::Stale;
        };
        if notification.is_delivered() {
            self.db.dequeue(id);
            return DeliveryOutcome::Stale;
        }
        if notification.is_expired(now) {
            tracing::info!(notification_id = id, "Notification expired before delivery");
            self.db.dequeue(id);
            return DeliveryOutcome::Expired;
        }
        if !notification.is_due(now) {
            return DeliveryOutcome::NotDue;
        }

        let Some(prefs) = self.db.get_preferences(&notification.user_id) else {
            return self.suppress(&notification, SuppressReason::NoPreferences, now);
        };
        if !prefs.allows(notification.notification_type) {
            return self.suppress(&notification, SuppressReason::CategoryDisabled, now);
        }

        if let Some(until) = quiet_hours_end(&prefs, now) {
            return self.defer(&notification, DeferReason::QuietHours, until);
        }

        let since = local_midnight(now, prefs.utc_offset_minutes);
        let delivered_today = self.db.delivered_since(&notification.user_id, since);
        if delivered_today >= prefs.frequency.max_per_day as usize {
            let until = next_day_at(now, prefs.utc_offset_minutes, cap_retry_time());
            return self.defer(&notification, DeferReason::DailyCap, until);
        }

        if !prefs.has_any_channel() {
            return self.suppress(&notification, SuppressReason::NoChannels, now);
        }

        self.deliver(&notification, &prefs, now).await
    }

    fn suppress(
        &self,
        notification: &Notification,
        reason: SuppressReason,
        now: DateTime<Utc>,
    ) -> DeliveryOutcome {
        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            ?reason,
            "Notification suppressed"
        );
        self.mark_delivered(&notification.id, now);
        self.monitor.record_event(
            "notification_suppressed",
            1.0,
            "notifications",
            json!({ "notification_id": notification.id, "reason": reason }),
        );
        DeliveryOutcome::Suppressed(reason)
    }

    fn defer(
        &self,
        notification: &Notification,
        reason: DeferReason,
        until: DateTime<Utc>,
    ) -> DeliveryOutcome {
        self.db.update_notification(&notification.id, |n| {
            n.scheduled_for = Some(until);
        });
        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            ?reason,
            until = %until,
            "Notification rescheduled"
        );
        DeliveryOutcome::Deferred { reason, until }
    }

    fn mark_delivered(&self, id: &str, now: DateTime<Utc>) {
        self.db.update_notification(id, |n| {
            if n.delivered_at.is_none() {
                n.delivered_at = Some(now);
            }
        });
        self.db.dequeue(id);
    }

    async fn deliver(
        &self,
        notification: &Notification,
        prefs: &NotificationPreferences,
        now: DateTime<Utc>,
    ) -> DeliveryOutcome {
        let mut attempts: Vec<BoxFuture<'_, (Channel, Result<(), ChannelError>)>> = Vec::new();

        if prefs.in_app {
            attempts.push(
                async move { (Channel::InApp, self.in_app.deliver(notification)) }.boxed(),
            );
        }
        if prefs.push {
            let data = json!({
                "notification_id": notification.id,
                "type": notification.notification_type,
                "action_url": notification.action_url,
            });
            attempts.push(
                async move {
                    let result = self
                        .bounded(self.push.send(
                            &notification.user_id,
                            &notification.title,
                            &notification.message,
                            &data,
                        ))
                        .await;
                    (Channel::Push, result)
                }
                .boxed(),
            );
        }
        if prefs.email {
            attempts.push(
                async move {
                    let result = self
                        .bounded(self.email.send(
                            &notification.user_id,
                            &notification.title,
                            &notification.message,
                            notification.action_url.as_deref(),
                        ))
                        .await;
                    (Channel::Email, result)
                }
                .boxed(),
            );
        }

        let mut succeeded = Vec::new();
        let mut errors = Vec::new();
        for (channel, result) in join_all(attempts).await {
            match result {
                Ok(()) => succeeded.push(channel),
                Err(e) => {
                    tracing::warn!(
                        notification_id = %notification.id,
                        ?channel,
                        error = %e,
                        "Channel delivery failed"
                    );
                    self.monitor.record_event(
                        "channel_failed",
                        1.0,
                        "notifications",
                        json!({ "notification_id": notification.id, "channel": channel }),
                    );
                    errors.push(format!("{channel:?}: {e}"));
                }
            }
        }

        if succeeded.is_empty() {
            let message = errors.join("; ");
            tracing::error!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                error = %message,
                "All delivery channels failed"
            );
            self.monitor.record_error(
                "notification_delivery",
                &message,
                json!({ "notification_id": notification.id, "user_id": notification.user_id }),
            );
            self.db.dequeue(&notification.id);
            return DeliveryOutcome::Failed;
        }

        self.mark_delivered(&notification.id, now);
        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            channels = ?succeeded,
            "Notification delivered"
        );
        self.monitor.record_event(
            "notification_delivered",
            succeeded.len() as f64,
            "notifications",
            json!({ "notification_id": notification.id, "channels": succeeded }),
        );
        DeliveryOutcome::Delivered(succeeded)
    }

    async fn bounded(
        &self,
        call: impl std::future::Future<Output = Result<(), ChannelError>>,
    ) -> Result<(), ChannelError> {
        tokio::time::timeout(self.channel_timeout, call)
            .await
            .unwrap_or(Err(ChannelError::Timeout(self.channel_timeout)))
    }

    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    /// Purge notifications past retention or past their expiry, delivered
    /// or not. Returns how many were removed.
    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let removed = self
            .db
            .purge_notifications(|n| n.created_at < cutoff || n.is_expired(now));
        for id in &removed {
            self.db.dequeue(id);
        }

        tracing::info!(removed = removed.len(), "Notification cleanup finished");
        self.monitor.record_event(
            "notifications_purged",
            removed.len() as f64,
            "notifications",
            json!({ "cutoff": cutoff }),
        );
        removed.len()
    }

    /// Run the drain and cleanup timers until [`SchedulerHandle::shutdown`].
    pub fn spawn(
        self: Arc<Self>,
        queue_interval: Duration,
        cleanup_interval: Duration,
    ) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let db = self.db.clone();

        // `interval` panics on a zero period.
        let queue_interval = queue_interval.max(MIN_TICK);
        let cleanup_interval = cleanup_interval.max(MIN_TICK);

        let task = tokio::spawn(async move {
            let mut queue_tick = tokio::time::interval(queue_interval);
            queue_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cleanup_tick = tokio::time::interval(cleanup_interval);
            cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(?queue_interval, ?cleanup_interval, "Delivery scheduler started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = queue_tick.tick() => {
                        self.process_queue().await;
                    }
                    _ = cleanup_tick.tick() => {
                        self.cleanup();
                    }
                }
            }
            tracing::info!("Delivery scheduler stopped");
        });

        SchedulerHandle {
            shutdown_tx,
            task,
            db,
        }
    }
}

/// When quiet hours apply at `now`, the first instant after the window.
///
/// The window end is inclusive at minute resolution, so delivery resumes one
/// minute after `end`.
fn quiet_hours_end(prefs: &NotificationPreferences, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let local = local_datetime(now, prefs.utc_offset_minutes).time();
    if !prefs.quiet_hours.contains(local) {
        return None;
    }
    let resume = prefs.quiet_hours.end + chrono::Duration::minutes(1);
    Some(next_occurrence(now, prefs.utc_offset_minutes, resume))
}

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    db: MemoryDb,
}

impl SchedulerHandle {
    /// Stop accepting queue items, let any in-flight drain finish, then
    /// stop both timers.
    pub async fn shutdown(self) {
        self.db.close_queue();
        if self.shutdown_tx.send(true).is_err() {
            tracing::debug!("Scheduler task already gone");
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Scheduler task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNotification, NotificationType, PreferencesUpdate};
    use crate::services::event_bus::EventBus;
    use crate::services::monitoring::recording::RecordingMonitor;
    use crate::services::notifications::NotificationService;
    use crate::services::presence::PresenceRegistry;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::Value;

    struct Outcome(bool);

    #[async_trait]
    impl PushSender for Outcome {
        async fn send(&self, _: &str, _: &str, _: &str, _: &Value) -> Result<(), ChannelError> {
            if self.0 {
                Ok(())
            } else {
                Err(ChannelError::NotConfigured("push"))
            }
        }
    }

    #[async_trait]
    impl EmailSender for Outcome {
        async fn send(&self, _: &str, _: &str, _: &str, _: Option<&str>) -> Result<(), ChannelError> {
            if self.0 {
                Ok(())
            } else {
                Err(ChannelError::NotConfigured("email"))
            }
        }
    }

    struct Fixture {
        db: MemoryDb,
        notifications: NotificationService,
        monitor: Arc<RecordingMonitor>,
        scheduler: DeliveryScheduler,
    }

    fn fixture(push_ok: bool, email_ok: bool) -> Fixture {
        let db = MemoryDb::new();
        let bus = Arc::new(EventBus::new(Arc::new(PresenceRegistry::new())));
        let monitor = Arc::new(RecordingMonitor::default());
        let scheduler = DeliveryScheduler::new(
            &Config::test_default(),
            db.clone(),
            InAppChannel::new(db.clone(), bus),
            Arc::new(Outcome(push_ok)),
            Arc::new(Outcome(email_ok)),
            monitor.clone(),
        );
        Fixture {
            notifications: NotificationService::new(db.clone()),
            db,
            monitor,
            scheduler,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    fn note(user: &str) -> NewNotification {
        NewNotification::new(user, NotificationType::System, "t", "m")
    }

    fn prefs(json: &str) -> PreferencesUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_no_preferences_marks_delivered_without_sending() {
        let f = fixture(true, true);
        let n = f.notifications.create_at(note("alice"), at(12, 0));

        let report = f.scheduler.process_queue_at(at(12, 0)).await;

        assert_eq!(report.suppressed, 1);
        assert!(f.db.get_notification(&n.id).unwrap().is_delivered());
        assert!(!f.db.is_queued(&n.id));
    }

    #[tokio::test]
    async fn test_disabled_category_is_suppressed() {
        let f = fixture(true, true);
        f.notifications
            .set_preferences("alice", prefs(r#"{"categories": {"system_alerts": false}}"#))
            .unwrap();
        let n = f.notifications.create_at(note("alice"), at(12, 0));

        let report = f.scheduler.process_queue_at(at(12, 0)).await;

        assert_eq!(report.suppressed, 1);
        assert!(f.db.get_notification(&n.id).unwrap().is_delivered());
    }

    #[tokio::test]
    async fn test_quiet_hours_reschedules_past_window_end() {
        let f = fixture(true, true);
        f.notifications.set_preferences(
            "alice",
            prefs(r#"{"quiet_hours": {"enabled": true, "start": "22:00", "end": "07:00"}}"#),
        ).unwrap();
        let n = f.notifications.create_at(note("alice"), at(23, 0));

        let report = f.scheduler.process_queue_at(at(23, 0)).await;
        assert_eq!(report.deferred, 1);

        let stored = f.db.get_notification(&n.id).unwrap();
        assert!(!stored.is_delivered());
        assert_eq!(
            stored.scheduled_for,
            Some(Utc.with_ymd_and_hms(2024, 3, 16, 7, 1, 0).unwrap())
        );
        assert!(f.db.is_queued(&n.id));

        // Still waiting at 07:00, delivered once the window is over.
        let early = Utc.with_ymd_and_hms(2024, 3, 16, 7, 0, 0).unwrap();
        assert_eq!(f.scheduler.process_queue_at(early).await.not_due, 1);
        let later = Utc.with_ymd_and_hms(2024, 3, 16, 7, 1, 0).unwrap();
        assert_eq!(f.scheduler.process_queue_at(later).await.delivered, 1);
    }

    #[tokio::test]
    async fn test_quiet_hours_use_local_offset() {
        let f = fixture(true, true);
        // 23:00 local at UTC-5 is 04:00 UTC the next day.
        f.notifications.set_preferences(
            "alice",
            prefs(
                r#"{"utc_offset_minutes": -300,
                    "quiet_hours": {"enabled": true, "start": "22:00", "end": "07:00"}}"#,
            ),
        ).unwrap();
        f.notifications.create_at(note("alice"), at(4, 0));

        let report = f.scheduler.process_queue_at(at(4, 0)).await;
        assert_eq!(report.deferred, 1);
    }

    #[tokio::test]
    async fn test_partial_channel_failure_still_delivers() {
        let f = fixture(false, true);
        f.notifications.set_preferences("alice", prefs(r#"{"in_app": false}"#)).unwrap();
        let n = f.notifications.create_at(note("alice"), at(12, 0));

        f.scheduler.process_queue_at(at(12, 0)).await;

        assert!(f.db.get_notification(&n.id).unwrap().is_delivered());
        assert_eq!(f.monitor.events_named("channel_failed").len(), 1);
        assert!(f.monitor.errors().is_empty());
    }

    #[tokio::test]
    async fn test_total_failure_reports_error_and_leaves_undelivered() {
        let f = fixture(false, false);
        f.notifications.set_preferences("alice", prefs(r#"{"in_app": false}"#)).unwrap();
        let n = f.notifications.create_at(note("alice"), at(12, 0));
        let other = f.notifications.create_at(note("bob"), at(12, 0));
        f.notifications.set_preferences("bob", PreferencesUpdate::default()).unwrap();

        let report = f.scheduler.process_queue_at(at(12, 0)).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert!(!f.db.get_notification(&n.id).unwrap().is_delivered());
        assert!(!f.db.is_queued(&n.id));
        assert!(f.db.get_notification(&other.id).unwrap().is_delivered());
        assert_eq!(f.monitor.errors().len(), 1);
        assert_eq!(f.monitor.errors()[0].category, "notification_delivery");
    }

    #[tokio::test]
    async fn test_expired_notification_is_dropped() {
        let f = fixture(true, true);
        f.notifications.set_preferences("alice", PreferencesUpdate::default()).unwrap();
        let n = f
            .notifications
            .create_at(note("alice").expires_at(at(11, 0)), at(10, 0));

        let report = f.scheduler.process_queue_at(at(12, 0)).await;

        assert_eq!(report.expired, 1);
        assert!(!f.db.get_notification(&n.id).unwrap().is_delivered());
        assert!(f.db.queued_ids().is_empty());
    }

    #[tokio::test]
    async fn test_held_notification_promoted_when_due() {
        let f = fixture(true, true);
        f.notifications.set_preferences("alice", PreferencesUpdate::default()).unwrap();
        let n = f
            .notifications
            .create_at(note("alice").scheduled_for(at(15, 0)), at(12, 0));

        let report = f.scheduler.process_queue_at(at(14, 59)).await;
        assert_eq!(report.processed, 0);

        let report = f.scheduler.process_queue_at(at(15, 0)).await;
        assert_eq!(report.promoted, 1);
        assert_eq!(report.delivered, 1);
        assert!(f.db.get_notification(&n.id).unwrap().is_delivered());
    }

    #[tokio::test]
    async fn test_queue_drained_metric_recorded() {
        let f = fixture(true, true);
        f.scheduler.process_queue_at(at(12, 0)).await;
        let drained = f.monitor.events_named("queue_drained");
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].value, 0.0);
    }

    #[tokio::test]
    async fn test_cleanup_purges_old_and_expired() {
        let f = fixture(true, true);
        let now = at(12, 0);
        let old = f
            .notifications
            .create_at(note("alice"), now - chrono::Duration::days(31));
        let expired = f.notifications.create_at(
            note("alice").expires_at(now - chrono::Duration::hours(1)),
            now - chrono::Duration::hours(2),
        );
        let fresh = f.notifications.create_at(note("alice"), now);

        assert_eq!(f.scheduler.cleanup_at(now), 2);
        assert!(f.db.get_notification(&old.id).is_none());
        assert!(f.db.get_notification(&expired.id).is_none());
        assert!(f.db.get_notification(&fresh.id).is_some());
        assert_eq!(f.db.queued_ids(), vec![fresh.id]);
    }

    #[tokio::test]
    async fn test_shutdown_closes_queue() {
        let f = fixture(true, true);
        let db = f.db.clone();
        let handle =
            Arc::new(f.scheduler).spawn(Duration::from_secs(3600), Duration::from_secs(3600));

        handle.shutdown().await;

        assert!(db.is_queue_closed());
        assert!(!db.enqueue("late"));
    }

    #[tokio::test]
    async fn test_degenerate_config_does_not_panic() {
        let config = Config {
            notification_retention_days: i64::MAX,
            ..Config::test_default()
        };
        let db = MemoryDb::new();
        let bus = Arc::new(EventBus::new(Arc::new(PresenceRegistry::new())));
        let scheduler = DeliveryScheduler::new(
            &config,
            db.clone(),
            InAppChannel::new(db.clone(), bus),
            Arc::new(Outcome(true)),
            Arc::new(Outcome(true)),
            Arc::new(RecordingMonitor::default()),
        );
        assert_eq!(scheduler.cleanup_at(at(12, 0)), 0);

        let notifications = NotificationService::new(db.clone());
        notifications
            .set_preferences("alice", PreferencesUpdate::default())
            .unwrap();
        let n = notifications.create(note("alice"));

        let handle = Arc::new(scheduler).spawn(Duration::ZERO, Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        // The timers ran, so neither zero period panicked the task.
        assert!(db.get_notification(&n.id).unwrap().is_delivered());
        assert!(db.is_queue_closed());
    }
}
