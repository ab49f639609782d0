use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use super::dispatcher::{InterceptionDispatcher, WriteOutcome};
use super::SessionStatus;
use crate::configuration::Config;
use crate::data_capture::{CaptureSink, ConnectionId};

/// Totals reported when a session stops.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub writes_observed: u64,
    pub writes_ignored: u64,
    pub resolves_observed: u64,
    pub captures_emitted: u64,
    pub failures: u64,
    /// Connections that still held an incomplete object at teardown.
    pub pending_connections: usize,
    pub hosts: Vec<String>,
    pub duration: Duration,
}

/// One observation run: all shared state lives here, from start to stop.
///
/// Nothing is process-global, so several sessions (or tests) can run side by
/// side without seeing each other's connections or hosts.
pub struct ObserverSession {
    id: Uuid,
    start_time: DateTime<Utc>,
    active: AtomicBool,
    dispatcher: InterceptionDispatcher,
}

impl ObserverSession {
    pub fn new(config: &Config, sink: Arc<dyn CaptureSink>) -> Self {
        let id = Uuid::new_v4();
        debug!("[{}] ObserverSession created", id);
        Self {
            id,
            start_time: Utc::now(),
            active: AtomicBool::new(true),
            dispatcher: InterceptionDispatcher::new(id, config, sink),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_active() {
            SessionStatus::Active
        } else {
            SessionStatus::Completed
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn dispatcher(&self) -> &InterceptionDispatcher {
        &self.dispatcher
    }

    /// Name-resolution event from the instrumentation layer.
    pub fn on_resolve(&self, hostname: Option<&str>) {
        if !self.is_active() {
            debug!("[{}] resolve event after stop dropped", self.id);
            return;
        }
        self.dispatcher.on_resolve(hostname);
    }

    /// Outbound write event from the instrumentation layer.
    pub fn on_write(
        &self,
        connection: Option<ConnectionId>,
        buffer: Option<&[u8]>,
        len: i64,
    ) -> WriteOutcome {
        if !self.is_active() {
            debug!("[{}] write event after stop dropped", self.id);
            return WriteOutcome::Ignored;
        }
        let outcome = self.dispatcher.on_write(connection, buffer, len);
        // `stop()` may have cleared the buffers while this write was appending.
        if !self.is_active() {
            if let Some(connection) = connection {
                self.dispatcher.accumulators().remove(connection);
            }
        }
        outcome
    }

    /// Stops the session and drops every accumulated buffer.
    ///
    /// Idempotent; later calls return the same counters with a longer duration.
    pub fn stop(&self) -> SessionSummary {
        self.active.store(false, Ordering::SeqCst);

        let accumulators = self.dispatcher.accumulators();
        let pending_connections = accumulators.pending_connections();
        accumulators.clear();

        let stats = self.dispatcher.stats();
        let summary = SessionSummary {
            session_id: self.id,
            writes_observed: stats.writes_observed.load(Ordering::Relaxed),
            writes_ignored: stats.writes_ignored.load(Ordering::Relaxed),
            resolves_observed: stats.resolves_observed.load(Ordering::Relaxed),
            captures_emitted: stats.captures_emitted.load(Ordering::Relaxed),
            failures: stats.failures.load(Ordering::Relaxed),
            pending_connections,
            hosts: self.dispatcher.hosts().hosts(),
            duration: (Utc::now() - self.start_time).to_std().unwrap_or_default(),
        };

        info!(
            "[{}] Session stopped: writes={}, ignored={}, resolves={}, captures={}, failures={}, pending={}, duration={:?}",
            self.id,
            summary.writes_observed,
            summary.writes_ignored,
            summary.resolves_observed,
            summary.captures_emitted,
            summary.failures,
            summary.pending_connections,
            summary.duration
        );
        summary
    }
}
