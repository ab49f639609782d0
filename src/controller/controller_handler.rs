use std::sync::Arc;

use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::configuration::config::Config;
use crate::data_capture::{CaptureSink, LogSink};
use crate::error_handling::types::*;
use crate::instrumentation::{
    attach_hooks, AttachReport, DynEventReader, EventSource, InstrumentationHost, ReplayHost,
    ReplayStats,
};
use crate::session_management::{ObserverSession, SessionSummary};

/// Wires configuration, hooks, event sources and the observer session.
pub struct Controller {
    pub config: Config,
    session: Arc<ObserverSession>,
    host: Box<dyn InstrumentationHost>,
}

impl Controller {
    /// Controller logging captures through a [`LogSink`] and replaying traces.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        Self::with_sink(config, Arc::new(LogSink))
    }

    pub fn with_sink(config: Config, sink: Arc<dyn CaptureSink>) -> Result<Self, ControllerError> {
        if let Err(err) = config.validate() {
            error!("[!] Invalid configuration: {}", err);
            return Err(ControllerError::ConfigurationError(err));
        }
        let host = Box::new(ReplayHost::new(&config.hooks));
        let session = Arc::new(ObserverSession::new(&config, sink));
        info!("[{}] Controller ready", session.id());
        Ok(Self {
            config,
            session,
            host,
        })
    }

    /// Replaces the instrumentation host used when attaching hooks.
    pub fn with_host(mut self, host: Box<dyn InstrumentationHost>) -> Self {
        self.host = host;
        self
    }

    pub fn session(&self) -> Arc<ObserverSession> {
        Arc::clone(&self.session)
    }

    pub fn attach(&self) -> AttachReport {
        let report = attach_hooks(self.host.as_ref(), &self.config.hooks);
        if report.is_degraded() {
            warn!(
                "[{}] running degraded, missing hooks: {}",
                self.session.id(),
                report.missing.join(", ")
            );
        }
        report
    }

    /// Attaches hooks, replays every source on its own task and stops the
    /// session once all of them are exhausted.
    ///
    /// A source failing on I/O is logged and does not affect the others.
    pub async fn run(
        &self,
        sources: Vec<EventSource<DynEventReader>>,
    ) -> Result<SessionSummary, ControllerError> {
        self.attach();
        info!(
            "[{}] replaying {} event source(s)",
            self.session.id(),
            sources.len()
        );

        let handles: Vec<(String, JoinHandle<Result<ReplayStats, EventSourceError>>)> = sources
            .into_iter()
            .map(|source| {
                let name = source.name().to_string();
                let session = Arc::clone(&self.session);
                let handle = tokio::spawn(async move { source.replay(&session).await });
                (name, handle)
            })
            .collect();

        let mut task_failure = None;
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(stats)) => info!(
                    "[{}] {}: {} events, {} skipped",
                    self.session.id(),
                    name,
                    stats.events,
                    stats.skipped
                ),
                Ok(Err(err)) => error!("[{}] {}: {}", self.session.id(), name, err),
                Err(err) => {
                    error!("[{}] {}: producer task failed: {}", self.session.id(), name, err);
                    task_failure.get_or_insert_with(|| format!("{}: {}", name, err));
                }
            }
        }

        let summary = self.session.stop();
        match task_failure {
            Some(reason) => Err(ControllerError::TaskFailed(reason)),
            None => Ok(summary),
        }
    }

    /// Stops the session; events still arriving are dropped.
    pub fn shutdown(&self) -> SessionSummary {
        info!("[{}] shutdown requested", self.session.id());
        self.session.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_capture::{ConnectionId, MemorySink};
    use crate::session_management::SessionStatus;

    fn source(name: &str, trace: &'static str) -> EventSource<DynEventReader> {
        EventSource::new(name, Box::new(trace.as_bytes()) as DynEventReader)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config {
            preview_cap: 0,
            ..Config::default()
        };
        assert!(matches!(
            Controller::new(config),
            Err(ControllerError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_run_replays_all_sources_and_stops() {
        let sink = Arc::new(MemorySink::new());
        let controller = Controller::with_sink(Config::default(), sink.clone()).unwrap();

        let first = source(
            "first",
            "{\"event\":\"write\",\"conn\":1,\"data\":\"{\\\"a\\\":1}\"}\n",
        );
        let second = source(
            "second",
            "{\"event\":\"write\",\"conn\":2,\"data\":\"{\\\"b\\\":\"}\n{\"event\":\"write\",\"conn\":2,\"data\":\"2}\"}\n",
        );

        let summary = controller.run(vec![first, second]).await.unwrap();
        assert_eq!(summary.captures_emitted, 2);
        assert_eq!(summary.writes_observed, 3);
        assert_eq!(summary.pending_connections, 0);
        assert_eq!(sink.len(), 2);
        assert_eq!(controller.session().status(), SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_run_survives_a_failing_source() {
        let sink = Arc::new(MemorySink::new());
        let controller = Controller::with_sink(Config::default(), sink.clone()).unwrap();

        let broken = tokio_test::io::Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let broken = EventSource::new(
            "broken",
            Box::new(tokio::io::BufReader::new(broken)) as DynEventReader,
        );
        let healthy = source(
            "healthy",
            "{\"event\":\"write\",\"conn\":3,\"data\":\"{\\\"c\\\":3}\"}\n",
        );

        let summary = controller.run(vec![broken, healthy]).await.unwrap();
        assert_eq!(summary.captures_emitted, 1);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_run_with_no_sources() {
        let controller = Controller::with_sink(Config::default(), Arc::new(MemorySink::new())).unwrap();
        let summary = controller.run(Vec::new()).await.unwrap();
        assert_eq!(summary.writes_observed, 0);
    }

    #[test]
    fn test_attach_reports_degraded_host() {
        struct NoExports;
        impl InstrumentationHost for NoExports {
            fn find_export(&self, _module: Option<&str>, _symbol: &str) -> bool {
                false
            }
        }

        let controller = Controller::with_sink(Config::default(), Arc::new(MemorySink::new()))
            .unwrap()
            .with_host(Box::new(NoExports));
        assert!(controller.attach().is_degraded());
    }

    #[test]
    fn test_shutdown_drops_later_events() {
        let sink = Arc::new(MemorySink::new());
        let controller = Controller::with_sink(Config::default(), sink.clone()).unwrap();
        controller.shutdown();
        controller
            .session()
            .on_write(Some(ConnectionId::new(1)), Some(b"{}"), 2);
        assert!(sink.is_empty());
    }
}
