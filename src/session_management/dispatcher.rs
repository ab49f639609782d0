use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::configuration::Config;
use crate::data_capture::payload;
use crate::data_capture::{
    CaptureRecord, CaptureSink, ConnectionAccumulators, ConnectionId, Extraction,
};
use crate::error_handling::types::CaptureError;
use crate::network::{resolve_endpoint, Endpoint, HostRegistry};

/// What happened to one write event.
#[derive(Debug)]
pub enum WriteOutcome {
    /// Missing buffer, missing connection or non-positive length.
    Ignored,
    /// Appended; no complete object yet.
    Buffered,
    /// One or more objects were delimited. Each either became an emitted
    /// record or failed; failures have already been logged.
    Extracted(Vec<Result<CaptureRecord, CaptureError>>),
}

impl WriteOutcome {
    /// Records emitted by this write.
    pub fn records(&self) -> Vec<&CaptureRecord> {
        match self {
            WriteOutcome::Extracted(results) => {
                results.iter().filter_map(|r| r.as_ref().ok()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, WriteOutcome::Buffered)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, WriteOutcome::Ignored)
    }
}

/// Event counters, readable while producers are running.
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub writes_observed: AtomicU64,
    pub writes_ignored: AtomicU64,
    pub resolves_observed: AtomicU64,
    pub captures_emitted: AtomicU64,
    pub failures: AtomicU64,
}

impl DispatchStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Routes write and resolve events through reconstruction and attribution.
///
/// Every entry point takes `&self` and may be called concurrently from any
/// number of producer threads. Nothing here blocks on I/O beyond the sink.
pub struct InterceptionDispatcher {
    session_id: Uuid,
    preview_cap: usize,
    log_preview_chars: usize,
    hosts: HostRegistry,
    accumulators: ConnectionAccumulators,
    sink: Arc<dyn CaptureSink>,
    stats: DispatchStats,
}

impl InterceptionDispatcher {
    pub fn new(session_id: Uuid, config: &Config, sink: Arc<dyn CaptureSink>) -> Self {
        Self {
            session_id,
            preview_cap: config.preview_cap,
            log_preview_chars: config.log_preview_chars,
            hosts: HostRegistry::new(),
            accumulators: ConnectionAccumulators::new(config.remainder_policy),
            sink,
            stats: DispatchStats::default(),
        }
    }

    pub fn hosts(&self) -> &HostRegistry {
        &self.hosts
    }

    pub fn accumulators(&self) -> &ConnectionAccumulators {
        &self.accumulators
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Handles a name-resolution event.
    pub fn on_resolve(&self, hostname: Option<&str>) {
        let Some(host) = hostname.filter(|h| !h.is_empty()) else {
            debug!("[{}] resolve event without a host name", self.session_id);
            return;
        };
        DispatchStats::bump(&self.stats.resolves_observed);
        info!("[{}] Resolving host: {}", self.session_id, host);
        self.hosts.remember(host);
    }

    /// Handles an outbound write of `len` bytes from `buffer` on `connection`.
    ///
    /// At most `preview_cap` bytes are observed. Failures are logged and
    /// counted, never propagated.
    pub fn on_write(
        &self,
        connection: Option<ConnectionId>,
        buffer: Option<&[u8]>,
        len: i64,
    ) -> WriteOutcome {
        let (Some(connection), Some(buffer)) = (connection, buffer) else {
            DispatchStats::bump(&self.stats.writes_ignored);
            return WriteOutcome::Ignored;
        };
        let Ok(len) = usize::try_from(len) else {
            DispatchStats::bump(&self.stats.writes_ignored);
            return WriteOutcome::Ignored;
        };
        if len == 0 || buffer.is_empty() {
            DispatchStats::bump(&self.stats.writes_ignored);
            return WriteOutcome::Ignored;
        }
        DispatchStats::bump(&self.stats.writes_observed);

        let observed = &buffer[..len.min(buffer.len()).min(self.preview_cap)];
        let preview: String = String::from_utf8_lossy(observed)
            .chars()
            .take(self.log_preview_chars)
            .collect();
        info!(
            "[{}] [{}] chunk length={} preview={}",
            self.session_id, connection, len, preview
        );

        let extractions = self.accumulators.append_and_drain(connection, observed);
        if extractions.is_empty() {
            return WriteOutcome::Buffered;
        }

        let results = extractions
            .iter()
            .map(|extraction| {
                let result = self.capture(connection, extraction);
                match &result {
                    Ok(record) => {
                        self.sink.emit(record);
                        DispatchStats::bump(&self.stats.captures_emitted);
                    }
                    Err(e) => {
                        warn!("[{}] [{}] JSON parse error: {}", self.session_id, connection, e);
                        DispatchStats::bump(&self.stats.failures);
                    }
                }
                result
            })
            .collect();
        WriteOutcome::Extracted(results)
    }

    fn capture(
        &self,
        connection: ConnectionId,
        extraction: &Extraction,
    ) -> Result<CaptureRecord, CaptureError> {
        let (text, decode_error) = payload::decode_body(extraction.body());
        if let Some(e) = decode_error {
            warn!("[{}] [{}] {}, using lossy text", self.session_id, connection, e);
        }

        let value = payload::parse(&text)?;
        let extracted_text = match payload::locate_prompt_text(&value) {
            Ok("") => {
                debug!("[{}] [{}] empty prompt text", self.session_id, connection);
                None
            }
            Ok(text) => Some(text.to_string()),
            Err(e) => {
                debug!("[{}] [{}] {}", self.session_id, connection, e);
                None
            }
        };

        let endpoint = resolve_endpoint(&extraction.buffer, &self.hosts);
        if endpoint == Endpoint::Unknown {
            debug!(
                "[{}] [{}] {}",
                self.session_id,
                connection,
                CaptureError::AttributionUnavailable
            );
        }

        Ok(CaptureRecord {
            connection,
            extracted_text,
            endpoint,
            payload_len: extraction.span.byte_len(),
            captured_at: Utc::now(),
        })
    }
}
