use std::io::Write;
use std::sync::Mutex;

use log::{info, warn};

use super::types::CaptureRecord;

/// Output boundary for reconstructed payloads.
///
/// Called on the producer's thread, so implementations must return promptly.
pub trait CaptureSink: Send + Sync {
    fn emit(&self, record: &CaptureRecord);
}

impl<T: CaptureSink + ?Sized> CaptureSink for std::sync::Arc<T> {
    fn emit(&self, record: &CaptureRecord) {
        (**self).emit(record);
    }
}

/// Writes each record as human-readable log lines.
#[derive(Debug, Default)]
pub struct LogSink;

impl CaptureSink for LogSink {
    fn emit(&self, record: &CaptureRecord) {
        info!(
            "[{}] User prompt: {}",
            record.connection,
            record.extracted_text.as_deref().unwrap_or("(not found)")
        );
        info!("[{}] API URL: {}", record.connection, record.endpoint);
        info!("[{}] JSON body length: {}", record.connection, record.payload_len);
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CaptureRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CaptureRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CaptureSink for MemorySink {
    fn emit(&self, record: &CaptureRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
    }
}

/// Writes each record as one JSON object per line.
pub struct JsonLinesSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl CaptureSink for JsonLinesSink {
    fn emit(&self, record: &CaptureRecord) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let written = serde_json::to_writer(&mut *out, record)
            .map_err(std::io::Error::from)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush());
        if let Err(e) = written {
            warn!("[{}] could not write capture record: {}", record.connection, e);
        }
    }
}

/// Forwards every record to each inner sink in turn.
pub struct FanoutSink {
    sinks: Vec<Box<dyn CaptureSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn CaptureSink>>) -> Self {
        Self { sinks }
    }
}

impl CaptureSink for FanoutSink {
    fn emit(&self, record: &CaptureRecord) {
        for sink in &self.sinks {
            sink.emit(record);
        }
    }
}
