use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use log::trace;

use super::json_boundary::find_json_span;
use super::types::{ConnectionId, Extraction};
use crate::configuration::types::RemainderPolicy;

type Buffer = Arc<Mutex<Vec<u8>>>;

/// Per-connection byte buffers awaiting a complete JSON object.
///
/// The map only guards slot creation; each connection's buffer has its own
/// mutex, so producers writing on different connections never wait on each
/// other and two threads can never interleave an append with an extraction on
/// the same connection.
#[derive(Debug, Default)]
pub struct ConnectionAccumulators {
    buffers: DashMap<ConnectionId, Buffer>,
    policy: RemainderPolicy,
}

fn lock(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    // A panicking producer must not stop observation of the connection.
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ConnectionAccumulators {
    pub fn new(policy: RemainderPolicy) -> Self {
        Self {
            buffers: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> RemainderPolicy {
        self.policy
    }

    fn slot(&self, id: ConnectionId) -> Buffer {
        // Clone the Arc so the shard lock is released before the buffer is locked.
        Arc::clone(self.buffers.entry(id).or_default().value())
    }

    /// Appends `chunk` to the buffer of `id`, creating it on first use.
    pub fn append(&self, id: ConnectionId, chunk: &[u8]) {
        let slot = self.slot(id);
        lock(&slot).extend_from_slice(chunk);
    }

    /// Runs the boundary scan on the buffer of `id`.
    ///
    /// On success the buffer is reset according to the remainder policy and
    /// the full pre-reset contents are returned with the located span. On
    /// failure the buffer is left untouched.
    pub fn try_extract(&self, id: ConnectionId) -> Option<Extraction> {
        let slot = self.buffers.get(&id).map(|s| Arc::clone(s.value()))?;
        let mut buf = lock(&slot);
        self.extract_locked(id, &mut buf)
    }

    /// Appends and scans under one lock acquisition.
    pub fn append_and_extract(&self, id: ConnectionId, chunk: &[u8]) -> Option<Extraction> {
        let slot = self.slot(id);
        let mut buf = lock(&slot);
        buf.extend_from_slice(chunk);
        self.extract_locked(id, &mut buf)
    }

    /// Appends, then extracts every complete object now available.
    ///
    /// Under [`RemainderPolicy::Discard`] this is at most one object.
    pub fn append_and_drain(&self, id: ConnectionId, chunk: &[u8]) -> Vec<Extraction> {
        let slot = self.slot(id);
        let mut buf = lock(&slot);
        buf.extend_from_slice(chunk);

        let mut extractions = Vec::new();
        while let Some(extraction) = self.extract_locked(id, &mut buf) {
            extractions.push(extraction);
            if self.policy == RemainderPolicy::Discard {
                break;
            }
        }
        extractions
    }

    fn extract_locked(&self, id: ConnectionId, buf: &mut Vec<u8>) -> Option<Extraction> {
        let Some(span) = find_json_span(buf) else {
            trace!("[{}] no complete object yet, {} bytes pending", id, buf.len());
            return None;
        };

        let buffer = std::mem::take(buf);
        if self.policy == RemainderPolicy::Retain {
            buf.extend_from_slice(&buffer[span.end + 1..]);
        }
        trace!(
            "[{}] object at {}..={}, {} bytes carried over",
            id,
            span.start,
            span.end,
            buf.len()
        );
        Some(Extraction { buffer, span })
    }

    /// Bytes currently waiting on `id`.
    pub fn pending_len(&self, id: ConnectionId) -> usize {
        let Some(slot) = self.buffers.get(&id).map(|s| Arc::clone(s.value())) else {
            return 0;
        };
        let len = lock(&slot).len();
        len
    }

    /// Number of connections that have been seen.
    pub fn connection_count(&self) -> usize {
        self.buffers.len()
    }

    /// Connections still holding unextracted bytes.
    pub fn pending_connections(&self) -> usize {
        self.buffers
            .iter()
            .filter(|entry| !lock(entry.value()).is_empty())
            .count()
    }

    /// Drops the buffer of `id`, if any.
    pub fn remove(&self, id: ConnectionId) {
        self.buffers.remove(&id);
    }

    /// Drops every buffer.
    pub fn clear(&self) {
        self.buffers.clear();
    }
}
