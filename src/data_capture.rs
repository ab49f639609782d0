//! Reconstruction of JSON payloads from per-connection write streams.
//!
//! Writes are accumulated per connection ([`ConnectionAccumulators`]), scanned
//! for the first balanced object ([`find_json_span`]) and parsed
//! ([`payload`]). Finished records leave through a [`CaptureSink`].

pub mod accumulator;
pub mod json_boundary;
pub mod payload;
pub mod sink;
pub mod types;

pub use accumulator::ConnectionAccumulators;
pub use json_boundary::find_json_span;
pub use sink::{CaptureSink, FanoutSink, JsonLinesSink, LogSink, MemorySink};
pub use types::{CaptureRecord, ConnectionId, Extraction, JsonSpan};
