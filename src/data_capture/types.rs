//! Common data types used across the data_capture subsystem.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::network::types::Endpoint;

/// Opaque token naming one secure-transport session, e.g. the address of the
/// library's per-connection state. Only ever compared and hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::str::FromStr for ConnectionId {
    type Err = std::num::ParseIntError;

    /// Accepts `0x`-prefixed hex (how pointers are usually printed) or decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).map(Self),
            None => s.parse::<u64>().map(Self),
        }
    }
}

impl Serialize for ConnectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConnectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// One balanced top-level JSON object inside an accumulated buffer.
///
/// `end` is inclusive: it indexes the closing `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonSpan {
    pub start: usize,
    pub end: usize,
}

impl JsonSpan {
    pub fn byte_len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..=self.end]
    }
}

/// Result of one completed accumulation cycle for a connection.
///
/// `buffer` is the whole accumulated text at the time the boundary was found,
/// headers included; `span` locates the JSON body inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub buffer: Vec<u8>,
    pub span: JsonSpan,
}

impl Extraction {
    pub fn body(&self) -> &[u8] {
        self.span.slice(&self.buffer)
    }
}

/// A reconstructed payload handed to the output boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureRecord {
    /// Connection the payload was written on.
    pub connection: ConnectionId,
    /// Text found at `contents[0].parts[0].text`, if the payload has that shape.
    pub extracted_text: Option<String>,
    /// Where the payload was headed.
    pub endpoint: Endpoint,
    /// Length of the JSON body in bytes.
    pub payload_len: usize,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_parses_hex_and_decimal() {
        assert_eq!("0x7f00a1".parse::<ConnectionId>().unwrap(), ConnectionId::new(0x7f00a1));
        assert_eq!("42".parse::<ConnectionId>().unwrap(), ConnectionId::new(42));
        assert!("ssl".parse::<ConnectionId>().is_err());
    }

    #[test]
    fn connection_id_deserializes_from_number_or_string() {
        let a: ConnectionId = serde_json::from_str("\"0x10\"").unwrap();
        let b: ConnectionId = serde_json::from_str("16").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0x10");
    }

    #[test]
    fn span_slice_is_inclusive() {
        let buf = b"ab{}cd";
        let span = JsonSpan { start: 2, end: 3 };
        assert_eq!(span.slice(buf), b"{}");
        assert_eq!(span.byte_len(), 2);
    }
}
