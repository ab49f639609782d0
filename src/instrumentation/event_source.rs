use std::path::Path;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::data_capture::ConnectionId;
use crate::error_handling::types::EventSourceError;
use crate::session_management::ObserverSession;

/// Reader type used when sources of different kinds are mixed.
pub type DynEventReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// One line of a JSON-lines event trace, as written by an instrumentation
/// host.
///
/// ```text
/// {"event":"resolve","host":"api.example.com"}
/// {"event":"write","conn":"0x7f00a1","data":"POST / HTTP/1.1\r\n...","len":123}
/// {"event":"write","conn":"0x7f00a1","data_b64":"AAAEAAE="}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ObservedEvent {
    Resolve {
        #[serde(default)]
        host: Option<String>,
    },
    Write {
        #[serde(default)]
        conn: Option<ConnectionId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_b64: Option<String>,
        /// Reported write length; defaults to the payload length.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        len: Option<i64>,
    },
}

/// An event with its payload decoded, ready for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Resolve(Option<String>),
    Write {
        connection: Option<ConnectionId>,
        data: Option<Vec<u8>>,
        len: i64,
    },
}

impl ObservedEvent {
    pub fn decode(self, line: usize) -> Result<SessionEvent, EventSourceError> {
        match self {
            ObservedEvent::Resolve { host } => Ok(SessionEvent::Resolve(host)),
            ObservedEvent::Write {
                conn,
                data,
                data_b64,
                len,
            } => {
                let data = match (data, data_b64) {
                    (Some(text), _) => Some(text.into_bytes()),
                    (None, Some(encoded)) => Some(BASE64_STANDARD.decode(encoded).map_err(
                        |e| EventSourceError::BadPayload {
                            line,
                            reason: e.to_string(),
                        },
                    )?),
                    (None, None) => None,
                };
                let len = len.unwrap_or_else(|| {
                    data.as_ref()
                        .map_or(0, |d| i64::try_from(d.len()).unwrap_or(i64::MAX))
                });
                Ok(SessionEvent::Write {
                    connection: conn,
                    data,
                    len,
                })
            }
        }
    }
}

impl SessionEvent {
    /// Feeds the event into `session`.
    pub fn apply(&self, session: &ObserverSession) {
        match self {
            SessionEvent::Resolve(host) => session.on_resolve(host.as_deref()),
            SessionEvent::Write {
                connection,
                data,
                len,
            } => {
                session.on_write(*connection, data.as_deref(), *len);
            }
        }
    }
}

/// Totals for one replayed source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub events: usize,
    pub skipped: usize,
}

/// Async reader of JSON-lines events.
///
/// Lines that cannot be decoded are logged and skipped; only I/O errors end
/// the stream early.
pub struct EventSource<R> {
    name: String,
    reader: R,
    line: Vec<u8>,
    line_no: usize,
    skipped: usize,
}

impl<R: AsyncBufRead + Unpin> EventSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            line: Vec::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next decodable event, or `None` at end of input.
    pub async fn next_event(&mut self) -> Result<Option<SessionEvent>, EventSourceError> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if self.line.trim_ascii().is_empty() {
                continue;
            }
            match Self::decode_line(&self.line, self.line_no) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    warn!("[{}] skipping event: {}", self.name, e);
                    self.skipped += 1;
                }
            }
        }
    }

    fn decode_line(line: &[u8], line_no: usize) -> Result<SessionEvent, EventSourceError> {
        let text = std::str::from_utf8(line).map_err(|e| EventSourceError::BadEvent {
            line: line_no,
            reason: e.to_string(),
        })?;
        serde_json::from_str::<ObservedEvent>(text.trim())
            .map_err(|e| EventSourceError::BadEvent {
                line: line_no,
                reason: e.to_string(),
            })?
            .decode(line_no)
    }

    /// Reads the source to the end, applying every event to `session`.
    pub async fn replay(mut self, session: &ObserverSession) -> Result<ReplayStats, EventSourceError> {
        let mut events = 0;
        while let Some(event) = self.next_event().await? {
            event.apply(session);
            events += 1;
        }
        debug!(
            "[{}] source {} finished: {} events, {} skipped",
            session.id(),
            self.name,
            events,
            self.skipped
        );
        Ok(ReplayStats {
            events,
            skipped: self.skipped,
        })
    }
}

impl EventSource<DynEventReader> {
    /// Opens a trace file, or standard input for `-`.
    pub async fn open(path: &Path) -> Result<Self, EventSourceError> {
        if path == Path::new("-") {
            return Ok(Self::stdin());
        }
        let file = File::open(path).await?;
        Ok(Self::new(
            path.display().to_string(),
            Box::new(BufReader::new(file)) as DynEventReader,
        ))
    }

    pub fn stdin() -> Self {
        Self::new(
            "stdin",
            Box::new(BufReader::new(tokio::io::stdin())) as DynEventReader,
        )
    }
}
