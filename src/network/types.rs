use std::fmt;

use serde::{Serialize, Serializer};

/// Returned when nothing about the destination could be determined.
pub const UNKNOWN_ENDPOINT: &str = "Unknown API URL";
/// Appended to registry-inferred endpoints, whose path is not visible.
pub const UNDETERMINED_PROTOCOL_SUFFIX: &str = "/(HTTP/2 or gRPC)";

/// Where a captured payload was headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Request line and `Host:` header were both visible.
    Url { host: String, path: String },
    /// Request line visible, `Host:` header absent.
    Path(String),
    /// No HTTP/1.1 request line; host taken from earlier name resolutions.
    Inferred { host: String },
    /// No attribution possible.
    Unknown,
}

impl Endpoint {
    pub fn host(&self) -> Option<&str> {
        match self {
            Endpoint::Url { host, .. } | Endpoint::Inferred { host } => Some(host),
            Endpoint::Path(_) | Endpoint::Unknown => None,
        }
    }

    /// True when the endpoint came from the request itself rather than from
    /// the host registry fallback.
    pub fn is_exact(&self) -> bool {
        matches!(self, Endpoint::Url { .. } | Endpoint::Path(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Url { host, path } => write!(f, "https://{}{}", host, path),
            Endpoint::Path(path) => f.write_str(path),
            Endpoint::Inferred { host } => {
                write!(f, "https://{}{}", host, UNDETERMINED_PROTOCOL_SUFFIX)
            }
            Endpoint::Unknown => f.write_str(UNKNOWN_ENDPOINT),
        }
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
