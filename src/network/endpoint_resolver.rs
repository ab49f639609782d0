//! Attribution of a captured payload to the endpoint it was sent to.
//!
//! HTTP/1.1 requests carry their destination in clear text: the request line
//! gives the path and the `Host:` header gives the server. Binary framed
//! protocols (HTTP/2, gRPC) hide both, so the resolver falls back to the
//! hosts seen during name resolution.

use log::debug;

use super::host_registry::HostRegistry;
use super::types::Endpoint;

const HTTP11_MARKER: &[u8] = b" HTTP/1.1";
const POST_TOKEN: &[u8] = b"POST ";
const HOST_HEADER: &[u8] = b"Host:";
const LINE_END: &[u8] = b"\r\n";

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// What could be read from a clear-text HTTP/1.1 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub path: String,
    pub host: Option<String>,
}

/// Outcome of looking for an HTTP/1.1 request in accumulated bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestScan {
    /// No ` HTTP/1.1` marker: the traffic is not HTTP/1.1.
    NotHttp11,
    /// Marker present but no `POST ` request line before it.
    NoRequestLine,
    Found(RequestTarget),
}

/// Extracts the POST path and `Host:` header from accumulated bytes.
///
/// The path is the text between the nearest `POST ` at or before the marker
/// and the marker itself. The host is the trimmed text after the first
/// `Host:` up to the next CRLF (or the end of the buffer).
pub fn scan_request(buf: &[u8]) -> RequestScan {
    let Some(marker) = find(buf, HTTP11_MARKER) else {
        return RequestScan::NotHttp11;
    };

    // A `POST ` starting at or before the marker fits inside buf[..marker + 5].
    let Some(method) = rfind(&buf[..marker + POST_TOKEN.len()], POST_TOKEN) else {
        return RequestScan::NoRequestLine;
    };
    let path_start = (method + POST_TOKEN.len()).min(marker);
    let path = String::from_utf8_lossy(&buf[path_start..marker]).into_owned();

    let host = find(buf, HOST_HEADER).and_then(|idx| {
        let start = idx + HOST_HEADER.len();
        let end = find(&buf[start..], LINE_END).map_or(buf.len(), |n| start + n);
        let host = String::from_utf8_lossy(&buf[start..end]).trim().to_string();
        (!host.is_empty()).then_some(host)
    });

    RequestScan::Found(RequestTarget { path, host })
}

/// Attributes accumulated request bytes to an endpoint.
///
/// A `Host:` header found here is fed back into `hosts`, so later binary
/// traffic can still be attributed.
pub fn resolve_endpoint(buf: &[u8], hosts: &HostRegistry) -> Endpoint {
    match scan_request(buf) {
        RequestScan::Found(RequestTarget {
            path,
            host: Some(host),
        }) => {
            hosts.remember(&host);
            Endpoint::Url { host, path }
        }
        RequestScan::Found(RequestTarget { path, host: None }) => Endpoint::Path(path),
        RequestScan::NoRequestLine => {
            debug!("HTTP/1.1 marker without a POST request line");
            Endpoint::Unknown
        }
        RequestScan::NotHttp11 => match hosts.any_known_host() {
            Some(host) => Endpoint::Inferred { host },
            None => Endpoint::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] =
        b"POST /v1/chat HTTP/1.1\r\nHost: api.example.com\r\nContent-Type: application/json\r\n\r\n{\"a\":1}";

    #[test]
    fn full_request_yields_url_and_learns_host() {
        let hosts = HostRegistry::new();
        let endpoint = resolve_endpoint(REQUEST, &hosts);
        assert_eq!(endpoint.to_string(), "https://api.example.com/v1/chat");
        assert!(hosts.contains("api.example.com"));
    }

    #[test]
    fn missing_host_header_yields_bare_path() {
        let hosts = HostRegistry::new();
        let endpoint = resolve_endpoint(b"POST /v1/chat HTTP/1.1\r\n\r\n{}", &hosts);
        assert_eq!(endpoint, Endpoint::Path("/v1/chat".to_string()));
        assert!(hosts.is_empty());
    }

    #[test]
    fn binary_traffic_falls_back_to_registry() {
        let hosts = HostRegistry::new();
        hosts.remember("api.example.com");
        let endpoint = resolve_endpoint(b"\x00\x00\x12\x01\x04{\"a\":1}", &hosts);
        assert_eq!(endpoint.to_string(), "https://api.example.com/(HTTP/2 or gRPC)");
    }

    #[test]
    fn binary_traffic_with_empty_registry_is_unknown() {
        let hosts = HostRegistry::new();
        assert_eq!(resolve_endpoint(b"{\"a\":1}", &hosts), Endpoint::Unknown);
    }

    #[test]
    fn request_line_wins_over_registry() {
        let hosts = HostRegistry::new();
        hosts.remember("dns.example.com");
        let endpoint = resolve_endpoint(REQUEST, &hosts);
        assert_eq!(endpoint.host(), Some("api.example.com"));
        assert_eq!(hosts.any_known_host().as_deref(), Some("dns.example.com"));
    }

    #[test]
    fn marker_without_post_is_unknown() {
        let hosts = HostRegistry::new();
        hosts.remember("dns.example.com");
        let endpoint = resolve_endpoint(b"GET /x HTTP/1.1\r\nHost: a.example\r\n\r\n{}", &hosts);
        assert_eq!(endpoint, Endpoint::Unknown);
    }

    #[test]
    fn nearest_post_before_marker_is_used() {
        let buf = b"POST /old\r\n{}POST /v2/generate HTTP/1.1\r\nHost: b.example\r\n";
        match scan_request(buf) {
            RequestScan::Found(target) => {
                assert_eq!(target.path, "/v2/generate");
                assert_eq!(target.host.as_deref(), Some("b.example"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn host_without_line_end_runs_to_buffer_end() {
        let buf = b"POST /p HTTP/1.1\r\nHost:  c.example ";
        match scan_request(buf) {
            RequestScan::Found(target) => assert_eq!(target.host.as_deref(), Some("c.example")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_host_header_is_treated_as_absent() {
        let hosts = HostRegistry::new();
        let endpoint = resolve_endpoint(b"POST /p HTTP/1.1\r\nHost: \r\n\r\n{}", &hosts);
        assert_eq!(endpoint, Endpoint::Path("/p".to_string()));
        assert!(hosts.is_empty());
    }
}
