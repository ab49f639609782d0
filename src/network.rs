//! Endpoint attribution: name-resolution bookkeeping and HTTP/1.1 request
//! inspection.

pub mod endpoint_resolver;
pub mod host_registry;
pub mod types;

pub use endpoint_resolver::{resolve_endpoint, scan_request, RequestScan, RequestTarget};
pub use host_registry::HostRegistry;
pub use types::Endpoint;
