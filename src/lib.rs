pub mod configuration;
pub use configuration::{CliArgs, Config};

pub mod controller;
pub use controller::Controller;

pub mod data_capture;
pub use data_capture::{CaptureRecord, CaptureSink, ConnectionId};

pub mod error_handling;

pub mod instrumentation;

pub mod network;
pub use network::Endpoint;

pub mod session_management;
pub use session_management::{ObserverSession, SessionSummary};
