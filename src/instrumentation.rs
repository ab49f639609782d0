//! Boundary between the observer and whatever delivers intercepted calls.
//!
//! A host reports which entry points it could hook ([`attach_hooks`]); events
//! then arrive as JSON lines through an [`EventSource`].

pub mod event_source;
pub mod hooks;

pub use event_source::{DynEventReader, EventSource, ObservedEvent, ReplayStats, SessionEvent};
pub use hooks::{attach_hooks, AttachReport, InstrumentationHost, ReplayHost};
