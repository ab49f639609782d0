//! Session management core module.
//!
//! An [`ObserverSession`] owns everything one observation run needs: the host
//! registry, the per-connection accumulators and the output sink. Events enter
//! through its [`InterceptionDispatcher`].

use serde::Serialize;

/// Submodule routing write and resolve events.
pub mod dispatcher;
/// Submodule for the session lifecycle.
pub mod session;

pub use dispatcher::{DispatchStats, InterceptionDispatcher, WriteOutcome};
pub use session::{ObserverSession, SessionSummary};

/// Represents the current status of a session.
///
/// Variants:
/// - `Active`: events are being processed.
/// - `Completed`: the session was stopped; late events are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Active,
    Completed,
}
