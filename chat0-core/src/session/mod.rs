//! Client chat sessions
//!
//! A [`ChatSession`] owns the in-memory view of one thread: it persists user
//! messages, streams assistant replies from the server, and publishes
//! [`SessionEvent`]s to observers.

mod chat;
mod state;

pub use chat::{ChatSession, SessionDeps, TurnOutcome};
pub use state::{ChatStatus, SessionEvent};
