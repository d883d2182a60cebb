//! Connector-neutral seams shared by huddle channel connectors.
//!
//! A connector (Slack, and whatever comes next) talks to the rest of the
//! runtime through two narrow capabilities: [`InstallationListener`] for
//! "a new workspace is ready" notifications, and [`SessionStore`] for
//! creating conversation sessions keyed by the connector.

pub mod error;
pub mod listener;
pub mod session;

pub use {
    error::{Error, Result},
    listener::InstallationListener,
    session::{MemorySessionStore, SessionContext, SessionStore},
};
