//! Multi-workspace Slack connector.
//!
//! Keeps a registry of installed workspaces (one bot credential each) and a
//! per-workspace directory mapping channel ids, channel names, and user name
//! variants to conversation ids. Installation happens either from a static
//! token or through the OAuth redirect endpoint.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod platform;
pub mod registry;
pub mod routes;

pub use {
    api::{Conversation, ConversationKind, Identity, OAuthAccess, SlackApi, UserInfo},
    client::SlackWebClient,
    config::{ConnectionMode, SlackConfig},
    error::{Error, Result},
    platform::{OAuthApp, SlackPlatform},
    registry::{ChannelDirectory, WorkspaceRegistry},
    routes::oauth_router,
};
