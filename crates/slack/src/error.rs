use std::error::Error as StdError;

/// Crate-wide result type for Slack connector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for the Slack connector.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation referenced a workspace with no registered credential.
    #[error("workspace {workspace_id} is not installed, ensure the app is installed there")]
    NotInstalled { workspace_id: String },

    /// Name or id not resolvable, even after one channel reload.
    #[error(
        "cannot find the channel {channel}, expected a channel ID or name, \
         or a user name, real name, or display name"
    )]
    ChannelNotFound { channel: String },

    /// No user in the workspace matches the given id, name, or real name.
    #[error("no user matching {user} in workspace {workspace_id}")]
    UserNotFound { workspace_id: String, user: String },

    /// Transport- or API-level failure talking to the Slack Web API.
    #[error("slack api call failed: {context}")]
    ProviderCall {
        context: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// OAuth code exchange succeeded transport-wise but the response is
    /// missing a required field. The registry is left untouched.
    #[error("malformed oauth response: {message}")]
    MalformedOAuthResponse { message: String },

    /// Invalid or incomplete connector configuration. Fatal at startup.
    #[error("invalid slack configuration: {message}")]
    Config { message: String },

    /// Error from a connector-neutral channel capability.
    #[error(transparent)]
    Channel(#[from] huddle_channels::Error),
}

impl Error {
    #[must_use]
    pub fn not_installed(workspace_id: impl Into<String>) -> Self {
        Self::NotInstalled {
            workspace_id: workspace_id.into(),
        }
    }

    #[must_use]
    pub fn channel_not_found(channel: impl Into<String>) -> Self {
        Self::ChannelNotFound {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn user_not_found(workspace_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self::UserNotFound {
            workspace_id: workspace_id.into(),
            user: user.into(),
        }
    }

    /// Provider failure with the original cause preserved.
    #[must_use]
    pub fn provider_call(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::ProviderCall {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Provider rejected the call at the API level (`ok: false` envelope).
    #[must_use]
    pub fn provider_rejected(context: impl Into<String>) -> Self {
        Self::ProviderCall {
            context: context.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn malformed_oauth(message: impl Into<String>) -> Self {
        Self::MalformedOAuthResponse {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
