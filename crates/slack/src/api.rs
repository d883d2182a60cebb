use {async_trait::async_trait, serde::Deserialize};

use crate::error::Result;

/// Conversation kinds requested when listing channels.
///
/// Private and unlisted kinds are deliberately never requested; the connector
/// only tracks public channels, direct messages, and multi-person direct
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    PublicChannel,
    Im,
    Mpim,
}

impl ConversationKind {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::PublicChannel => "public_channel",
            Self::Im => "im",
            Self::Mpim => "mpim",
        }
    }
}

/// The fixed set of kinds loaded into the channel directory.
pub const DIRECTORY_KINDS: [ConversationKind; 3] = [
    ConversationKind::PublicChannel,
    ConversationKind::Im,
    ConversationKind::Mpim,
];

/// One conversation visible to a workspace credential.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Present for named (group) conversations, absent for direct ones.
    #[serde(default)]
    pub name: Option<String>,
    /// Counterpart user of a direct conversation.
    #[serde(default, rename = "user")]
    pub counterpart_user: Option<String>,
}

/// Flattened user record (`users.info` / `users.list`).
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: String,
    /// Login name.
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Result of an identity check (`auth.test`) for a credential.
#[derive(Debug, Clone)]
pub struct Identity {
    pub workspace_id: String,
}

/// Result of an OAuth code exchange.
///
/// Both fields are optional on the wire; the installation handler rejects a
/// response missing either one without touching the registry.
#[derive(Debug, Clone)]
pub struct OAuthAccess {
    pub workspace_id: Option<String>,
    pub bot_token: Option<String>,
}

/// A message accepted by `chat.postMessage`.
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub channel: String,
    /// Slack message timestamp, which doubles as the message id.
    pub ts: String,
}

/// Slack Web API capability consumed by the connector.
///
/// [`SlackWebClient`](crate::client::SlackWebClient) is the production
/// implementation; tests substitute their own.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `auth.test` — resolve the workspace a credential belongs to.
    async fn identity_check(&self, token: &str) -> Result<Identity>;

    /// `oauth.access` — exchange an authorization code for a bot credential.
    async fn exchange_oauth_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<OAuthAccess>;

    /// `conversations.list` restricted to the given kinds.
    async fn list_conversations(
        &self,
        token: &str,
        kinds: &[ConversationKind],
    ) -> Result<Vec<Conversation>>;

    /// `users.info` for one user.
    async fn get_user(&self, token: &str, user_id: &str) -> Result<UserInfo>;

    /// `users.list` — all members of the workspace.
    async fn list_users(&self, token: &str) -> Result<Vec<UserInfo>>;

    /// `chat.postMessage` to an already-resolved channel id.
    async fn post_message(&self, token: &str, channel: &str, text: &str) -> Result<PostedMessage>;
}
