use std::sync::Arc;

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
};

use {
    huddle_channels::{InstallationListener, SessionContext, SessionStore},
    crate::{
        api::{DIRECTORY_KINDS, SlackApi},
        error::{Error, Result},
        registry::{ChannelDirectory, WorkspaceRegistry},
    },
};

/// OAuth application credentials for distributed installations.
#[derive(Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

/// Separator between workspace id and channel id in session keys.
const SESSION_KEY_SEPARATOR: char = '@';

/// Multi-workspace Slack connector.
///
/// Owns the workspace registry and the per-workspace channel directories, and
/// exposes the resolution API consumed by the rest of the runtime.
pub struct SlackPlatform {
    api: Arc<dyn SlackApi>,
    registry: WorkspaceRegistry,
    sessions: Arc<dyn SessionStore>,
    listeners: Vec<Arc<dyn InstallationListener>>,
    oauth: Option<OAuthApp>,
}

impl SlackPlatform {
    #[must_use]
    pub fn new(api: Arc<dyn SlackApi>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            registry: WorkspaceRegistry::new(),
            sessions,
            listeners: Vec::new(),
            oauth: None,
        }
    }

    /// Register a listener notified after each completed installation.
    /// Listeners run in registration order.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn InstallationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Enable the OAuth installation path.
    #[must_use]
    pub fn with_oauth_app(mut self, oauth: OAuthApp) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn registry(&self) -> &WorkspaceRegistry {
        &self.registry
    }

    pub fn is_installed(&self, workspace_id: &str) -> bool {
        self.registry.is_installed(workspace_id)
    }

    /// Install a workspace from a static bot token.
    ///
    /// The workspace id is resolved by asking the provider who the token
    /// belongs to. Returns the workspace id on success.
    pub async fn install_from_token(&self, token: Secret<String>) -> Result<String> {
        let identity = self.api.identity_check(token.expose_secret()).await?;
        self.finish_installation(&identity.workspace_id, token).await?;
        Ok(identity.workspace_id)
    }

    /// Complete an OAuth installation from a redirect authorization code.
    ///
    /// A malformed exchange response leaves the registry untouched.
    pub async fn complete_oauth(&self, code: &str) -> Result<String> {
        let oauth = self
            .oauth
            .as_ref()
            .ok_or_else(|| Error::config("oauth installation requested but no oauth app configured"))?;
        let access = self
            .api
            .exchange_oauth_code(
                &oauth.client_id,
                oauth.client_secret.expose_secret(),
                code,
            )
            .await?;
        let workspace_id = access
            .workspace_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::malformed_oauth("missing team identifier in oauth response"))?;
        let bot_token = access
            .bot_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| Error::malformed_oauth("missing bot access token in oauth response"))?;
        self.finish_installation(&workspace_id, Secret::new(bot_token))
            .await?;
        Ok(workspace_id)
    }

    /// Common tail of both installation paths: register the credential,
    /// warm the channel directory, then notify listeners.
    async fn finish_installation(&self, workspace_id: &str, token: Secret<String>) -> Result<()> {
        self.registry.register_token(workspace_id, token.clone());
        self.reload_channels(workspace_id).await?;
        for listener in &self.listeners {
            listener
                .on_new_installation(workspace_id, token.expose_secret())
                .await;
        }
        info!(workspace_id, "slack app installed");
        Ok(())
    }

    /// Rebuild the workspace's channel directory from the provider and swap
    /// it in atomically.
    ///
    /// Provider failures are not fatal: whatever was loaded before the
    /// failure becomes the new directory, so one bad conversation cannot
    /// wedge resolution for the whole workspace.
    pub async fn reload_channels(&self, workspace_id: &str) -> Result<()> {
        let token = self
            .registry
            .token(workspace_id)
            .ok_or_else(|| Error::not_installed(workspace_id))?;
        let token = token.expose_secret();

        let mut directory = ChannelDirectory::default();
        match self.api.list_conversations(token, &DIRECTORY_KINDS).await {
            Ok(conversations) => {
                for conversation in conversations {
                    directory.insert_id(&conversation.id);
                    if let Some(name) = &conversation.name {
                        directory.insert_group(&conversation.id, name);
                        continue;
                    }
                    let Some(counterpart) = &conversation.counterpart_user else {
                        debug!(
                            workspace_id,
                            conversation_id = %conversation.id,
                            "conversation has neither name nor counterpart, id-mapped only"
                        );
                        continue;
                    };
                    match self.api.get_user(token, counterpart).await {
                        Ok(user) => {
                            directory.insert_direct(
                                &conversation.id,
                                &user.name,
                                user.real_name.as_deref(),
                                user.display_name.as_deref(),
                            );
                        },
                        Err(error) => {
                            warn!(
                                workspace_id,
                                error = %error,
                                "channel reload interrupted, installing partial directory"
                            );
                            break;
                        },
                    }
                }
            },
            Err(error) => {
                warn!(
                    workspace_id,
                    error = %error,
                    "listing conversations failed, installing empty directory"
                );
            },
        }

        let size = directory.len();
        if self.registry.replace_directory(workspace_id, directory) {
            info!(workspace_id, size, "channel directory reloaded");
        } else {
            warn!(workspace_id, "workspace uninstalled during reload, directory discarded");
        }
        Ok(())
    }

    /// Resolve a channel id, channel name, or user name variant to a
    /// conversation id.
    ///
    /// A miss triggers exactly one reload before the lookup is retried.
    pub async fn channel_id(&self, workspace_id: &str, key: &str) -> Result<String> {
        let directory = self
            .registry
            .directory(workspace_id)
            .ok_or_else(|| Error::not_installed(workspace_id))?;
        if let Some(id) = directory.resolve(key) {
            return Ok(id.to_string());
        }
        self.reload_channels(workspace_id).await?;
        let directory = self
            .registry
            .directory(workspace_id)
            .ok_or_else(|| Error::not_installed(workspace_id))?;
        directory
            .resolve(key)
            .map(str::to_string)
            .ok_or_else(|| Error::channel_not_found(key))
    }

    /// Whether the conversation is a named group conversation.
    ///
    /// A known direct conversation answers `false` without any provider
    /// call. An id known to neither set triggers one reload; if it is still
    /// unknown afterwards the answer is `false`.
    pub async fn is_group_channel(&self, workspace_id: &str, channel_id: &str) -> Result<bool> {
        let directory = self
            .registry
            .directory(workspace_id)
            .ok_or_else(|| Error::not_installed(workspace_id))?;
        if directory.is_direct(channel_id) {
            return Ok(false);
        }
        if directory.is_group(channel_id) {
            return Ok(true);
        }
        self.reload_channels(workspace_id).await?;
        let directory = self
            .registry
            .directory(workspace_id)
            .ok_or_else(|| Error::not_installed(workspace_id))?;
        Ok(directory.is_group(channel_id))
    }

    /// Find a workspace member by id, login name, or real name.
    ///
    /// Deliberately uncached: user lookups are rare compared to channel
    /// resolution and member lists churn independently of conversations.
    pub async fn user_id(&self, workspace_id: &str, user: &str) -> Result<String> {
        let token = self
            .registry
            .token(workspace_id)
            .ok_or_else(|| Error::not_installed(workspace_id))?;
        let members = self.api.list_users(token.expose_secret()).await?;
        members
            .into_iter()
            .find(|member| {
                member.id == user
                    || member.name == user
                    || member.real_name.as_deref() == Some(user)
            })
            .map(|member| member.id)
            .ok_or_else(|| Error::user_not_found(workspace_id, user))
    }

    /// Get or create the session bound to a conversation.
    ///
    /// The session key is `{workspace_id}@{channel_id}`, so the same channel
    /// id in two workspaces never shares state.
    pub async fn create_session(&self, workspace_id: &str, channel: &str) -> Result<SessionContext> {
        let channel_id = self.channel_id(workspace_id, channel).await?;
        let key = format!("{workspace_id}{SESSION_KEY_SEPARATOR}{channel_id}");
        Ok(self.sessions.get_or_create(&key).await?)
    }

    /// Post a message to a channel given by id, name, or user name variant.
    pub async fn post_message(&self, workspace_id: &str, channel: &str, text: &str) -> Result<String> {
        let token = self
            .registry
            .token(workspace_id)
            .ok_or_else(|| Error::not_installed(workspace_id))?;
        let channel_id = self.channel_id(workspace_id, channel).await?;
        let posted = self
            .api
            .post_message(token.expose_secret(), &channel_id, text)
            .await?;
        debug!(workspace_id, %channel_id, ts = %posted.ts, "posted message");
        Ok(posted.ts)
    }
}
