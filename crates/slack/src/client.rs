use std::time::Duration;

use {
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::json,
    tracing::debug,
};

use crate::{
    api::{
        Conversation, ConversationKind, Identity, OAuthAccess, PostedMessage, SlackApi, UserInfo,
    },
    config::SlackConfig,
    error::{Error, Result},
};

#[derive(Debug, Deserialize)]
struct AuthTestWire {
    ok: bool,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthAccessWire {
    ok: bool,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    bot: Option<OAuthBotWire>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthBotWire {
    #[serde(default)]
    bot_access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationsListWire {
    ok: bool,
    #[serde(default)]
    channels: Vec<Conversation>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoWire {
    ok: bool,
    #[serde(default)]
    user: Option<UserWire>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserWire {
    id: String,
    name: String,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    profile: Option<ProfileWire>,
}

#[derive(Debug, Deserialize)]
struct ProfileWire {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersListWire {
    ok: bool,
    #[serde(default)]
    members: Vec<UserWire>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageWire {
    ok: bool,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<UserWire> for UserInfo {
    fn from(wire: UserWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            real_name: wire.real_name,
            display_name: wire.profile.and_then(|profile| profile.display_name),
        }
    }
}

/// Production [`SlackApi`] implementation over the Slack Web API.
#[derive(Clone)]
pub struct SlackWebClient {
    http: reqwest::Client,
    api_base: String,
}

impl SlackWebClient {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|source| Error::provider_call("building slack http client", source))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    /// Send a request and decode the Slack envelope.
    ///
    /// Every decoded response is logged before it is interpreted.
    async fn call<T>(&self, method: &'static str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned + std::fmt::Debug,
    {
        let response = request
            .send()
            .await
            .map_err(|source| Error::provider_call(format!("slack {method} request"), source))?;
        let response = response
            .error_for_status()
            .map_err(|source| Error::provider_call(format!("slack {method} status"), source))?;
        let decoded = response
            .json::<T>()
            .await
            .map_err(|source| Error::provider_call(format!("decoding slack {method}"), source))?;
        debug!(method, response = ?decoded, "slack api response");
        Ok(decoded)
    }
}

fn check_ok(method: &str, ok: bool, error: Option<String>) -> Result<()> {
    if ok {
        return Ok(());
    }
    Err(Error::provider_rejected(format!(
        "slack {method} rejected: {}",
        error.unwrap_or_else(|| "unknown error".to_string())
    )))
}

#[async_trait::async_trait]
impl SlackApi for SlackWebClient {
    async fn identity_check(&self, token: &str) -> Result<Identity> {
        let wire: AuthTestWire = self
            .call(
                "auth.test",
                self.http.post(self.endpoint("auth.test")).bearer_auth(token),
            )
            .await?;
        check_ok("auth.test", wire.ok, wire.error)?;
        let workspace_id = wire
            .team_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::provider_rejected("slack auth.test returned no team_id"))?;
        Ok(Identity { workspace_id })
    }

    async fn exchange_oauth_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<OAuthAccess> {
        let wire: OAuthAccessWire = self
            .call(
                "oauth.access",
                self.http.post(self.endpoint("oauth.access")).form(&[
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("code", code),
                ]),
            )
            .await?;
        check_ok("oauth.access", wire.ok, wire.error)?;
        Ok(OAuthAccess {
            workspace_id: wire.team_id,
            bot_token: wire.bot.and_then(|bot| bot.bot_access_token),
        })
    }

    async fn list_conversations(
        &self,
        token: &str,
        kinds: &[ConversationKind],
    ) -> Result<Vec<Conversation>> {
        let types = kinds
            .iter()
            .map(|kind| kind.as_param())
            .collect::<Vec<_>>()
            .join(",");
        let wire: ConversationsListWire = self
            .call(
                "conversations.list",
                self.http
                    .get(self.endpoint("conversations.list"))
                    .bearer_auth(token)
                    .query(&[("types", types.as_str())]),
            )
            .await?;
        check_ok("conversations.list", wire.ok, wire.error)?;
        Ok(wire.channels)
    }

    async fn get_user(&self, token: &str, user_id: &str) -> Result<UserInfo> {
        let wire: UserInfoWire = self
            .call(
                "users.info",
                self.http
                    .get(self.endpoint("users.info"))
                    .bearer_auth(token)
                    .query(&[("user", user_id)]),
            )
            .await?;
        check_ok("users.info", wire.ok, wire.error)?;
        wire.user
            .map(UserInfo::from)
            .ok_or_else(|| Error::provider_rejected("slack users.info returned no user"))
    }

    async fn list_users(&self, token: &str) -> Result<Vec<UserInfo>> {
        let wire: UsersListWire = self
            .call(
                "users.list",
                self.http.get(self.endpoint("users.list")).bearer_auth(token),
            )
            .await?;
        check_ok("users.list", wire.ok, wire.error)?;
        Ok(wire.members.into_iter().map(UserInfo::from).collect())
    }

    async fn post_message(&self, token: &str, channel: &str, text: &str) -> Result<PostedMessage> {
        let wire: PostMessageWire = self
            .call(
                "chat.postMessage",
                self.http
                    .post(self.endpoint("chat.postMessage"))
                    .bearer_auth(token)
                    .json(&json!({ "channel": channel, "text": text })),
            )
            .await?;
        check_ok("chat.postMessage", wire.ok, wire.error)?;
        Ok(PostedMessage {
            channel: wire.channel.unwrap_or_else(|| channel.to_string()),
            ts: wire
                .ts
                .ok_or_else(|| Error::provider_rejected("slack chat.postMessage returned no ts"))?,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    use {
        axum::{
            Router,
            extract::Query,
            routing::{get, post},
        },
        std::collections::HashMap,
    };

    /// Start a mock HTTP server and return its base URL.
    async fn start_mock(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base: String) -> SlackWebClient {
        let config = SlackConfig {
            api_base: base,
            ..SlackConfig::default()
        };
        SlackWebClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn identity_check_decodes_team_id() {
        let app = Router::new().route(
            "/auth.test",
            post(|| async {
                axum::Json(serde_json::json!({ "ok": true, "team_id": "T1", "user_id": "UBOT" }))
            }),
        );
        let client = client_for(start_mock(app).await);
        let identity = client.identity_check("xoxb-test").await.unwrap();
        assert_eq!(identity.workspace_id, "T1");
    }

    #[tokio::test]
    async fn envelope_rejection_surfaces_slack_error() {
        let app = Router::new().route(
            "/auth.test",
            post(|| async {
                axum::Json(serde_json::json!({ "ok": false, "error": "invalid_auth" }))
            }),
        );
        let client = client_for(start_mock(app).await);
        let err = client.identity_check("xoxb-bad").await.unwrap_err();
        assert!(matches!(err, Error::ProviderCall { .. }));
        assert!(err.to_string().contains("invalid_auth"));
    }

    #[tokio::test]
    async fn http_error_status_is_a_provider_failure() {
        let app = Router::new().route(
            "/users.list",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = client_for(start_mock(app).await);
        let err = client.list_users("xoxb-test").await.unwrap_err();
        assert!(matches!(err, Error::ProviderCall { source: Some(_), .. }));
    }

    #[tokio::test]
    async fn list_conversations_sends_requested_kinds_only() {
        let app = Router::new().route(
            "/conversations.list",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(
                    params.get("types").map(String::as_str),
                    Some("public_channel,im,mpim")
                );
                axum::Json(serde_json::json!({
                    "ok": true,
                    "channels": [
                        { "id": "C1", "name": "general" },
                        { "id": "D1", "user": "U1" },
                    ],
                }))
            }),
        );
        let client = client_for(start_mock(app).await);
        let conversations = client
            .list_conversations("xoxb-test", &crate::api::DIRECTORY_KINDS)
            .await
            .unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].name.as_deref(), Some("general"));
        assert_eq!(conversations[1].counterpart_user.as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn get_user_flattens_profile_display_name() {
        let app = Router::new().route(
            "/users.info",
            get(|| async {
                axum::Json(serde_json::json!({
                    "ok": true,
                    "user": {
                        "id": "U1",
                        "name": "bob",
                        "real_name": "Bob Smith",
                        "profile": { "display_name": "bsmith" },
                    },
                }))
            }),
        );
        let client = client_for(start_mock(app).await);
        let user = client.get_user("xoxb-test", "U1").await.unwrap();
        assert_eq!(user.name, "bob");
        assert_eq!(user.real_name.as_deref(), Some("Bob Smith"));
        assert_eq!(user.display_name.as_deref(), Some("bsmith"));
    }

    #[tokio::test]
    async fn exchange_passes_optional_fields_through() {
        let app = Router::new().route(
            "/oauth.access",
            post(|| async {
                // Response missing the bot credential; the installation
                // handler decides what to do with it.
                axum::Json(serde_json::json!({ "ok": true, "team_id": "T9" }))
            }),
        );
        let client = client_for(start_mock(app).await);
        let access = client
            .exchange_oauth_code("id", "secret", "code-1")
            .await
            .unwrap();
        assert_eq!(access.workspace_id.as_deref(), Some("T9"));
        assert!(access.bot_token.is_none());
    }

    #[tokio::test]
    async fn post_message_returns_ts() {
        let app = Router::new().route(
            "/chat.postMessage",
            post(|| async {
                axum::Json(serde_json::json!({ "ok": true, "channel": "C1", "ts": "171.001" }))
            }),
        );
        let client = client_for(start_mock(app).await);
        let posted = client.post_message("xoxb-test", "C1", "hi").await.unwrap();
        assert_eq!(posted.ts, "171.001");
        assert_eq!(posted.channel, "C1");
    }
}
