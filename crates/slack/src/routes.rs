use std::sync::Arc;

use {
    axum::{
        Json, Router,
        extract::{Query, State},
        routing::get,
    },
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::warn,
};

use crate::platform::SlackPlatform;

#[derive(Debug, Deserialize)]
struct RedirectParams {
    #[serde(default)]
    code: Option<String>,
}

/// Router exposing the OAuth installation endpoint.
///
/// Slack redirects the installing user's browser here with a temporary
/// authorization code. Outcomes are reported in the response body; the
/// status is always 200 so the provider never retries the redirect.
pub fn oauth_router(platform: Arc<SlackPlatform>) -> Router {
    Router::new()
        .route("/slack/oauth/redirect", get(handle_redirect))
        .with_state(platform)
}

async fn handle_redirect(
    State(platform): State<Arc<SlackPlatform>>,
    Query(params): Query<RedirectParams>,
) -> Json<Value> {
    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        warn!("oauth redirect received without a code parameter");
        return Json(json!({ "Error": "missing code parameter" }));
    };
    match platform.complete_oauth(&code).await {
        Ok(_) => Json(json!({ "Message": "Installed!" })),
        Err(error) => {
            warn!(error = %error, "oauth installation failed");
            Json(json!({ "Error": error.to_string() }))
        },
    }
}
