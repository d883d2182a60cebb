use std::sync::Arc;

use {
    anyhow::Context,
    clap::Parser,
    secrecy::Secret,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    huddle_channels::MemorySessionStore,
    huddle_slack::{
        ConnectionMode, OAuthApp, SlackConfig, SlackPlatform, SlackWebClient, oauth_router,
    },
};

#[derive(Parser)]
#[command(name = "huddle", about = "Huddle — multi-workspace Slack connector")]
struct Cli {
    /// Static bot token (single-workspace mode, disables OAuth).
    #[arg(long, env = "SLACK_TOKEN")]
    token: Option<String>,

    /// OAuth application client id (multi-workspace mode).
    #[arg(long, env = "SLACK_CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth application client secret.
    #[arg(long, env = "SLACK_CLIENT_SECRET")]
    client_secret: Option<String>,

    /// Address to bind the OAuth redirect endpoint to.
    #[arg(long, default_value = "0.0.0.0:7000")]
    bind: String,

    /// Slack Web API base URL.
    #[arg(long, env = "SLACK_API_BASE")]
    api_base: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn config_from(cli: &Cli) -> SlackConfig {
    let mut config = SlackConfig {
        token: cli.token.clone().map(Secret::new),
        client_id: cli.client_id.clone(),
        client_secret: cli.client_secret.clone().map(Secret::new),
        ..SlackConfig::default()
    };
    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.clone();
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = config_from(&cli);
    let mode = config.connection_mode().context("invalid configuration")?;
    let api = Arc::new(SlackWebClient::new(&config).context("building slack client")?);
    let sessions = Arc::new(MemorySessionStore::default());

    match mode {
        ConnectionMode::Token(token) => {
            let platform = SlackPlatform::new(api, sessions);
            let workspace_id = platform
                .install_from_token(token)
                .await
                .context("installing from token")?;
            info!(%workspace_id, "connector ready in single-workspace mode");
            tokio::signal::ctrl_c().await.context("waiting for shutdown")?;
        },
        ConnectionMode::OAuth {
            client_id,
            client_secret,
        } => {
            let platform = Arc::new(SlackPlatform::new(api, sessions).with_oauth_app(OAuthApp {
                client_id,
                client_secret,
            }));
            let listener = tokio::net::TcpListener::bind(&cli.bind)
                .await
                .with_context(|| format!("binding {}", cli.bind))?;
            info!(bind = %cli.bind, "serving oauth redirect endpoint");
            axum::serve(listener, oauth_router(platform))
                .await
                .context("serving oauth endpoint")?;
        },
    }
    Ok(())
}
