use anyhow::Context;
use clap::Parser;
use orgwatch::audit::AuditRecorder;
use orgwatch::bootstrap::Bootstrapper;
use orgwatch::config::Config;
use orgwatch::dispatcher::Dispatcher;
use orgwatch::github::GitHubClient;
use orgwatch::http_server::{self, AppState};
use orgwatch::notifier::{Notifier, SlackWebhookTransport};
use orgwatch::store::JsonFileAuditStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "GitHub organization webhook monitor")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, env = "ORGWATCH_CONFIG", default_value = "config/config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orgwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Arc::new(Config::load(&args.config)?);

    let slack_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build Slack HTTP client")?;
    let notifier = Notifier::new(
        Arc::new(SlackWebhookTransport::new(slack_client)),
        config.webhook_slack_url.clone(),
        config.footer_slack.clone(),
    );

    let store = JsonFileAuditStore::open(&config.audit_log_path)
        .await
        .context("failed to open audit log")?;
    let recorder = Arc::new(AuditRecorder::new(Arc::new(store)));

    let github = GitHubClient::new(&config.github_api_url, &config.git_token)
        .context("failed to build GitHub client")?;
    let bootstrapper = Bootstrapper::new(
        Arc::new(github),
        config.default_branch.clone(),
        config.readme_content.clone(),
    )
    .with_force_readme(config.force_readme);

    let dispatcher = Arc::new(Dispatcher::new(
        config.clone(),
        notifier,
        recorder,
        bootstrapper,
    ));

    http_server::serve(AppState::new(dispatcher), &config.listen_addr())
        .await
        .context("http server failed")
}
