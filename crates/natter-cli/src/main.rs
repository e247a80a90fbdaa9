use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use natter_app::{AppShell, ChatService, LaunchParams};
use natter_backend::{AuthApiClient, GraphqlChatStore};
use natter_core::{AppConfig, ChatStore, IdentityProvider, Responder};
use natter_responder::WebhookResponder;

mod repl;

#[derive(Parser)]
#[command(name = "natter")]
#[command(about = "natter - terminal client for a hosted AI chat service", long_about = None)]
struct Cli {
    /// Email-verification link pasted from your inbox
    link: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the conversation on stdout stays readable.
    let filter =
        EnvFilter::try_from_env("NATTER_LOG").unwrap_or_else(|_| EnvFilter::new("natter=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // ===== Backend wiring =====
    let identity: Arc<dyn IdentityProvider> = Arc::new(AuthApiClient::new(&config.auth_url));
    let store: Arc<dyn ChatStore> =
        Arc::new(GraphqlChatStore::new(&config.graphql_url, Arc::clone(&identity)));
    let responder: Arc<dyn Responder> = Arc::new(WebhookResponder::new(&config.webhook_url));

    let shell = AppShell::new(identity);
    let chats = ChatService::new(store, responder);

    let launch = cli
        .link
        .as_deref()
        .map(LaunchParams::from_link)
        .unwrap_or_default();

    repl::Repl::new(shell, chats)
        .context("Failed to initialize the terminal")?
        .run(launch)
        .await
}
