use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use herald_gateway::ai::{AiFallback, ProviderRegistry};
use herald_gateway::api::{ApiServer, ApiState};
use herald_gateway::broadcast::BroadcastExecutor;
use herald_gateway::channels::{TelegramChannel, Transport};
use herald_gateway::db::{self, Repositories};
use herald_gateway::{Config, Dispatcher};

/// Herald - Telegram bot gateway with automations, AI replies and broadcasts
#[derive(Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Port to listen on (overrides HERALD_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the webhook, scheduler and admin API (default)
    Serve,
    /// Run every due broadcast once and print the summary
    RunBroadcasts,
    /// Register the webhook URL with Telegram
    SetWebhook {
        /// Public URL of `/api/webhooks/telegram`
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,herald_gateway=info",
        1 => "info,herald_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::RunBroadcasts => run_broadcasts(&config).await,
        Command::SetWebhook { url } => set_webhook(&config, &url).await,
    }
}

fn telegram(config: &Config) -> anyhow::Result<TelegramChannel> {
    let token = config.require_bot_token()?;
    Ok(TelegramChannel::new(
        token.expose_secret().to_owned(),
        config.telegram.request_timeout,
    ))
}

fn open_repos(config: &Config) -> anyhow::Result<Repositories> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let pool = db::init(&config.db_path)?;
    Ok(Repositories::new(&pool))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(telegram(&config)?);
    let repos = open_repos(&config)?;

    let registry = ProviderRegistry::from_config(&config.ai);
    let ai = if registry.is_empty() {
        tracing::info!("no AI provider configured, AI replies disabled");
        None
    } else {
        Some(AiFallback::new(registry))
    };

    let dispatcher = Arc::new(Dispatcher::new(
        repos.clone(),
        transport.clone(),
        ai,
        config.dispatch,
    ));
    let executor = Arc::new(BroadcastExecutor::new(&repos, transport, config.throttle));

    tracing::info!(
        port = config.api_server.port,
        db = %config.db_path.display(),
        "starting herald gateway"
    );

    let port = config.api_server.port;
    let state = ApiState {
        repos,
        dispatcher,
        executor,
        webhook_secret: config.telegram.webhook_secret,
        api_key: config.api_server.api_key,
        cron_secret: config.api_server.cron_secret,
    };

    ApiServer::new(state, port).run().await?;
    Ok(())
}

async fn run_broadcasts(config: &Config) -> anyhow::Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(telegram(config)?);
    let repos = open_repos(config)?;
    let executor = BroadcastExecutor::new(&repos, transport, config.throttle);

    let summary = executor.run().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn set_webhook(config: &Config, url: &str) -> anyhow::Result<()> {
    let channel = telegram(config)?;
    let Some(secret) = config.telegram.webhook_secret.as_ref() else {
        anyhow::bail!("TELEGRAM_WEBHOOK_SECRET must be set; the webhook rejects updates without it");
    };

    channel.set_webhook(url, Some(secret.expose_secret())).await?;
    println!("Webhook set to {url}");
    Ok(())
}
