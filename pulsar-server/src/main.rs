use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use pulsar_common::traits::ModerationApi;
use pulsar_core::config::{Settings, TOKEN_ENV_VAR};
use pulsar_core::platforms::discord::{run_gateway, DiscordModerationClient};
use pulsar_core::services::AntiSpamService;

#[derive(Parser, Debug, Clone)]
#[command(name = "pulsar")]
#[command(author, version, about = "Pulsar - Discord anti-spam and deletion logging bot")]
struct Args {
    /// Path to the TOML settings file
    #[arg(long, default_value = "pulsar.toml")]
    config: PathBuf,

    /// Log filter directive used when RUST_LOG is unset, e.g. "pulsar=debug"
    #[arg(long, default_value = "pulsar=info")]
    log_level: String,
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("Pulsar starting. config={}", args.config.display());

    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let token = settings.resolve_token(std::env::var(TOKEN_ENV_VAR).ok())?;

    if !settings.antispam.enabled {
        warn!("Anti-spam is disabled; only deletions will be logged");
    }
    info!(
        rules = settings.antispam.rules.len(),
        cache_size = settings.antispam.message_cache_size,
        log_channel_id = %settings.log_channel_id,
        "Settings loaded"
    );

    let api: Arc<dyn ModerationApi> = Arc::new(DiscordModerationClient::new(
        token.clone(),
        settings.request_timeout_std(),
    ));
    let service = Arc::new(AntiSpamService::new(
        settings.antispam.clone(),
        api,
        settings.log_channel_id.clone(),
    )?);

    tokio::select! {
        res = run_gateway(token, service) => {
            if let Err(e) = res {
                error!("Gateway error: {e}");
                return Err(e.into());
            }
            info!("Gateway closed; exiting.");
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for Ctrl-C: {e:?}");
            }
            info!("Ctrl-C detected; shutting down.");
        }
    }

    Ok(())
}
