//! AuthGuard key-management Discord bot.
//!
//! Architecture:
//! - Poise/Serenity for the Discord slash-command surface
//! - Reqwest for the key-manager HTTP API client
//! - Tokio for async runtime

mod api;
mod config;
mod duration;
mod error;
mod expiry;
mod lifecycle;
mod plugins;
mod prelude;
mod state;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{
  config::Config,
  plugins::{App, discord::DiscordBot},
  prelude::*,
  state::AppState,
};

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  // Initialize tracing
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "authguard_bot=debug,serenity=warn,poise=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  // Load configuration from environment; missing values are fatal before
  // any command can run.
  let config = match Config::from_env() {
    Ok(config) => config,
    Err(err) => {
      error!("Configuration error: {err:#}");
      std::process::exit(1);
    }
  };

  info!("Starting AuthGuard bot v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(config));

  App::new().register(DiscordBot).run(app).await;

  tokio::signal::ctrl_c().await.expect("Failed to listen for ctrl-c");
  info!("Shutting down");
}
