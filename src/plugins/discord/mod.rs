//! Discord front-end: slash commands over the key lifecycle workflows.

pub mod commands;

use std::{sync::Arc, time::Duration};

use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::{plugins::Plugin, state::AppState};

pub struct Data {
  pub app: Arc<AppState>,
}

pub type CommandError = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, CommandError>;

const SYNC_ATTEMPTS: u32 = 5;
const SYNC_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct DiscordBot;

#[async_trait::async_trait]
impl Plugin for DiscordBot {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let token = app.config.bot_token.clone();
    // Slash commands only; no privileged intents needed.
    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
      .options(poise::FrameworkOptions {
        commands: commands::all(),
        on_error: |err| Box::pin(on_error(err)),
        ..Default::default()
      })
      .setup(move |ctx, ready, framework| {
        Box::pin(async move {
          info!("Logged in as {} (ID: {})", ready.user.name, ready.user.id);
          sync_commands(ctx, framework).await?;
          Ok(Data { app })
        })
      })
      .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
      .framework(framework)
      .await?;

    client.start().await?;
    Ok(())
  }
}

/// Registers the slash commands globally, retrying a bounded number of
/// times; registration right after connect is flaky on Discord's side.
async fn sync_commands(
  ctx: &serenity::Context,
  framework: &poise::Framework<Data, CommandError>,
) -> Result<(), serenity::Error> {
  let commands = &framework.options().commands;

  let mut attempt = 1;
  loop {
    info!("Syncing application commands (attempt {attempt}/{SYNC_ATTEMPTS})");
    match poise::builtins::register_globally(ctx, commands).await {
      Ok(()) => {
        info!("Successfully synced {} command(s)", commands.len());
        return Ok(());
      }
      Err(err) if attempt < SYNC_ATTEMPTS => {
        warn!("Sync attempt {attempt} failed: {err}");
        attempt += 1;
        tokio::time::sleep(SYNC_RETRY_DELAY).await;
      }
      Err(err) => return Err(err),
    }
  }
}

async fn on_error(error: poise::FrameworkError<'_, Data, CommandError>) {
  match error {
    poise::FrameworkError::Command { error, ctx, .. } => {
      error!("Command `{}` failed: {error}", ctx.command().name);
    }
    other => {
      if let Err(err) = poise::builtins::on_error(other).await {
        error!("Error while handling error: {err}");
      }
    }
  }
}
