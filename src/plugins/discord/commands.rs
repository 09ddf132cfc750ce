//! Slash command surface. Every command defers, runs one lifecycle
//! workflow, and renders the outcome as an ephemeral embed; remote
//! failures always become a user-facing failure embed, never a crash.

use chrono::Utc;
use poise::serenity_prelude as serenity;

use super::{CommandError, Context, Data};
use crate::{
  api::model::{KeyRecord, RawInstant},
  duration::{self, parse_duration},
  error::Error,
  expiry::{self, KeyStatus},
  lifecycle::DEFAULT_BAN_SECS,
};

const SUCCESS_COLOUR: u32 = 0x00ff00;
const FAILURE_COLOUR: u32 = 0xff0000;

const NO_REASON: &str = "No reason provided";

pub fn all() -> Vec<poise::Command<Data, CommandError>> {
  vec![
    help(),
    createkey(),
    createpremiumkey(),
    attachdiscordid(),
    resethwid(),
    blacklistkey(),
    whitelistkey(),
    getdefaultkeyid(),
    getkeyinfo(),
    iskeyexpired(),
    getkeysjson(),
    downloaddefaultkeys(),
    addnotetopremiumkey(),
  ]
}

fn base_embed(
  ctx: Context<'_>,
  title: &str,
  colour: u32,
) -> serenity::CreateEmbed {
  serenity::CreateEmbed::new()
    .title(title)
    .colour(colour)
    .timestamp(serenity::Timestamp::now())
    .footer(serenity::CreateEmbedFooter::new(
      ctx.data().app.config.promo_link.clone(),
    ))
}

fn success(ctx: Context<'_>, title: &str) -> serenity::CreateEmbed {
  base_embed(ctx, title, SUCCESS_COLOUR)
}

fn failure(
  ctx: Context<'_>,
  title: &str,
  description: impl Into<String>,
) -> serenity::CreateEmbed {
  base_embed(ctx, title, FAILURE_COLOUR).description(description.into())
}

async fn reply(
  ctx: Context<'_>,
  embed: serenity::CreateEmbed,
) -> Result<(), CommandError> {
  ctx
    .send(poise::CreateReply::default().embed(embed).ephemeral(true))
    .await?;
  Ok(())
}

fn code(value: impl std::fmt::Display) -> String {
  format!("`{value}`")
}

fn or_na(value: &str) -> &str {
  if value.is_empty() { "N/A" } else { value }
}

fn opt_text(value: Option<&str>) -> &str {
  match value {
    Some(text) if !text.is_empty() => text,
    _ => "None",
  }
}

fn json_text(value: Option<&json::Value>) -> String {
  match value {
    Some(json::Value::String(text)) => text.clone(),
    Some(other) if !other.is_null() => other.to_string(),
    _ => "None".into(),
  }
}

/// Discord-rendered `<t:...:F>` timestamp for a raw instant, when the
/// instant resolves.
fn discord_timestamp(raw: Option<&RawInstant>) -> Option<String> {
  expiry::unix_seconds(raw).map(|ts| format!("<t:{ts}:F>"))
}

fn status_label(status: KeyStatus) -> &'static str {
  match status {
    KeyStatus::Permanent => "Permanent ✅",
    KeyStatus::Expired => "Expired 🔴",
    KeyStatus::Valid => "Valid 🟢",
  }
}

fn created_key_embed(
  ctx: Context<'_>,
  title: &str,
  key: &KeyRecord,
  expires_fallback: &str,
) -> serenity::CreateEmbed {
  let created = discord_timestamp(key.created_at.as_ref())
    .unwrap_or_else(|| format!("<t:{}:F>", Utc::now().timestamp()));
  let expires = discord_timestamp(key.expired_at.as_ref())
    .unwrap_or_else(|| expires_fallback.to_string());

  success(ctx, title)
    .field("Key ID", code(&key.id), false)
    .field("Key", code(&key.key), false)
    .field("Created At", created, true)
    .field("Expires At", expires, true)
    .field(
      "⚠️ Important",
      "Store this key securely; it cannot be retrieved again!",
      false,
    )
}

/// Shows information about available commands
#[poise::command(slash_command, ephemeral)]
async fn help(ctx: Context<'_>) -> Result<(), CommandError> {
  let embed = base_embed(ctx, "📚 AuthGuard Bot Commands", SUCCESS_COLOUR)
    .description(
      "Below is a list of all available commands for managing AuthGuard \
       keys. These commands are restricted to server administrators.",
    )
    .field(
      "/createkey",
      "Creates a 24-hour default key.\n**Usage**: `/createkey`",
      false,
    )
    .field(
      "/createpremiumkey",
      "Creates a premium key with a custom expiration duration.\n\
       **Usage**: `/createpremiumkey <duration>`\n\
       **Example**: `/createpremiumkey 24d`",
      false,
    )
    .field(
      "/attachdiscordid",
      "Attaches a Discord User ID to a Premium Key ID.\n\
       **Usage**: `/attachdiscordid <key_id> <discord_id>`",
      false,
    )
    .field(
      "/resethwid",
      "Resets the HWID for a specific key to empty.\n\
       **Usage**: `/resethwid <key_id>`",
      false,
    )
    .field(
      "/blacklistkey",
      "Blacklists a key for a specified duration (default 7d) with an \
       optional reason.\n\
       **Usage**: `/blacklistkey <key_id> [duration] [reason]`",
      false,
    )
    .field(
      "/whitelistkey",
      "Whitelists (unbans) a key with an optional reason.\n\
       **Usage**: `/whitelistkey <key_id> [reason]`",
      false,
    )
    .field(
      "/getkeysjson",
      "Generates and uploads a JSON file with details for specified keys.\n\
       **Usage**: `/getkeysjson <key_ids>`",
      false,
    )
    .field(
      "/getdefaultkeyid",
      "Retrieves the Key ID for a given key name.\n\
       **Usage**: `/getdefaultkeyid <key_name>`",
      false,
    )
    .field(
      "/getkeyinfo",
      "Retrieves detailed information for a given key name.\n\
       **Usage**: `/getkeyinfo <key_name>`",
      false,
    )
    .field(
      "/iskeyexpired",
      "Checks if a key is expired by its Key ID.\n\
       **Usage**: `/iskeyexpired <key_id>`",
      false,
    )
    .field(
      "/downloaddefaultkeys",
      "Downloads all default keys to a text file.\n\
       **Usage**: `/downloaddefaultkeys`",
      false,
    )
    .field(
      "/addnotetopremiumkey",
      "Adds a note to a premium key.\n\
       **Usage**: `/addnotetopremiumkey <key_id> <note>`",
      false,
    )
    .field(
      "⚠️ Note",
      "All commands require Administrator permissions. Duration formats: \
       `Xd` (days), `Xh` (hours), `Xm` (minutes). For /getkeysjson, \
       provide key IDs separated by spaces.",
      false,
    );

  reply(ctx, embed).await
}

/// Creates a 24-hour key for administrators only
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn createkey(ctx: Context<'_>) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  match ctx.data().app.api.create_default_key().await {
    Ok(key) => {
      let embed = created_key_embed(
        ctx,
        "🔑 24-Hour Key Created Successfully!",
        &key,
        "24 hours from creation",
      );
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Create Key",
          "Failed to create key. Please try again later.",
        ),
      )
      .await
    }
  }
}

/// Creates a premium key with custom expiration for administrators only
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn createpremiumkey(
  ctx: Context<'_>,
  #[description = "Expiration duration, e.g. 24d, 1h, 20m"] duration: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let Ok(duration_secs) = parse_duration(&duration) else {
    return reply(
      ctx,
      failure(
        ctx,
        "❌ Invalid Duration",
        "Invalid duration format. Please use format like `24d`, `1h`, or \
         `20m`.",
      ),
    )
    .await;
  };

  match ctx.data().app.api.create_premium_key(duration_secs).await {
    Ok(key) => {
      let fallback = format!("{} from creation", duration::humanize(duration_secs));
      let embed = created_key_embed(
        ctx,
        "🔑 Premium Key Created Successfully!",
        &key,
        &fallback,
      );
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Create Premium Key",
          "Failed to create premium key. Please try again later.",
        ),
      )
      .await
    }
  }
}

/// Attaches a Discord User ID to a Premium Key ID
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn attachdiscordid(
  ctx: Context<'_>,
  #[description = "Premium key id"] key_id: String,
  #[description = "Numeric Discord user id"] discord_id: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_id = key_id.trim();
  let discord_id = discord_id.trim();
  let lifecycle = ctx.data().app.lifecycle();

  match lifecycle.attach_discord_id(key_id, discord_id).await {
    Ok(()) => {
      let embed = success(ctx, "🔗 Discord ID Attached Successfully!")
        .description("The Discord ID has been linked to the Premium Key.")
        .field("Key ID", code(key_id), false)
        .field("Discord ID", code(discord_id), true)
        .field("Status", "✅ Attachment complete", true);
      reply(ctx, embed).await
    }
    Err(Error::InvalidDiscordId) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Invalid Discord ID",
          "The Discord ID must be a numeric value.",
        ),
      )
      .await
    }
    Err(Error::NotFound) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Invalid Key ID",
          format!(
            "Could not verify key ID `{key_id}`. Ensure it is a valid \
             Premium Key."
          ),
        ),
      )
      .await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Attach Discord ID",
          format!(
            "Could not attach Discord ID to key `{key_id}`. Ensure the Key \
             ID is correct and is a **Premium Key**."
          ),
        ),
      )
      .await
    }
  }
}

/// Resets HWID for a key to empty for administrators only
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn resethwid(
  ctx: Context<'_>,
  #[description = "Key id"] key_id: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_id = key_id.trim();
  match ctx.data().app.lifecycle().reset_hwid(key_id).await {
    Ok(()) => {
      let embed = success(ctx, "🔄 HWID Reset Successfully!")
        .description(format!(
          "The HWID for key ID `{key_id}` has been reset to empty."
        ))
        .field("Key ID", code(key_id), false)
        .field("Status", "✅ Reset complete", true);
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Reset HWID",
          format!(
            "Could not reset HWID for key ID `{key_id}`. Check the key ID \
             and try again."
          ),
        ),
      )
      .await
    }
  }
}

/// Blacklists a key for administrators only
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn blacklistkey(
  ctx: Context<'_>,
  #[description = "Key id"] key_id: String,
  #[description = "Ban duration, e.g. 7d, 1h, 20m (default 7d)"]
  duration: Option<String>,
  #[description = "Reason for the ban"] reason: Option<String>,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_id = key_id.trim();
  let duration = duration.unwrap_or_else(|| "7d".into());
  let reason = reason.unwrap_or_else(|| NO_REASON.into());
  // An unparsable duration silently falls back to the 7-day default.
  let duration_secs = parse_duration(&duration).unwrap_or(DEFAULT_BAN_SECS);

  let result =
    ctx.data().app.lifecycle().blacklist(key_id, duration_secs, &reason).await;
  match result {
    Ok(_) => {
      let embed = base_embed(ctx, "🚫 Key Blacklisted Successfully!", FAILURE_COLOUR)
        .description(format!("The key `{key_id}` has been blacklisted."))
        .field("Key ID", code(key_id), false)
        .field("Duration", code(&duration), true)
        .field("Reason", code(&reason), true)
        .field("Status", "✅ Blacklist complete", true);
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Blacklist Key",
          format!(
            "Could not blacklist key `{key_id}`. Check the key ID and try \
             again."
          ),
        ),
      )
      .await
    }
  }
}

/// Whitelists (unbans) a key for administrators only
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn whitelistkey(
  ctx: Context<'_>,
  #[description = "Key id"] key_id: String,
  #[description = "Reason for the unban"] reason: Option<String>,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_id = key_id.trim();
  let reason = reason.unwrap_or_else(|| NO_REASON.into());

  match ctx.data().app.lifecycle().whitelist(key_id, &reason).await {
    Ok(_) => {
      let embed = success(ctx, "✅ Key Whitelisted Successfully!")
        .description(format!("The key `{key_id}` has been whitelisted."))
        .field("Key ID", code(key_id), false)
        .field("Reason", code(&reason), true)
        .field("Status", "✅ Whitelist complete", true);
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Whitelist Key",
          format!(
            "Could not whitelist key `{key_id}`. Check the key ID and try \
             again."
          ),
        ),
      )
      .await
    }
  }
}

/// Retrieves the Key ID for a given key name
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn getdefaultkeyid(
  ctx: Context<'_>,
  #[description = "Key name"] key_name: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_name = key_name.trim();
  match ctx.data().app.api.key_by_name(key_name).await {
    Ok(key) => {
      let embed = success(ctx, "✅ Key ID Found!")
        .description("The Key ID for the provided key name.")
        .field("Key Name", code(key_name), false)
        .field("Key ID", code(&key.id), false)
        .field("Status", "✅ ID retrieved", true);
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Key ID Not Found",
          format!("Could not find Key ID for key name `{key_name}`."),
        ),
      )
      .await
    }
  }
}

/// Retrieves detailed information for a given key name
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn getkeyinfo(
  ctx: Context<'_>,
  #[description = "Key name"] key_name: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_name = key_name.trim();
  match ctx.data().app.api.key_by_name(key_name).await {
    Ok(key) => {
      let created = key
        .created_at
        .as_ref()
        .map_or_else(|| "N/A".to_string(), ToString::to_string);
      let blacklisted = if key.is_blacklisted { "Yes" } else { "No" };

      let embed = success(ctx, "✅ Key Information Found!")
        .description("Detailed information for the provided key.")
        .field("Key Name", code(or_na(&key.key)), false)
        .field("Key ID", code(&key.id), false)
        .field(
          "Service ID",
          code(key.service_id.map_or_else(|| "N/A".into(), |id| id.to_string())),
          true,
        )
        .field(
          "Expires At",
          code(expiry::format_expiry(key.expired_at.as_ref())),
          true,
        )
        .field("HWID", code(opt_text(key.hwid.as_deref())), true)
        .field("IP Address", code(opt_text(key.ip.as_deref())), true)
        .field("Session ID", code(opt_text(key.session_id.as_deref())), true)
        .field("Discord ID", code(json_text(key.discord_id.as_ref())), true)
        .field("Provider ID", code(json_text(key.provider_id.as_ref())), true)
        .field("Created At", code(created), true)
        .field("Blacklisted", code(blacklisted), true)
        .field("Status", "✅ Information retrieved", true);
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Key Information Not Found",
          format!("Could not find information for key name `{key_name}`."),
        ),
      )
      .await
    }
  }
}

/// Checks if a key is expired by its Key ID
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn iskeyexpired(
  ctx: Context<'_>,
  #[description = "Key id"] key_id: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_id = key_id.trim();
  match ctx.data().app.lifecycle().check_expiration(key_id).await {
    Ok(status) => {
      let embed = success(ctx, "✅ Key Status Checked!")
        .description(format!("The status of the key `{key_id}`."))
        .field("Key ID", code(key_id), false)
        .field("Status", code(status_label(status)), true);
      reply(ctx, embed).await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Key Not Found",
          format!("Could not find key `{key_id}`."),
        ),
      )
      .await
    }
  }
}

/// Generates and uploads a JSON file with details for specified keys
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn getkeysjson(
  ctx: Context<'_>,
  #[description = "Key ids separated by spaces"] key_ids: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let ids: Vec<String> =
    key_ids.split_whitespace().map(str::to_string).collect();
  if ids.is_empty() {
    return reply(
      ctx,
      failure(
        ctx,
        "❌ No Key IDs Provided",
        "Please provide at least one valid key ID.",
      ),
    )
    .await;
  }

  let (records, failed) = ctx.data().app.lifecycle().export_keys(&ids).await;

  let failed_block = (!failed.is_empty())
    .then(|| format!("```\n{}\n```", failed.join("\n")));

  if records.is_empty() {
    let mut embed = failure(
      ctx,
      "❌ Failed to Fetch Keys",
      "Could not retrieve details for any of the provided key IDs. Please \
       check the IDs and try again.",
    );
    if let Some(block) = failed_block {
      embed = embed.field("Failed Key IDs", block, false);
    }
    return reply(ctx, embed).await;
  }

  let body = json::to_string_pretty(&records)?;
  let filename =
    format!("authguard_keys_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
  let attachment =
    serenity::CreateAttachment::bytes(body.into_bytes(), filename);

  let mut embed = success(ctx, "📄 Keys JSON Generated Successfully!")
    .description(format!(
      "Found details for {} key(s). The JSON file is attached below.",
      records.len()
    ))
    .field("Status", "✅ File generated", true)
    .field("Number of Keys", records.len().to_string(), true);
  if let Some(block) = failed_block {
    embed = embed.field("Failed Key IDs", block, false).field(
      "⚠️ Note",
      "Some keys could not be retrieved. Check the failed key IDs above.",
      false,
    );
  }

  ctx
    .send(
      poise::CreateReply::default()
        .embed(embed)
        .attachment(attachment)
        .ephemeral(true),
    )
    .await?;
  Ok(())
}

/// Downloads all default keys to a text file
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn downloaddefaultkeys(ctx: Context<'_>) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  match ctx.data().app.lifecycle().dump_default_keys().await {
    Ok(dump) => {
      let filename =
        format!("default_keys_{}.txt", Utc::now().format("%Y%m%d_%H%M%S"));
      let attachment =
        serenity::CreateAttachment::bytes(dump.into_bytes(), filename);

      let embed = success(ctx, "✅ Default Keys Downloaded!")
        .description("All default keys have been downloaded to a text file.")
        .field("Status", "✅ File generated", true);

      ctx
        .send(
          poise::CreateReply::default()
            .embed(embed)
            .attachment(attachment)
            .ephemeral(true),
        )
        .await?;
      Ok(())
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Download Keys",
          "Could not retrieve default keys. Please try again later.",
        ),
      )
      .await
    }
  }
}

/// Adds a note to a premium key
#[poise::command(
  slash_command,
  ephemeral,
  guild_only,
  required_permissions = "ADMINISTRATOR"
)]
async fn addnotetopremiumkey(
  ctx: Context<'_>,
  #[description = "Premium key id"] key_id: String,
  #[description = "Note content"] note: String,
) -> Result<(), CommandError> {
  ctx.defer_ephemeral().await?;

  let key_id = key_id.trim();
  let note = note.trim();

  match ctx.data().app.lifecycle().set_note(key_id, note).await {
    Ok(()) => {
      let embed = success(ctx, "✅ Note Added Successfully!")
        .description("The note has been added to the Premium Key.")
        .field("Key ID", code(key_id), false)
        .field("Note", code(note), true)
        .field("Status", "✅ Note added", true);
      reply(ctx, embed).await
    }
    Err(Error::NotFound) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Invalid Key ID",
          format!(
            "Could not verify key ID `{key_id}`. Ensure it is a valid \
             Premium Key."
          ),
        ),
      )
      .await
    }
    Err(_) => {
      reply(
        ctx,
        failure(
          ctx,
          "❌ Failed to Add Note",
          format!(
            "Could not add note to key `{key_id}`. Ensure the Key ID is \
             correct and is a **Premium Key**."
          ),
        ),
      )
      .await
    }
  }
}
