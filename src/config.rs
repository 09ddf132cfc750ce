use std::env;

use anyhow::Context;

pub const DEFAULT_API_URL: &str = "https://api.authguard.org";

/// Process-lifetime configuration, loaded once at startup and passed by
/// reference everywhere else. Missing required values are fatal before any
/// command can run.
#[derive(Debug, Clone)]
pub struct Config {
  pub api_url: String,
  pub api_token: String,
  pub service_id: i64,
  pub bot_token: String,
  pub promo_link: String,
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_lookup(|name| env::var(name).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let require = |name: &str| {
      lookup(name)
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("{name} not set"))
    };

    let service_id = require("AUTHGUARD_SERVICE_ID")?
      .trim()
      .parse()
      .context("AUTHGUARD_SERVICE_ID must be numeric")?;

    Ok(Self {
      api_url: lookup("AUTHGUARD_API_URL")
        .unwrap_or_else(|| DEFAULT_API_URL.into()),
      api_token: require("AUTHGUARD_API_TOKEN")?,
      service_id,
      bot_token: require("DISCORD_BOT_TOKEN")?,
      promo_link: require("PROMO_LINK")?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vars(missing: &str) -> impl Fn(&str) -> Option<String> + '_ {
    move |name| {
      if name == missing {
        return None;
      }
      match name {
        "AUTHGUARD_API_TOKEN" => Some("token".into()),
        "AUTHGUARD_SERVICE_ID" => Some("42".into()),
        "DISCORD_BOT_TOKEN" => Some("bot".into()),
        "PROMO_LINK" => Some("https://example.org".into()),
        _ => None,
      }
    }
  }

  #[test]
  fn test_full_config() {
    let config = Config::from_lookup(vars("")).unwrap();
    assert_eq!(config.service_id, 42);
    assert_eq!(config.api_url, DEFAULT_API_URL);
  }

  #[test]
  fn test_missing_values_are_fatal() {
    for name in [
      "AUTHGUARD_API_TOKEN",
      "AUTHGUARD_SERVICE_ID",
      "DISCORD_BOT_TOKEN",
      "PROMO_LINK",
    ] {
      let err = Config::from_lookup(vars(name)).unwrap_err();
      assert!(err.to_string().contains(name), "{err}");
    }
  }

  #[test]
  fn test_non_numeric_service_id() {
    let lookup = |name: &str| match name {
      "AUTHGUARD_SERVICE_ID" => Some("not-a-number".into()),
      other => vars("")(other),
    };
    assert!(Config::from_lookup(lookup).is_err());
  }
}
