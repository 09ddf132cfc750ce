//! Compound key-lifecycle workflows over the remote API.
//!
//! The remote service can only ban by hardware id, so `blacklist` falls
//! back to expiring the key itself when no hwid is bound, and `whitelist`
//! mirrors that branch exactly to stay able to undo it.

use futures::future;

use crate::{
  api::{ApiClient, KeyKind, model::ExportRecord},
  expiry::{self, KeyStatus},
  prelude::*,
};

/// Fallback ban length when a command supplies no usable duration (7 days).
pub const DEFAULT_BAN_SECS: i64 = 604_800;
/// Expiry applied when undoing an early disable (365 days out).
pub const RESTORE_SECS: i64 = 31_536_000;

/// Which mechanism a blacklist call ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlacklistOutcome {
  /// A blacklist entry was created for the key's bound hwid.
  HwidBanned,
  /// The key had no hwid; its own expiry was forced into the near future.
  Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistOutcome {
  /// The live blacklist entry for the key's hwid was deleted.
  EntryRemoved,
  /// No hwid or no live entry; the key's expiry was pushed far out.
  Restored,
}

pub struct Lifecycle<'a> {
  api: &'a ApiClient,
}

impl<'a> Lifecycle<'a> {
  pub fn new(api: &'a ApiClient) -> Self {
    Self { api }
  }

  pub async fn blacklist(
    &self,
    key_id: &str,
    duration_secs: i64,
    reason: &str,
  ) -> Result<BlacklistOutcome> {
    // Never ban blind: the key must be confirmed first.
    let key = self.api.key_by_id(key_id).await?;

    match key.bound_hwid() {
      Some(hwid) => {
        self.api.create_blacklist_entry(hwid, duration_secs, reason).await?;
        info!("blacklisted hwid {hwid} of key {key_id}: {reason}");
        Ok(BlacklistOutcome::HwidBanned)
      }
      None => {
        self.disable(key_id, duration_secs, reason).await?;
        Ok(BlacklistOutcome::Disabled)
      }
    }
  }

  pub async fn whitelist(
    &self,
    key_id: &str,
    reason: &str,
  ) -> Result<WhitelistOutcome> {
    let key = self.api.key_by_id(key_id).await?;

    let Some(hwid) = key.bound_hwid() else {
      self.restore(key_id, reason).await?;
      return Ok(WhitelistOutcome::Restored);
    };

    match self.api.blacklist_entry_by_hwid(hwid).await {
      Ok(entry_id) => {
        self.api.delete_blacklist_entry(&entry_id).await?;
        info!("removed blacklist entry {entry_id} for key {key_id}");
        Ok(WhitelistOutcome::EntryRemoved)
      }
      // No live entry: the key was disabled via the expiry path.
      Err(Error::NotFound) => {
        self.restore(key_id, reason).await?;
        Ok(WhitelistOutcome::Restored)
      }
      Err(err) => Err(err),
    }
  }

  /// Forces the key's own expiry to `now + duration`; the only ban
  /// mechanism available for hwid-less keys.
  pub async fn disable(
    &self,
    key_id: &str,
    duration_secs: i64,
    reason: &str,
  ) -> Result<()> {
    info!("disabling key {key_id} for {duration_secs}s: {reason}");
    let expired_at = Utc::now().timestamp() + duration_secs;
    self
      .api
      .patch_key(KeyKind::Default, key_id, json::json!({
        "expiredAt": expired_at,
      }))
      .await
  }

  /// Undoes an early disable by pushing the expiry a year out.
  pub async fn restore(&self, key_id: &str, reason: &str) -> Result<()> {
    info!("restoring key {key_id}: {reason}");
    let expired_at = Utc::now().timestamp() + RESTORE_SECS;
    self
      .api
      .patch_key(KeyKind::Default, key_id, json::json!({
        "expiredAt": expired_at,
      }))
      .await
  }

  pub async fn reset_hwid(&self, key_id: &str) -> Result<()> {
    self
      .api
      .patch_key(KeyKind::Default, key_id, json::json!({ "hwid": "" }))
      .await
  }

  pub async fn check_expiration(&self, key_id: &str) -> Result<KeyStatus> {
    let key = self.api.key_by_id(key_id).await?;
    Ok(expiry::classify(key.expired_at.as_ref()))
  }

  /// Links a Discord user id to a premium key. The id is validated locally
  /// and the key is confirmed to be premium before the patch goes out.
  pub async fn attach_discord_id(
    &self,
    key_id: &str,
    discord_id: &str,
  ) -> Result<()> {
    if discord_id.is_empty() || !discord_id.bytes().all(|b| b.is_ascii_digit())
    {
      return Err(Error::InvalidDiscordId);
    }

    self.api.premium_key_by_id(key_id).await?;
    self
      .api
      .patch_key(KeyKind::Premium, key_id, json::json!({
        "discordId": discord_id,
      }))
      .await
  }

  pub async fn set_note(&self, key_id: &str, note: &str) -> Result<()> {
    self.api.premium_key_by_id(key_id).await?;
    self.api.set_premium_note(key_id, note).await
  }

  /// Resolves every id, keeping export records in input order and
  /// collecting the ids that failed to resolve for reporting.
  pub async fn export_keys(
    &self,
    ids: &[String],
  ) -> (Vec<ExportRecord>, Vec<String>) {
    let lookups = ids.iter().map(|id| self.api.key_by_id(id));
    let results = future::join_all(lookups).await;

    let mut records = Vec::new();
    let mut failed = Vec::new();
    for (id, result) in ids.iter().zip(results) {
      match result {
        Ok(key) => records.push(ExportRecord::from(key)),
        Err(_) => failed.push(id.clone()),
      }
    }
    (records, failed)
  }

  /// Plain-text dump of every default key, one block per key.
  pub async fn dump_default_keys(&self) -> Result<String> {
    let keys = self.api.default_keys().await?;

    let separator = "-".repeat(33);
    let mut out = String::new();
    for key in keys {
      out.push_str(&separator);
      out.push('\n');
      out.push_str(&format!("Key : {}\n", key.key));
      out.push_str(&format!("ID : {}\n", key.id));
      out.push_str(&separator);
      out.push('\n');
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use mockito::{Matcher, Server, ServerGuard};

  use super::*;
  use crate::config::Config;

  fn client(server: &ServerGuard) -> ApiClient {
    ApiClient::new(&Config {
      api_url: server.url(),
      api_token: "test-token".into(),
      service_id: 42,
      bot_token: String::new(),
      promo_link: String::new(),
    })
  }

  /// Matches a body whose `expiredAt` lands within a few seconds of
  /// `now + offset_secs`, tolerating clock movement during the test.
  fn expires_around(offset_secs: i64) -> Matcher {
    let base = Utc::now().timestamp() + offset_secs;
    Matcher::AnyOf(
      (0..3)
        .map(|drift| {
          Matcher::PartialJson(json::json!({ "expiredAt": base + drift }))
        })
        .collect(),
    )
  }

  async fn mock_key(server: &mut ServerGuard, id: &str, hwid: &str) {
    server
      .mock("GET", format!("/key-manager/premium-key/{id}").as_str())
      .with_status(200)
      .with_body(
        json::json!({
          "success": true,
          "data": { "premiumKey": { "id": id, "key": "K", "hwid": hwid } },
        })
        .to_string(),
      )
      .create_async()
      .await;
  }

  #[tokio::test]
  async fn test_blacklist_bound_key_creates_entry() {
    let mut server = Server::new_async().await;
    mock_key(&mut server, "k1", "ABC").await;

    let entry = server
      .mock("POST", "/key-manager/blacklist")
      .match_body(Matcher::PartialJson(json::json!({
        "hwid": "ABC",
        "reason": "test ban",
      })))
      .with_status(201)
      .with_body(r#"{"success": true, "data": {"id": "e1", "hwid": "ABC"}}"#)
      .create_async()
      .await;
    let patched = server
      .mock("PATCH", "/key-manager/default-key/k1")
      .expect(0)
      .create_async()
      .await;

    let api = client(&server);
    let outcome =
      Lifecycle::new(&api).blacklist("k1", 3600, "test ban").await.unwrap();

    assert_eq!(outcome, BlacklistOutcome::HwidBanned);
    entry.assert_async().await;
    patched.assert_async().await;
  }

  #[tokio::test]
  async fn test_blacklist_unbound_key_disables() {
    let mut server = Server::new_async().await;
    mock_key(&mut server, "k2", "").await;

    let patched = server
      .mock("PATCH", "/key-manager/default-key/k2")
      .match_body(expires_around(3600))
      .with_status(200)
      .with_body(r#"{"success": true}"#)
      .create_async()
      .await;
    let entry = server
      .mock("POST", "/key-manager/blacklist")
      .expect(0)
      .create_async()
      .await;

    let api = client(&server);
    let outcome =
      Lifecycle::new(&api).blacklist("k2", 3600, "test").await.unwrap();

    assert_eq!(outcome, BlacklistOutcome::Disabled);
    patched.assert_async().await;
    entry.assert_async().await;
  }

  #[tokio::test]
  async fn test_blacklist_unknown_key_fails() {
    let server = Server::new_async().await;
    let api = client(&server);
    let result = Lifecycle::new(&api).blacklist("nope", 3600, "test").await;
    assert_eq!(result.unwrap_err(), Error::NotFound);
  }

  #[tokio::test]
  async fn test_whitelist_bound_key_removes_entry() {
    let mut server = Server::new_async().await;
    mock_key(&mut server, "k3", "ABC").await;

    server
      .mock("GET", "/key-manager/blacklist")
      .match_query(Matcher::UrlEncoded("hwid".into(), "ABC".into()))
      .with_status(200)
      .with_body(
        r#"{"success": true, "data": {"blacklist": [{"id": "e7", "hwid": "ABC"}]}}"#,
      )
      .create_async()
      .await;
    let deleted = server
      .mock("DELETE", "/key-manager/blacklist/e7")
      .with_status(204)
      .create_async()
      .await;

    let api = client(&server);
    let outcome = Lifecycle::new(&api).whitelist("k3", "undo").await.unwrap();

    assert_eq!(outcome, WhitelistOutcome::EntryRemoved);
    deleted.assert_async().await;
  }

  #[tokio::test]
  async fn test_whitelist_bound_key_without_entry_restores() {
    let mut server = Server::new_async().await;
    mock_key(&mut server, "k4", "ABC").await;

    server
      .mock("GET", "/key-manager/blacklist")
      .with_status(200)
      .with_body(r#"{"success": true, "data": {"blacklist": []}}"#)
      .create_async()
      .await;
    let restored = server
      .mock("PATCH", "/key-manager/default-key/k4")
      .match_body(expires_around(RESTORE_SECS))
      .with_status(200)
      .with_body(r#"{"success": true}"#)
      .create_async()
      .await;

    let api = client(&server);
    let outcome = Lifecycle::new(&api).whitelist("k4", "undo").await.unwrap();

    assert_eq!(outcome, WhitelistOutcome::Restored);
    restored.assert_async().await;
  }

  #[tokio::test]
  async fn test_disable_then_restore_round_trip() {
    // A hwid-less key: blacklist expires it an hour out, whitelist pushes
    // the expiry a year out again.
    let mut server = Server::new_async().await;
    mock_key(&mut server, "k5", "").await;

    let disabled = server
      .mock("PATCH", "/key-manager/default-key/k5")
      .match_body(expires_around(3600))
      .with_status(200)
      .with_body(r#"{"success": true}"#)
      .create_async()
      .await;

    let api = client(&server);
    let lifecycle = Lifecycle::new(&api);

    let outcome = lifecycle.blacklist("k5", 3600, "test").await.unwrap();
    assert_eq!(outcome, BlacklistOutcome::Disabled);
    disabled.assert_async().await;

    let restored = server
      .mock("PATCH", "/key-manager/default-key/k5")
      .match_body(expires_around(RESTORE_SECS))
      .with_status(200)
      .with_body(r#"{"success": true}"#)
      .create_async()
      .await;

    let outcome = lifecycle.whitelist("k5", "undo").await.unwrap();
    assert_eq!(outcome, WhitelistOutcome::Restored);
    restored.assert_async().await;
  }

  #[tokio::test]
  async fn test_check_expiration() {
    let mut server = Server::new_async().await;
    server
      .mock("GET", "/key-manager/premium-key/perm")
      .with_status(200)
      .with_body(
        r#"{"success": true, "data": {"premiumKey": {"id": "perm", "expiredAt": 0}}}"#,
      )
      .create_async()
      .await;
    server
      .mock("GET", "/key-manager/premium-key/old")
      .with_status(200)
      .with_body(
        r#"{"success": true, "data": {"premiumKey": {"id": "old", "expiredAt": 1000}}}"#,
      )
      .create_async()
      .await;

    let api = client(&server);
    let lifecycle = Lifecycle::new(&api);

    assert_eq!(
      lifecycle.check_expiration("perm").await.unwrap(),
      KeyStatus::Permanent
    );
    assert_eq!(
      lifecycle.check_expiration("old").await.unwrap(),
      KeyStatus::Expired
    );
    assert_eq!(
      lifecycle.check_expiration("missing").await.unwrap_err(),
      Error::NotFound
    );
  }

  #[tokio::test]
  async fn test_attach_discord_id_rejects_non_numeric() {
    let server = Server::new_async().await;
    let api = client(&server);
    let result =
      Lifecycle::new(&api).attach_discord_id("k1", "not-a-number").await;
    // Rejected locally, before any remote call.
    assert_eq!(result.unwrap_err(), Error::InvalidDiscordId);
  }

  #[tokio::test]
  async fn test_attach_discord_id_requires_premium_key() {
    let mut server = Server::new_async().await;
    server
      .mock("GET", "/key-manager/premium-key/k1")
      .with_status(200)
      .with_body(r#"{"success": true, "data": {}}"#)
      .create_async()
      .await;

    let api = client(&server);
    let result =
      Lifecycle::new(&api).attach_discord_id("k1", "104472").await;
    assert_eq!(result.unwrap_err(), Error::NotFound);
  }

  #[tokio::test]
  async fn test_export_keeps_input_order_and_failures() {
    let mut server = Server::new_async().await;
    mock_key(&mut server, "a", "HW1").await;
    mock_key(&mut server, "c", "").await;

    let api = client(&server);
    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let (records, failed) = Lifecycle::new(&api).export_keys(&ids).await;

    assert_eq!(
      records.iter().map(|r| r.key_id.as_str()).collect::<Vec<_>>(),
      ["a", "c"]
    );
    assert_eq!(failed, ["b"]);
  }

  #[tokio::test]
  async fn test_dump_default_keys_layout() {
    let mut server = Server::new_async().await;
    server
      .mock("GET", "/key-manager/default-key")
      .with_status(200)
      .with_body(
        r#"{"success": true, "data": {"defaultKeys": [{"id": "i1", "key": "K1"}]}}"#,
      )
      .create_async()
      .await;

    let api = client(&server);
    let dump = Lifecycle::new(&api).dump_default_keys().await.unwrap();

    let separator = "-".repeat(33);
    assert_eq!(
      dump,
      format!("{separator}\nKey : K1\nID : i1\n{separator}\n")
    );
  }
}
