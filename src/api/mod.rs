//! Authenticated HTTP access to the AuthGuard key-manager service.
//!
//! Every operation classifies transport faults (timeout, connection
//! failure, malformed JSON) the same way as a plain miss, so the lifecycle
//! workflows above can treat "could not confirm" as "does not exist".

pub mod model;

use reqwest::{
  Client, StatusCode,
  header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, ORIGIN, REFERER},
};

use self::model::{
  BlacklistEntry, BlacklistPage, DefaultKeyList, Envelope, KeyPayload,
  KeyRecord, PremiumKeyData,
};
use crate::{config::Config, prelude::*};

/// Lifetime of a key created by the plain create call.
pub const DEFAULT_KEY_TTL_SECS: i64 = 86_400;

const SITE_ORIGIN: &str = "https://authguard.org";
const SITE_REFERER: &str = "https://authguard.org/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Which of the two patchable key collections an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
  Default,
  Premium,
}

impl KeyKind {
  fn segment(self) -> &'static str {
    match self {
      KeyKind::Default => "default-key",
      KeyKind::Premium => "premium-key",
    }
  }
}

/// Stateless, cheaply clonable client. Safe to use from concurrently
/// running command invocations.
#[derive(Debug, Clone)]
pub struct ApiClient {
  http: Client,
  base_url: String,
  service_id: i64,
}

impl ApiClient {
  pub fn new(config: &Config) -> Self {
    let mut headers = HeaderMap::new();
    let bearer = format!("Bearer {}", config.api_token);
    headers.insert(
      AUTHORIZATION,
      HeaderValue::from_str(&bearer)
        .expect("API token is not a valid header value"),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static(SITE_ORIGIN));
    headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));

    let http = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .default_headers(headers)
      .build()
      .expect("failed to build HTTP client");

    Self {
      http,
      base_url: config.api_url.trim_end_matches('/').to_string(),
      service_id: config.service_id,
    }
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.base_url)
  }

  /// Looks a key up by id, probing the premium endpoint first, then the
  /// default one, then the service-scoped one. The first success-flagged
  /// payload wins, whatever envelope variant it arrives in.
  pub async fn key_by_id(&self, id: &str) -> Result<KeyRecord> {
    let probes = [
      self.url(&format!("/key-manager/premium-key/{id}")),
      self.url(&format!("/key-manager/default-key/{id}")),
      self.url(&format!(
        "/key-manager/service/{}/key/{id}",
        self.service_id
      )),
    ];

    for url in probes {
      let Ok(response) = self.http.get(&url).send().await else {
        continue;
      };
      if response.status() != StatusCode::OK {
        continue;
      }
      let Ok(envelope) = response.json::<Envelope<KeyPayload>>().await else {
        continue;
      };
      if envelope.success
        && let Some(payload) = envelope.data
      {
        return Ok(payload.into_record());
      }
    }

    Err(Error::NotFound)
  }

  /// The premium endpoint alone; used to verify premium-only mutations.
  pub async fn premium_key_by_id(&self, id: &str) -> Result<KeyRecord> {
    let url = self.url(&format!("/key-manager/premium-key/{id}"));
    let response =
      self.http.get(&url).send().await.map_err(|_| Error::NotFound)?;
    if response.status() != StatusCode::OK {
      return Err(Error::NotFound);
    }
    let envelope: Envelope<PremiumKeyData> =
      response.json().await.map_err(|_| Error::NotFound)?;
    envelope
      .data
      .and_then(|data| data.premium_key)
      .ok_or(Error::NotFound)
  }

  pub async fn default_keys(&self) -> Result<Vec<KeyRecord>> {
    let url = self.url("/key-manager/default-key");
    let response =
      self.http.get(&url).send().await.map_err(|_| Error::NotFound)?;
    if response.status() != StatusCode::OK {
      return Err(Error::NotFound);
    }
    let envelope: Envelope<DefaultKeyList> =
      response.json().await.map_err(|_| Error::NotFound)?;
    envelope
      .data
      .and_then(|data| data.default_keys)
      .ok_or(Error::NotFound)
  }

  /// First default key whose value equals `name` exactly.
  pub async fn key_by_name(&self, name: &str) -> Result<KeyRecord> {
    let keys = self.default_keys().await?;
    keys.into_iter().find(|key| key.key == name).ok_or(Error::NotFound)
  }

  pub async fn create_default_key(&self) -> Result<KeyRecord> {
    self.create_key(KeyKind::Default, DEFAULT_KEY_TTL_SECS).await
  }

  pub async fn create_premium_key(&self, expires_in: i64) -> Result<KeyRecord> {
    self.create_key(KeyKind::Premium, expires_in).await
  }

  async fn create_key(
    &self,
    kind: KeyKind,
    expires_in: i64,
  ) -> Result<KeyRecord> {
    let url = self.url(&format!("/key-manager/{}", kind.segment()));
    let payload = json::json!({
      "expiredAt": Utc::now().timestamp() + expires_in,
    });

    let response = self
      .http
      .post(&url)
      .json(&payload)
      .send()
      .await
      .map_err(|_| Error::OperationFailed)?;
    if response.status() != StatusCode::CREATED {
      return Err(Error::OperationFailed);
    }

    let envelope: Envelope<KeyPayload> =
      response.json().await.map_err(|_| Error::OperationFailed)?;
    if !envelope.success {
      return Err(Error::OperationFailed);
    }
    envelope
      .data
      .map(KeyPayload::into_record)
      .ok_or(Error::OperationFailed)
  }

  /// Generic partial update: hwid reset, expiry change, discordId attach.
  /// Success requires HTTP 200 and a success-flagged body.
  pub async fn patch_key(
    &self,
    kind: KeyKind,
    id: &str,
    body: json::Value,
  ) -> Result<()> {
    let envelope = self.patch(kind, id, body).await?;
    if envelope.success { Ok(()) } else { Err(Error::OperationFailed) }
  }

  /// Note updates additionally require `statusCode: 200` in the body.
  pub async fn set_premium_note(&self, id: &str, note: &str) -> Result<()> {
    let envelope = self
      .patch(KeyKind::Premium, id, json::json!({ "note": note }))
      .await?;
    if envelope.success && envelope.status_code == Some(200) {
      Ok(())
    } else {
      Err(Error::OperationFailed)
    }
  }

  async fn patch(
    &self,
    kind: KeyKind,
    id: &str,
    body: json::Value,
  ) -> Result<Envelope<json::Value>> {
    let url = self.url(&format!("/key-manager/{}/{id}", kind.segment()));
    let response = self
      .http
      .patch(&url)
      .json(&body)
      .send()
      .await
      .map_err(|_| Error::OperationFailed)?;
    if response.status() != StatusCode::OK {
      return Err(Error::OperationFailed);
    }
    response.json().await.map_err(|_| Error::OperationFailed)
  }

  /// Bans a hardware id until `now + expires_in`. Returns the new entry's
  /// id.
  pub async fn create_blacklist_entry(
    &self,
    hwid: &str,
    expires_in: i64,
    reason: &str,
  ) -> Result<String> {
    let url = self.url("/key-manager/blacklist");
    let payload = json::json!({
      "hwid": hwid,
      "ip": null,
      "reason": reason,
      "expiredAt": Utc::now().timestamp() + expires_in,
    });

    let response = self
      .http
      .post(&url)
      .json(&payload)
      .send()
      .await
      .map_err(|_| Error::OperationFailed)?;
    if response.status() != StatusCode::CREATED {
      return Err(Error::OperationFailed);
    }

    let envelope: Envelope<BlacklistEntry> =
      response.json().await.map_err(|_| Error::OperationFailed)?;
    if !envelope.success {
      return Err(Error::OperationFailed);
    }
    envelope.data.map(|entry| entry.id).ok_or(Error::OperationFailed)
  }

  /// Id of the live blacklist entry bound to `hwid`, if any.
  pub async fn blacklist_entry_by_hwid(&self, hwid: &str) -> Result<String> {
    let url = self.url("/key-manager/blacklist");
    let service_id = self.service_id.to_string();
    let response = self
      .http
      .get(&url)
      .query(&[("hwid", hwid), ("serviceId", service_id.as_str())])
      .send()
      .await
      .map_err(|_| Error::NotFound)?;
    if response.status() != StatusCode::OK {
      return Err(Error::NotFound);
    }

    let envelope: Envelope<BlacklistPage> =
      response.json().await.map_err(|_| Error::NotFound)?;
    if !envelope.success {
      return Err(Error::NotFound);
    }
    let page = envelope.data.ok_or(Error::NotFound)?;
    page
      .blacklist
      .into_iter()
      .find(|entry| entry.hwid.as_deref() == Some(hwid))
      .map(|entry| entry.id)
      .ok_or(Error::NotFound)
  }

  /// Success on 200 or 204 regardless of body.
  pub async fn delete_blacklist_entry(&self, id: &str) -> Result<()> {
    let url = self.url(&format!("/key-manager/blacklist/{id}"));
    let response =
      self.http.delete(&url).send().await.map_err(|_| Error::OperationFailed)?;
    match response.status() {
      StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
      _ => Err(Error::OperationFailed),
    }
  }
}
