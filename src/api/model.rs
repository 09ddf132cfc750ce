//! Wire shapes for the AuthGuard key-manager API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An instant as the remote service encodes it: Unix seconds, Unix
/// milliseconds, or an ISO-8601 string. Kept raw so display and status
/// classification run the same normalization.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawInstant {
  Int(i64),
  Float(f64),
  Text(String),
}

impl fmt::Display for RawInstant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RawInstant::Int(n) => write!(f, "{n}"),
      RawInstant::Float(x) => write!(f, "{x}"),
      RawInstant::Text(s) => f.write_str(s),
    }
  }
}

/// Response envelope shared by every key-manager endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  #[serde(default)]
  pub success: bool,
  pub data: Option<T>,
  #[serde(rename = "statusCode")]
  pub status_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
  pub id: String,
  #[serde(default)]
  pub key: String,
  #[serde(default)]
  pub hwid: Option<String>,
  #[serde(default)]
  pub created_at: Option<RawInstant>,
  #[serde(default)]
  pub expired_at: Option<RawInstant>,
  #[serde(default)]
  pub service_id: Option<i64>,
  #[serde(default)]
  pub ip: Option<String>,
  #[serde(default)]
  pub session_id: Option<String>,
  // Opaque pass-through metadata; the service is not consistent about
  // whether these come back as strings or numbers.
  #[serde(default)]
  pub discord_id: Option<json::Value>,
  #[serde(default)]
  pub provider_id: Option<json::Value>,
  #[serde(default)]
  #[allow(dead_code)]
  pub note: Option<String>,
  #[serde(default)]
  pub is_blacklisted: bool,
}

impl KeyRecord {
  /// Bound hardware id, treating the empty string as unbound.
  pub fn bound_hwid(&self) -> Option<&str> {
    self.hwid.as_deref().filter(|hwid| !hwid.is_empty())
  }
}

/// A key payload arrives wrapped in `defaultKey`, wrapped in `premiumKey`,
/// or bare, depending on the endpoint. Resolved once here so everything
/// above the client sees one `KeyRecord` shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeyPayload {
  Default {
    #[serde(rename = "defaultKey")]
    default_key: KeyRecord,
  },
  Premium {
    #[serde(rename = "premiumKey")]
    premium_key: KeyRecord,
  },
  Raw(KeyRecord),
}

impl KeyPayload {
  pub fn into_record(self) -> KeyRecord {
    match self {
      KeyPayload::Default { default_key } => default_key,
      KeyPayload::Premium { premium_key } => premium_key,
      KeyPayload::Raw(record) => record,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct PremiumKeyData {
  #[serde(rename = "premiumKey")]
  pub premium_key: Option<KeyRecord>,
}

#[derive(Debug, Deserialize)]
pub struct DefaultKeyList {
  #[serde(rename = "defaultKeys")]
  pub default_keys: Option<Vec<KeyRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct BlacklistEntry {
  pub id: String,
  #[serde(default)]
  pub hwid: Option<String>,
  #[serde(default)]
  pub expired_at: Option<RawInstant>,
  #[serde(default)]
  pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlacklistPage {
  #[serde(default)]
  pub blacklist: Vec<BlacklistEntry>,
}

/// One line of the `/getkeysjson` export. Instants are passed through in
/// whatever encoding the service returned them.
#[derive(Debug, Serialize)]
pub struct ExportRecord {
  pub key_id: String,
  pub key: String,
  pub created_at: Option<RawInstant>,
  pub expired_at: Option<RawInstant>,
  pub hwid: String,
}

impl From<KeyRecord> for ExportRecord {
  fn from(key: KeyRecord) -> Self {
    Self {
      key_id: key.id,
      key: key.key,
      created_at: key.created_at,
      expired_at: key.expired_at,
      hwid: key.hwid.unwrap_or_default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_payload_unwrapping() {
    let wrapped: KeyPayload =
      json::from_str(r#"{"defaultKey": {"id": "a", "key": "K"}}"#).unwrap();
    assert_eq!(wrapped.into_record().id, "a");

    let premium: KeyPayload =
      json::from_str(r#"{"premiumKey": {"id": "b"}}"#).unwrap();
    assert_eq!(premium.into_record().id, "b");

    let raw: KeyPayload =
      json::from_str(r#"{"id": "c", "hwid": "HW"}"#).unwrap();
    let record = raw.into_record();
    assert_eq!(record.id, "c");
    assert_eq!(record.bound_hwid(), Some("HW"));
  }

  #[test]
  fn test_empty_hwid_is_unbound() {
    let record: KeyRecord = json::from_str(r#"{"id": "a", "hwid": ""}"#).unwrap();
    assert_eq!(record.bound_hwid(), None);
  }

  #[test]
  fn test_instant_encodings() {
    let record: KeyRecord = json::from_str(
      r#"{"id": "a", "createdAt": "2025-01-01T00:00:00Z", "expiredAt": 1735689600}"#,
    )
    .unwrap();
    assert_eq!(
      record.created_at,
      Some(RawInstant::Text("2025-01-01T00:00:00Z".into()))
    );
    assert_eq!(record.expired_at, Some(RawInstant::Int(1735689600)));
  }

  #[test]
  fn test_export_shape() {
    let key: KeyRecord =
      json::from_str(r#"{"id": "a", "key": "K", "expiredAt": 0}"#).unwrap();
    let line = json::to_value(ExportRecord::from(key)).unwrap();
    assert_eq!(line["key_id"], "a");
    assert_eq!(line["key"], "K");
    assert_eq!(line["expired_at"], 0);
    assert_eq!(line["hwid"], "");
  }
}
