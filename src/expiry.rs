//! Normalization of the heterogeneous expiry encodings the key-manager API
//! returns, and the expiry status classification built on top of it.
//!
//! Display formatting and status classification share one normalization
//! path so they can never disagree about the same raw value.

use std::fmt;

use chrono::{LocalResult, NaiveDateTime};

use crate::{api::model::RawInstant, prelude::*};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Canonical form of a raw expiry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
  /// `null` or `0` on the wire: the key never expires.
  Never,
  At(DateTime<Utc>),
  /// Unparseable input, carrying the raw text for diagnostics. Rendered as
  /// a literal string, never surfaced as an error.
  Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
  Permanent,
  Expired,
  Valid,
}

impl fmt::Display for KeyStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      KeyStatus::Permanent => "Permanent",
      KeyStatus::Expired => "Expired",
      KeyStatus::Valid => "Valid",
    })
  }
}

pub fn normalize(raw: Option<&RawInstant>) -> Expiry {
  match raw {
    None => Expiry::Never,
    Some(RawInstant::Int(0)) => Expiry::Never,
    Some(RawInstant::Int(n)) => from_epoch(*n),
    Some(RawInstant::Float(x)) if *x == 0.0 => Expiry::Never,
    Some(RawInstant::Float(x)) => from_epoch(x.trunc() as i64),
    Some(RawInstant::Text(s)) => parse_iso(s),
  }
}

/// More than ten decimal digits means milliseconds since epoch. The
/// heuristic misreads values near the boundary (~year 2286 in seconds) and
/// is kept anyway; the remote service offers no contract to replace it.
fn from_epoch(n: i64) -> Expiry {
  let secs = if n.to_string().len() > 10 { n / 1000 } else { n };
  match Utc.timestamp_opt(secs, 0) {
    LocalResult::Single(at) => Expiry::At(at),
    _ => Expiry::Invalid(n.to_string()),
  }
}

fn parse_iso(s: &str) -> Expiry {
  if let Ok(at) = DateTime::parse_from_rfc3339(s) {
    return Expiry::At(at.with_timezone(&Utc));
  }
  // Offset-less forms are taken as UTC.
  for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
      return Expiry::At(naive.and_utc());
    }
  }
  Expiry::Invalid(s.to_string())
}

pub fn classify(raw: Option<&RawInstant>) -> KeyStatus {
  classify_at(raw, Utc::now())
}

pub fn classify_at(raw: Option<&RawInstant>, now: DateTime<Utc>) -> KeyStatus {
  match normalize(raw) {
    Expiry::Never => KeyStatus::Permanent,
    Expiry::At(at) if at <= now => KeyStatus::Expired,
    Expiry::At(_) => KeyStatus::Valid,
    // An unreadable expiry cannot be proven live.
    Expiry::Invalid(_) => KeyStatus::Expired,
  }
}

/// Normalized epoch seconds, e.g. for Discord `<t:...:F>` timestamps.
/// `None` for never-expiring or unparseable values.
pub fn unix_seconds(raw: Option<&RawInstant>) -> Option<i64> {
  match normalize(raw) {
    Expiry::At(at) => Some(at.timestamp()),
    _ => None,
  }
}

pub fn format_expiry(raw: Option<&RawInstant>) -> String {
  match normalize(raw) {
    Expiry::Never => "N/A (Never Expires)".into(),
    Expiry::At(at) => at.format(DATE_FORMAT).to_string(),
    Expiry::Invalid(raw) => format!("Invalid Timestamp ({raw})"),
  }
}
