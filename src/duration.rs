use crate::prelude::*;

/// Parses a compact duration token: `<amount><unit>` with unit `d`, `h` or
/// `m`, case-insensitive, surrounding whitespace ignored. Returns the
/// equivalent whole-second count.
///
/// A zero amount or anything outside the `^(\d+)([dhm])$` shape is rejected.
/// No upper bound is enforced; oversized values may overflow a later expiry
/// computation and that is accepted.
pub fn parse_duration(token: &str) -> Result<i64> {
  let token = token.trim().to_ascii_lowercase();

  let mut chars = token.chars();
  let unit = chars.next_back().ok_or(Error::InvalidDuration)?;
  let digits = chars.as_str();

  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return Err(Error::InvalidDuration);
  }
  let amount: i64 = digits.parse().map_err(|_| Error::InvalidDuration)?;
  if amount == 0 {
    return Err(Error::InvalidDuration);
  }

  let scale = match unit {
    'd' => 86_400,
    'h' => 3_600,
    'm' => 60,
    _ => return Err(Error::InvalidDuration),
  };

  Ok(amount * scale)
}

/// Renders a second count back into the largest fitting unit, e.g. for
/// "expires `24d` from creation" fallbacks.
pub fn humanize(secs: i64) -> String {
  if secs >= 86_400 {
    format!("{}d", secs / 86_400)
  } else if secs >= 3_600 {
    format!("{}h", secs / 3_600)
  } else {
    format!("{}m", secs / 60)
  }
}
