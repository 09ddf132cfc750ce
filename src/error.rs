//! Error taxonomy for key-management operations.
//!
//! Transport faults (timeouts, connection failures, malformed bodies) are
//! collapsed into `NotFound`/`OperationFailed` at the API client boundary,
//! so callers can treat "could not confirm" and "does not exist" uniformly.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
  #[error("key or entry not found")]
  NotFound,

  #[error("remote operation failed")]
  OperationFailed,

  #[error("invalid duration token")]
  InvalidDuration,

  #[error("discord id must be numeric")]
  InvalidDiscordId,
}

pub type Result<T> = std::result::Result<T, Error>;
