pub use std::{sync::Arc, time::Duration};

pub use chrono::{DateTime, TimeZone, Utc};
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
