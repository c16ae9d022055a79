//! Rust models matching the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The lightweight record telling a cold start that a capability was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityMarker {
    pub key: String,
    pub stored: bool,
    pub timestamp: DateTime<Utc>,
}
