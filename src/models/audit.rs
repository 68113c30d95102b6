//! Write-time audit information

use chrono::{DateTime, Utc};

/// Who performs a write and when.
///
/// Built by the service layer for each operation and passed into every
/// repository write that touches `created_*` / `last_modified_*` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audit {
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl Audit {
    pub fn now(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            at: Utc::now(),
        }
    }
}
