//! Explicit session context.
//!
//! The original system read the current user and unit settings from ambient
//! global state. Here every core operation receives a `SessionContext`
//! explicitly, keeping the domain layer deterministic and testable.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Caller identity plus the measurement-unit settings in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// The seller whose inventory and ledger are being operated on.
    pub user_id: UserId,
    /// Unit strings offered to the caller (e.g. "kg", "gram", "piece").
    pub unit_options: Vec<String>,
    /// Unit assumed when a line omits one.
    pub default_unit: String,
}

impl SessionContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            unit_options: vec!["kg".to_string(), "gram".to_string(), "piece".to_string()],
            default_unit: "kg".to_string(),
        }
    }

    pub fn with_default_unit(mut self, unit: impl Into<String>) -> Self {
        self.default_unit = unit.into();
        self
    }
}
