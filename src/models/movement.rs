//! Movements: named habit groups with a repetition interval.

use serde_json::{json, Value};

use super::MovementId;

/// A habit topic users subscribe to.
///
/// Movement names are not unique at the schema level; callers probe for
/// duplicates through the registry before creating one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    /// Store-assigned id.
    pub id: MovementId,
    /// Display name (up to 50 characters).
    pub name: String,
    /// Repetition interval, e.g. `daily`, `twice daily`, `weekly`.
    pub interval: String,
    /// One-line summary (up to 100 characters).
    pub short_description: String,
    /// Elaborate description (up to 1000 characters).
    pub description: String,
}

impl Movement {
    /// Base JSON projection; the composed viewer-specific fields are added
    /// by the projection helpers.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "short_description": self.short_description,
            "description": self.description,
            "interval": self.interval,
        })
    }
}
