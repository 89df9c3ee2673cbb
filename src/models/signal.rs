//! Signals: timestamped "I did it" events from leaders.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{MovementId, SignalId, UserId};
use crate::timefmt::format_timestamp;

/// One signal from a leader in a movement. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Store-assigned id.
    pub id: SignalId,
    /// The signalling leader.
    pub leader_id: UserId,
    /// The movement the signal belongs to.
    pub movement_id: MovementId,
    /// When the signal was sent.
    pub time_stamp: DateTime<Utc>,
    /// Optional caption (up to 140 characters).
    pub message: Option<String>,
}

impl Signal {
    /// JSON projection. The `message` key is omitted when there is none.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "time_stamp": format_timestamp(self.time_stamp),
        });
        if let Some(message) = &self.message {
            value["message"] = json!(message);
        }
        value
    }
}
