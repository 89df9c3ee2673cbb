//! Movement-wide announcements, posted by administrators.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{AnnouncementId, MovementId, User, UserId};
use crate::timefmt::format_timestamp;

/// An admin-authored note broadcast to a movement.
///
/// Announcements are soft-deleted: `removed_time` retires the row but the
/// row itself is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Store-assigned id.
    pub id: AnnouncementId,
    /// The movement this announcement belongs to.
    pub movement_id: MovementId,
    /// The posting administrator.
    pub poster_id: UserId,
    /// The note itself (up to 140 characters).
    pub message: String,
    /// Set on construction.
    pub created_time: DateTime<Utc>,
    /// Set on every message update.
    pub updated_time: Option<DateTime<Utc>>,
    /// Non-null once removed.
    pub removed_time: Option<DateTime<Utc>>,
}

impl Announcement {
    /// True while the announcement is visible.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.removed_time.is_none()
    }

    /// Replaces the message and stamps `updated_time`.
    pub fn update_message(&mut self, message: String, now: DateTime<Utc>) {
        self.message = message;
        self.updated_time = Some(now);
    }

    /// Retires the announcement. Removing twice keeps the first timestamp.
    pub fn remove(&mut self, now: DateTime<Utc>) {
        if self.removed_time.is_none() {
            self.removed_time = Some(now);
        }
    }

    /// JSON projection, with the poster expanded.
    #[must_use]
    pub fn to_json(&self, poster: &User) -> Value {
        json!({
            "id": self.id,
            "movement_id": self.movement_id,
            "poster": poster.to_json(false),
            "message": self.message,
            "created_time": format_timestamp(self.created_time),
            "updated_time": self.updated_time.map(format_timestamp),
        })
    }
}
