//! The polymorphic user–movement relation.
//!
//! Subscriptions and creations share the same row shape and lifecycle
//! (`time_added` set on construction, `time_removed` set exactly once when
//! the relation ends); a discriminator tells them apart. Sharing the row
//! keeps `end`/`has_ended` in one place.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{Movement, MovementId, RelationId, User, UserId};
use crate::timefmt::format_timestamp;

/// Discriminator of a [`MovementUserRelation`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The user is a member of the movement.
    Subscription,
    /// The user created the movement.
    Creation,
}

impl RelationKind {
    /// The stored discriminator string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Creation => "creation",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (possibly ended) relation between a user and a movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementUserRelation {
    /// Store-assigned id.
    pub id: RelationId,
    /// Discriminator.
    pub kind: RelationKind,
    /// The related user.
    pub user_id: UserId,
    /// The related movement.
    pub movement_id: MovementId,
    /// Set on construction.
    pub time_added: DateTime<Utc>,
    /// Non-null once the relation has ended. The row is never deleted.
    pub time_removed: Option<DateTime<Utc>>,
}

impl MovementUserRelation {
    /// True when the relation has ended.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.time_removed.is_some()
    }

    /// Ends the relation. Ending twice keeps the first timestamp.
    pub fn end(&mut self, now: DateTime<Utc>) {
        if self.time_removed.is_none() {
            self.time_removed = Some(now);
        }
    }

    /// JSON projection of a subscription row.
    #[must_use]
    pub fn subscription_json(&self, user: &User, movement: &Movement) -> Value {
        json!({
            "movement": movement.to_json(),
            "user": user.to_json(false),
            "time_started": format_timestamp(self.time_added),
            "time_ended": self.time_removed.map(format_timestamp),
            "subscribed": !self.has_ended(),
        })
    }

    /// JSON projection of a creation row.
    #[must_use]
    pub fn creation_json(&self, user: &User, movement: &Movement) -> Value {
        json!({
            "movement": movement.to_json(),
            "user": user.to_json(false),
            "time_started": format_timestamp(self.time_added),
            "created": !self.has_ended(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn relation(kind: RelationKind) -> MovementUserRelation {
        MovementUserRelation {
            id: RelationId::from(1),
            kind,
            user_id: UserId::from(2),
            movement_id: MovementId::from(3),
            time_added: Utc.with_ymd_and_hms(2023, 2, 25, 16, 30, 0).unwrap(),
            time_removed: None,
        }
    }

    #[test]
    fn test_end_is_sticky() {
        let mut rel = relation(RelationKind::Subscription);
        assert!(!rel.has_ended());

        let first = rel.time_added + Duration::days(1);
        rel.end(first);
        assert!(rel.has_ended());
        assert_eq!(rel.time_removed, Some(first));

        // A second end must not overwrite the original timestamp.
        rel.end(first + Duration::days(1));
        assert_eq!(rel.time_removed, Some(first));
    }

    #[test]
    fn test_discriminator_strings() {
        assert_eq!(RelationKind::Subscription.to_string(), "subscription");
        assert_eq!(RelationKind::Creation.to_string(), "creation");
    }

    #[test]
    fn test_subscription_json() {
        let user = User {
            id: UserId::from(2),
            username: "pieter".to_string(),
            email: "pieter@gridt.org".to_string(),
            password_hash: String::new(),
            is_admin: false,
            bio: String::new(),
        };
        let movement = Movement {
            id: MovementId::from(3),
            name: "flossing".to_string(),
            interval: "daily".to_string(),
            short_description: String::new(),
            description: String::new(),
        };

        let rel = relation(RelationKind::Subscription);
        let value = rel.subscription_json(&user, &movement);
        assert_eq!(value["subscribed"], true);
        assert_eq!(value["time_started"], "2023-02-25 16:30:00+00:00");
        assert!(value["time_ended"].is_null());
        assert_eq!(value["movement"]["name"], "flossing");
        assert_eq!(value["user"]["username"], "pieter");
    }
}
