//! The directed follower→leader edge of the peer graph.

use std::fmt;

use chrono::{DateTime, Utc};

use super::{LinkId, MovementId, UserId};

/// An edge from a follower to a leader inside one movement.
///
/// Links are never deleted; a destroyed link stays queryable as history.
/// Every link carries a concrete leader; a follower with no leaders is
/// simply a follower with no active links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserToUserLink {
    /// Store-assigned id.
    pub id: LinkId,
    /// The observing user.
    pub follower_id: UserId,
    /// The observed user.
    pub leader_id: UserId,
    /// The movement the edge lives in.
    pub movement_id: MovementId,
    /// Set on construction.
    pub created: DateTime<Utc>,
    /// Non-null once the edge is retired.
    pub destroyed: Option<DateTime<Utc>>,
}

impl UserToUserLink {
    /// True while the edge participates in the graph.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.destroyed.is_none()
    }

    /// Retires the edge. Destroying twice keeps the first timestamp.
    pub fn destroy(&mut self, now: DateTime<Utc>) {
        if self.destroyed.is_none() {
            self.destroyed = Some(now);
        }
    }
}

impl fmt::Display for UserToUserLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_active() { "" } else { "X" };
        write!(
            f,
            "<Link id={} movement={} {}{}->{}>",
            self.id, self.movement_id, self.follower_id, marker, self.leader_id
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_destroy_is_sticky() {
        let created = Utc.with_ymd_and_hms(2023, 2, 25, 16, 30, 0).unwrap();
        let mut link = UserToUserLink {
            id: LinkId::from(1),
            follower_id: UserId::from(2),
            leader_id: UserId::from(3),
            movement_id: MovementId::from(4),
            created,
            destroyed: None,
        };
        assert!(link.is_active());

        let first = created + Duration::hours(1);
        link.destroy(first);
        assert!(!link.is_active());
        assert_eq!(link.destroyed, Some(first));

        link.destroy(first + Duration::hours(1));
        assert_eq!(link.destroyed, Some(first));
    }

    #[test]
    fn test_display_marks_destroyed_edges() {
        let created = Utc.with_ymd_and_hms(2023, 2, 25, 16, 30, 0).unwrap();
        let mut link = UserToUserLink {
            id: LinkId::from(1),
            follower_id: UserId::from(2),
            leader_id: UserId::from(3),
            movement_id: MovementId::from(4),
            created,
            destroyed: None,
        };
        assert_eq!(link.to_string(), "<Link id=1 movement=4 2->3>");
        link.destroy(created);
        assert_eq!(link.to_string(), "<Link id=1 movement=4 2X->3>");
    }
}
