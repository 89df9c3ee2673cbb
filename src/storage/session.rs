//! An exclusive session over the row set.
//!
//! The query helpers mirror the relational queries the controllers need:
//! "active" always means the relevant end column (`time_removed`,
//! `destroyed`, `removed_time`) is null.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::DbState;
use crate::clock::Clock;
use crate::error::{DomainError, GridtResult, StorageError};
use crate::models::{
    Announcement, AnnouncementId, LinkId, Movement, MovementId, MovementUserRelation,
    RelationId, RelationKind, Signal, SignalId, User, UserId, UserToUserLink,
};

/// A scoped handle on the store. See [`super::Database::write`].
pub struct Session<'a> {
    state: &'a mut DbState,
    clock: &'a dyn Clock,
    deadline: Option<DateTime<Utc>>,
}

impl<'a> Session<'a> {
    pub(super) fn new(
        state: &'a mut DbState,
        clock: &'a dyn Clock,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            state,
            clock,
            deadline,
        }
    }

    /// Fails with [`DomainError::Timeout`] once the session deadline has
    /// passed. Long-running loops call this between iterations.
    pub fn check_deadline(&self) -> GridtResult<()> {
        if let Some(deadline) = self.deadline {
            if self.clock.now() > deadline {
                return Err(DomainError::Timeout { deadline }.into());
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // users
    // ------------------------------------------------------------------

    /// Looks up a user, failing with [`DomainError::UserNotFound`].
    pub fn user(&self, id: UserId) -> GridtResult<&User> {
        self.state
            .users
            .get(&id)
            .ok_or_else(|| DomainError::UserNotFound { id }.into())
    }

    /// Looks up a user by id.
    #[must_use]
    pub fn try_user(&self, id: UserId) -> Option<&User> {
        self.state.users.get(&id)
    }

    /// Looks up a user by email (exact match).
    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.state.users.values().find(|u| u.email == email)
    }

    /// Inserts a user, enforcing email uniqueness.
    pub fn insert_user(
        &mut self,
        username: &str,
        email: &str,
        password_hash: String,
        is_admin: bool,
        bio: &str,
    ) -> GridtResult<UserId> {
        if self.user_by_email(email).is_some() {
            return Err(StorageError::Duplicate {
                constraint: "users.email",
            }
            .into());
        }

        self.state.next_user += 1;
        let id = UserId::from(self.state.next_user);
        self.state.users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                is_admin,
                bio: bio.to_string(),
            },
        );
        Ok(id)
    }

    /// Mutable access to a user row.
    pub fn user_mut(&mut self, id: UserId) -> GridtResult<&mut User> {
        self.state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::UserNotFound { id }.into())
    }

    // ------------------------------------------------------------------
    // movements
    // ------------------------------------------------------------------

    /// Looks up a movement, failing with [`DomainError::MovementNotFound`].
    pub fn movement(&self, id: MovementId) -> GridtResult<&Movement> {
        self.state.movements.get(&id).ok_or_else(|| {
            DomainError::MovementNotFound {
                identifier: id.to_string(),
            }
            .into()
        })
    }

    /// Looks up a movement by id.
    #[must_use]
    pub fn try_movement(&self, id: MovementId) -> Option<&Movement> {
        self.state.movements.get(&id)
    }

    /// Finds the first movement with this exact name.
    #[must_use]
    pub fn movement_by_name(&self, name: &str) -> Option<&Movement> {
        self.state.movements.values().find(|m| m.name == name)
    }

    /// All movements, in id order.
    #[must_use]
    pub fn movements(&self) -> Vec<&Movement> {
        self.state.movements.values().collect()
    }

    /// Inserts a movement.
    pub fn insert_movement(
        &mut self,
        name: &str,
        interval: &str,
        short_description: &str,
        description: &str,
    ) -> GridtResult<MovementId> {
        self.state.next_movement += 1;
        let id = MovementId::from(self.state.next_movement);
        self.state.movements.insert(
            id,
            Movement {
                id,
                name: name.to_string(),
                interval: interval.to_string(),
                short_description: short_description.to_string(),
                description: description.to_string(),
            },
        );
        Ok(id)
    }

    // ------------------------------------------------------------------
    // movement-user relations (subscriptions, creations)
    // ------------------------------------------------------------------

    /// The active relation of this kind between user and movement, if any.
    #[must_use]
    pub fn active_relation(
        &self,
        kind: RelationKind,
        user_id: UserId,
        movement_id: MovementId,
    ) -> Option<&MovementUserRelation> {
        self.state.relations.values().find(|r| {
            r.kind == kind
                && r.user_id == user_id
                && r.movement_id == movement_id
                && !r.has_ended()
        })
    }

    /// True when the user holds an active subscription to the movement.
    #[must_use]
    pub fn is_subscribed(&self, user_id: UserId, movement_id: MovementId) -> bool {
        self.active_relation(RelationKind::Subscription, user_id, movement_id)
            .is_some()
    }

    /// Distinct users with an active subscription to the movement, in id
    /// order.
    #[must_use]
    pub fn active_subscriber_ids(&self, movement_id: MovementId) -> Vec<UserId> {
        let set: BTreeSet<UserId> = self
            .state
            .relations
            .values()
            .filter(|r| {
                r.kind == RelationKind::Subscription
                    && r.movement_id == movement_id
                    && !r.has_ended()
            })
            .map(|r| r.user_id)
            .collect();
        set.into_iter().collect()
    }

    /// Active subscriptions of one user, in id order.
    #[must_use]
    pub fn active_subscriptions_of(&self, user_id: UserId) -> Vec<&MovementUserRelation> {
        self.state
            .relations
            .values()
            .filter(|r| {
                r.kind == RelationKind::Subscription && r.user_id == user_id && !r.has_ended()
            })
            .collect()
    }

    /// Inserts a relation row; enforces at most one active row per
    /// (kind, user, movement).
    pub fn insert_relation(
        &mut self,
        kind: RelationKind,
        user_id: UserId,
        movement_id: MovementId,
        now: DateTime<Utc>,
    ) -> GridtResult<RelationId> {
        if self.active_relation(kind, user_id, movement_id).is_some() {
            return Err(StorageError::Duplicate {
                constraint: "relations.kind_user_movement_active",
            }
            .into());
        }

        self.state.next_relation += 1;
        let id = RelationId::from(self.state.next_relation);
        self.state.relations.insert(
            id,
            MovementUserRelation {
                id,
                kind,
                user_id,
                movement_id,
                time_added: now,
                time_removed: None,
            },
        );
        Ok(id)
    }

    /// Looks up a relation row by id.
    pub fn relation(&self, id: RelationId) -> GridtResult<&MovementUserRelation> {
        self.state.relations.get(&id).ok_or_else(|| {
            StorageError::MissingRow {
                description: format!("relation {id}"),
            }
            .into()
        })
    }

    /// Mutable access to a relation row.
    pub fn relation_mut(&mut self, id: RelationId) -> GridtResult<&mut MovementUserRelation> {
        self.state.relations.get_mut(&id).ok_or_else(|| {
            StorageError::MissingRow {
                description: format!("relation {id}"),
            }
            .into()
        })
    }

    // ------------------------------------------------------------------
    // user-to-user links
    // ------------------------------------------------------------------

    /// Active out-edges of a follower in a movement, in id order.
    #[must_use]
    pub fn active_links_from(
        &self,
        follower_id: UserId,
        movement_id: MovementId,
    ) -> Vec<&UserToUserLink> {
        self.state
            .links
            .values()
            .filter(|l| {
                l.follower_id == follower_id && l.movement_id == movement_id && l.is_active()
            })
            .collect()
    }

    /// Active in-edges of a leader in a movement, in id order.
    #[must_use]
    pub fn active_links_to(
        &self,
        leader_id: UserId,
        movement_id: MovementId,
    ) -> Vec<&UserToUserLink> {
        self.state
            .links
            .values()
            .filter(|l| l.leader_id == leader_id && l.movement_id == movement_id && l.is_active())
            .collect()
    }

    /// The active edge for an exact (follower, leader, movement) triple.
    #[must_use]
    pub fn active_link(
        &self,
        follower_id: UserId,
        leader_id: UserId,
        movement_id: MovementId,
    ) -> Option<&UserToUserLink> {
        self.state.links.values().find(|l| {
            l.follower_id == follower_id
                && l.leader_id == leader_id
                && l.movement_id == movement_id
                && l.is_active()
        })
    }

    /// Every edge (active or destroyed) for an exact (follower, leader,
    /// movement) triple, in id order.
    #[must_use]
    pub fn links_between(
        &self,
        follower_id: UserId,
        leader_id: UserId,
        movement_id: MovementId,
    ) -> Vec<&UserToUserLink> {
        self.state
            .links
            .values()
            .filter(|l| {
                l.follower_id == follower_id
                    && l.leader_id == leader_id
                    && l.movement_id == movement_id
            })
            .collect()
    }

    /// Every active edge in a movement, in id order.
    #[must_use]
    pub fn active_links_in(&self, movement_id: MovementId) -> Vec<&UserToUserLink> {
        self.state
            .links
            .values()
            .filter(|l| l.movement_id == movement_id && l.is_active())
            .collect()
    }

    /// The distinct leaders a follower currently observes in a movement.
    #[must_use]
    pub fn current_leaders(&self, follower_id: UserId, movement_id: MovementId) -> BTreeSet<UserId> {
        self.active_links_from(follower_id, movement_id)
            .into_iter()
            .map(|l| l.leader_id)
            .collect()
    }

    /// Inserts an active edge; enforces no self-loops and at most one
    /// active edge per (follower, leader, movement) triple.
    pub fn insert_link(
        &mut self,
        follower_id: UserId,
        leader_id: UserId,
        movement_id: MovementId,
        now: DateTime<Utc>,
    ) -> GridtResult<LinkId> {
        if follower_id == leader_id {
            return Err(StorageError::CheckViolation {
                constraint: "links.follower_neq_leader",
            }
            .into());
        }
        if self
            .active_link(follower_id, leader_id, movement_id)
            .is_some()
        {
            return Err(StorageError::Duplicate {
                constraint: "links.follower_leader_movement_active",
            }
            .into());
        }

        self.state.next_link += 1;
        let id = LinkId::from(self.state.next_link);
        self.state.links.insert(
            id,
            UserToUserLink {
                id,
                follower_id,
                leader_id,
                movement_id,
                created: now,
                destroyed: None,
            },
        );
        Ok(id)
    }

    /// Mutable access to a link row.
    pub fn link_mut(&mut self, id: LinkId) -> GridtResult<&mut UserToUserLink> {
        self.state.links.get_mut(&id).ok_or_else(|| {
            StorageError::MissingRow {
                description: format!("link {id}"),
            }
            .into()
        })
    }

    // ------------------------------------------------------------------
    // signals
    // ------------------------------------------------------------------

    /// Signals of a leader in a movement, newest first.
    #[must_use]
    pub fn signals_of(&self, leader_id: UserId, movement_id: MovementId) -> Vec<&Signal> {
        let mut signals: Vec<&Signal> = self
            .state
            .signals
            .values()
            .filter(|s| s.leader_id == leader_id && s.movement_id == movement_id)
            .collect();
        signals.sort_by(|a, b| b.time_stamp.cmp(&a.time_stamp).then(b.id.cmp(&a.id)));
        signals
    }

    /// The newest signal of a leader in a movement.
    #[must_use]
    pub fn last_signal(&self, leader_id: UserId, movement_id: MovementId) -> Option<&Signal> {
        self.signals_of(leader_id, movement_id).into_iter().next()
    }

    /// Appends a signal.
    pub fn insert_signal(
        &mut self,
        leader_id: UserId,
        movement_id: MovementId,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> GridtResult<SignalId> {
        self.state.next_signal += 1;
        let id = SignalId::from(self.state.next_signal);
        self.state.signals.insert(
            id,
            Signal {
                id,
                leader_id,
                movement_id,
                time_stamp: now,
                message,
            },
        );
        Ok(id)
    }

    // ------------------------------------------------------------------
    // announcements
    // ------------------------------------------------------------------

    /// Looks up an announcement by id (active or removed).
    #[must_use]
    pub fn try_announcement(&self, id: AnnouncementId) -> Option<&Announcement> {
        self.state.announcements.get(&id)
    }

    /// Active announcements of a movement, newest first by `created_time`.
    #[must_use]
    pub fn active_announcements_of(&self, movement_id: MovementId) -> Vec<&Announcement> {
        let mut announcements: Vec<&Announcement> = self
            .state
            .announcements
            .values()
            .filter(|a| a.movement_id == movement_id && a.is_active())
            .collect();
        announcements.sort_by(|a, b| b.created_time.cmp(&a.created_time).then(b.id.cmp(&a.id)));
        announcements
    }

    /// The single latest active announcement of a movement.
    #[must_use]
    pub fn latest_announcement(&self, movement_id: MovementId) -> Option<&Announcement> {
        self.active_announcements_of(movement_id)
            .into_iter()
            .next()
    }

    /// Inserts an announcement.
    pub fn insert_announcement(
        &mut self,
        movement_id: MovementId,
        poster_id: UserId,
        message: &str,
        now: DateTime<Utc>,
    ) -> GridtResult<AnnouncementId> {
        self.state.next_announcement += 1;
        let id = AnnouncementId::from(self.state.next_announcement);
        self.state.announcements.insert(
            id,
            Announcement {
                id,
                movement_id,
                poster_id,
                message: message.to_string(),
                created_time: now,
                updated_time: None,
                removed_time: None,
            },
        );
        Ok(id)
    }

    /// Mutable access to an announcement row.
    pub fn announcement_mut(&mut self, id: AnnouncementId) -> GridtResult<&mut Announcement> {
        self.state
            .announcements
            .get_mut(&id)
            .ok_or_else(|| DomainError::AnnouncementNotFound { id }.into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::clock::FixedClock;
    use crate::error::GridtError;
    use crate::storage::Database;

    fn database() -> (Database, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_ymd_hms(2023, 2, 25, 16, 30, 0));
        (Database::in_memory(clock.clone()), clock)
    }

    #[test]
    fn test_email_uniqueness() {
        let (db, _) = database();
        db.write(|s| {
            s.insert_user("robin", "robin@gridt.org", String::new(), false, "")?;
            let err = s
                .insert_user("robin2", "robin@gridt.org", String::new(), false, "")
                .unwrap_err();
            assert!(matches!(
                err,
                GridtError::Storage(StorageError::Duplicate { .. })
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_single_active_relation_per_kind() {
        let (db, clock) = database();
        db.write(|s| {
            let user = s.insert_user("robin", "robin@gridt.org", String::new(), false, "")?;
            let movement = s.insert_movement("flossing", "daily", "", "")?;
            let now = clock.now();

            let first = s.insert_relation(RelationKind::Subscription, user, movement, now)?;
            // A second active subscription violates the constraint...
            assert!(s
                .insert_relation(RelationKind::Subscription, user, movement, now)
                .is_err());
            // ...but an active creation row is a different discriminator.
            s.insert_relation(RelationKind::Creation, user, movement, now)?;

            // Once ended, a fresh subscription may be opened.
            s.relation_mut(first)?.end(now);
            s.insert_relation(RelationKind::Subscription, user, movement, now)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_link_constraints() {
        let (db, clock) = database();
        db.write(|s| {
            let a = s.insert_user("a", "a@gridt.org", String::new(), false, "")?;
            let b = s.insert_user("b", "b@gridt.org", String::new(), false, "")?;
            let movement = s.insert_movement("flossing", "daily", "", "")?;
            let now = clock.now();

            assert!(s.insert_link(a, a, movement, now).is_err());

            let link = s.insert_link(a, b, movement, now)?;
            assert!(s.insert_link(a, b, movement, now).is_err());

            // After destroying, the triple may be relinked.
            s.link_mut(link)?.destroy(now);
            s.insert_link(a, b, movement, now)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_signals_order_newest_first() {
        let (db, clock) = database();
        db.write(|s| {
            let leader = s.insert_user("a", "a@gridt.org", String::new(), false, "")?;
            let movement = s.insert_movement("flossing", "daily", "", "")?;

            let t0 = clock.now();
            s.insert_signal(leader, movement, Some("first".to_string()), t0)?;
            s.insert_signal(leader, movement, Some("second".to_string()), t0 + Duration::days(1))?;

            let signals = s.signals_of(leader, movement);
            assert_eq!(signals.len(), 2);
            assert_eq!(signals[0].message.as_deref(), Some("second"));
            assert_eq!(signals[1].message.as_deref(), Some("first"));
            assert_eq!(
                s.last_signal(leader, movement).unwrap().message.as_deref(),
                Some("second")
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_active_announcements_skip_removed() {
        let (db, clock) = database();
        db.write(|s| {
            let admin = s.insert_user("a", "a@gridt.org", String::new(), true, "")?;
            let movement = s.insert_movement("flossing", "daily", "", "")?;
            let t0 = clock.now();

            let first = s.insert_announcement(movement, admin, "one", t0)?;
            s.insert_announcement(movement, admin, "two", t0 + Duration::minutes(1))?;

            assert_eq!(s.latest_announcement(movement).unwrap().message, "two");

            s.announcement_mut(first)?.remove(t0 + Duration::minutes(2));
            let active = s.active_announcements_of(movement);
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].message, "two");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_current_leaders_distinct() {
        let (db, clock) = database();
        db.write(|s| {
            let a = s.insert_user("a", "a@gridt.org", String::new(), false, "")?;
            let b = s.insert_user("b", "b@gridt.org", String::new(), false, "")?;
            let c = s.insert_user("c", "c@gridt.org", String::new(), false, "")?;
            let movement = s.insert_movement("flossing", "daily", "", "")?;
            let now = clock.now();

            s.insert_link(a, b, movement, now)?;
            s.insert_link(a, c, movement, now)?;
            let leaders = s.current_leaders(a, movement);
            assert_eq!(leaders.len(), 2);
            assert!(leaders.contains(&b));
            assert!(leaders.contains(&c));
            assert!(!leaders.contains(&a));
            Ok(())
        })
        .unwrap();
    }
}
