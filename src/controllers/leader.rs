//! Leader-side operations: candidate queries and the signal service.

use serde_json::Value;

use crate::engine::Gridt;
use crate::error::{DomainError, GridtResult, ValidationError};
use crate::models::{MovementId, UserId, MESSAGE_MAX_LEN};
use crate::storage::Session;

/// Users who could become a leader of `user_id` in this movement: actively
/// subscribed, not the user themselves, and not already one of their
/// leaders. Grouped by user, so no duplicates.
pub(crate) fn possible_leaders(
    session: &Session<'_>,
    user_id: UserId,
    movement_id: MovementId,
) -> Vec<UserId> {
    let current = session.current_leaders(user_id, movement_id);
    session
        .active_subscriber_ids(movement_id)
        .into_iter()
        .filter(|candidate| *candidate != user_id && !current.contains(candidate))
        .collect()
}

impl Gridt {
    /// The candidate leaders for a user in a movement.
    pub fn possible_leaders(
        &self,
        user_id: UserId,
        movement_id: MovementId,
    ) -> GridtResult<Vec<UserId>> {
        self.db().read(|s| {
            s.user(user_id)?;
            s.movement(movement_id)?;
            Ok(possible_leaders(s, user_id, movement_id))
        })
    }

    /// Sends a signal as a leader in a movement, optionally with a message.
    ///
    /// The leader must hold an *active* subscription at send time.
    pub fn send_signal(
        &self,
        leader_id: UserId,
        movement_id: MovementId,
        message: Option<&str>,
    ) -> GridtResult<()> {
        if let Some(message) = message {
            if message.chars().count() > MESSAGE_MAX_LEN {
                return Err(ValidationError::FieldTooLong {
                    field: "message",
                    max_length: MESSAGE_MAX_LEN,
                }
                .into());
            }
        }

        self.db().write_with_deadline(self.deadline(), |s| {
            s.user(leader_id)?;
            s.movement(movement_id)?;
            if !s.is_subscribed(leader_id, movement_id) {
                return Err(DomainError::NotSubscribed {
                    user_id: leader_id,
                    movement_id,
                }
                .into());
            }
            s.insert_signal(
                leader_id,
                movement_id,
                message.map(str::to_string),
                self.now(),
            )?;
            Ok(())
        })
    }

    /// The newest signal of a leader in a movement, as JSON.
    pub fn get_last_signal(
        &self,
        leader_id: UserId,
        movement_id: MovementId,
    ) -> GridtResult<Option<Value>> {
        self.db().read(|s| {
            s.user(leader_id)?;
            s.movement(movement_id)?;
            Ok(s.last_signal(leader_id, movement_id).map(|sig| sig.to_json()))
        })
    }

    /// The newest `depth` signals of a leader in a movement, newest first.
    pub fn get_signal_history(
        &self,
        leader_id: UserId,
        movement_id: MovementId,
        depth: usize,
    ) -> GridtResult<Vec<Value>> {
        self.db().read(|s| {
            s.user(leader_id)?;
            s.movement(movement_id)?;
            Ok(s.signals_of(leader_id, movement_id)
                .into_iter()
                .take(depth)
                .map(|sig| sig.to_json())
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::models::RelationKind;
    use crate::storage::Database;

    fn database() -> (Database, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_ymd_hms(2023, 2, 25, 16, 30, 0));
        (Database::in_memory(clock.clone()), clock)
    }

    #[test]
    fn test_possible_leaders_excludes_self_and_current() {
        let (db, clock) = database();
        db.write(|s| {
            let now = clock.now();
            let movement = s.insert_movement("flossing", "daily", "", "")?;
            let mut users = Vec::new();
            for i in 0..4 {
                let id = s.insert_user(
                    &format!("user{i}"),
                    &format!("user{i}@gridt.org"),
                    String::new(),
                    false,
                    "",
                )?;
                s.insert_relation(RelationKind::Subscription, id, movement, now)?;
                users.push(id);
            }
            s.insert_link(users[0], users[1], movement, now)?;

            let candidates: BTreeSet<UserId> =
                possible_leaders(s, users[0], movement).into_iter().collect();
            assert_eq!(candidates, users[2..].iter().copied().collect());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_possible_leaders_ignores_ended_subscriptions() {
        let (db, clock) = database();
        db.write(|s| {
            let now = clock.now();
            let movement = s.insert_movement("flossing", "daily", "", "")?;
            let a = s.insert_user("a", "a@gridt.org", String::new(), false, "")?;
            let b = s.insert_user("b", "b@gridt.org", String::new(), false, "")?;

            s.insert_relation(RelationKind::Subscription, a, movement, now)?;
            let ended = s.insert_relation(RelationKind::Subscription, b, movement, now)?;
            s.relation_mut(ended)?.end(now);

            assert!(possible_leaders(s, a, movement).is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_possible_leaders_has_no_duplicates_per_user() {
        let (db, clock) = database();
        db.write(|s| {
            let now = clock.now();
            let movement = s.insert_movement("flossing", "daily", "", "")?;
            let a = s.insert_user("a", "a@gridt.org", String::new(), false, "")?;
            let b = s.insert_user("b", "b@gridt.org", String::new(), false, "")?;
            s.insert_relation(RelationKind::Subscription, a, movement, now)?;

            // A resubscribed candidate still shows up exactly once.
            let first = s.insert_relation(RelationKind::Subscription, b, movement, now)?;
            s.relation_mut(first)?.end(now);
            s.insert_relation(RelationKind::Subscription, b, movement, now)?;

            assert_eq!(possible_leaders(s, a, movement), vec![b]);
            Ok(())
        })
        .unwrap();
    }
}
