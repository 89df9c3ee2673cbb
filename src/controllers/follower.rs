//! Follower-side graph maintenance.
//!
//! These routines keep the peer graph of every movement healthy: new
//! subscribers are wired to up to four leaders, leavers have all their
//! edges destroyed and the holes repaired, and an unsuitable leader can be
//! swapped for a random other candidate.
//!
//! The wiring routines read a candidate set and then insert edges; both
//! halves run inside one exclusive session so concurrent subscribers can
//! never observe the same snapshot and over-wire a leader.

use serde_json::{json, Value};

use crate::clock::Clock;
use crate::engine::Gridt;
use crate::error::{DomainError, GridtResult};
use crate::models::{LinkId, MovementId, UserId};
use crate::rng::{choose_from, RandomSource};
use crate::storage::{Database, Session};
use crate::timefmt::format_timestamp;

use super::leader;

/// Users who could become a follower of `user_id` in this movement:
/// actively subscribed, not the user themselves, not already following
/// them, and currently short of the fan-out target.
pub(crate) fn possible_followers(
    session: &Session<'_>,
    user_id: UserId,
    movement_id: MovementId,
    fanout_target: usize,
) -> Vec<UserId> {
    session
        .active_subscriber_ids(movement_id)
        .into_iter()
        .filter(|candidate| {
            *candidate != user_id
                && session.active_link(*candidate, user_id, movement_id).is_none()
                && session.current_leaders(*candidate, movement_id).len() < fanout_target
        })
        .collect()
}

/// Wires a fresh subscriber to up to `fanout_target` distinct leaders,
/// picking uniformly at random from the candidate set on each step.
pub(crate) fn add_initial_leaders(
    db: &Database,
    clock: &dyn Clock,
    rng: &dyn RandomSource,
    fanout_target: usize,
    follower_id: UserId,
    movement_id: MovementId,
) -> GridtResult<()> {
    db.write(|s| {
        s.user(follower_id)?;
        s.movement(movement_id)?;

        while s.current_leaders(follower_id, movement_id).len() < fanout_target {
            s.check_deadline()?;
            let candidates = leader::possible_leaders(s, follower_id, movement_id);
            let Some(&pick) = choose_from(rng, &candidates) else {
                break;
            };
            s.insert_link(follower_id, pick, movement_id, clock.now())?;
        }
        Ok(())
    })
}

/// Wires existing short-of-target subscribers to a fresh leader.
///
/// One snapshot pass: the candidate set is computed once, so a follower
/// reaching the target through this very loop still gets their edge.
pub(crate) fn add_initial_followers(
    db: &Database,
    clock: &dyn Clock,
    fanout_target: usize,
    leader_id: UserId,
    movement_id: MovementId,
) -> GridtResult<()> {
    db.write(|s| {
        s.user(leader_id)?;
        s.movement(movement_id)?;

        let candidates = possible_followers(s, leader_id, movement_id, fanout_target);
        let now = clock.now();
        for candidate in candidates {
            s.insert_link(candidate, leader_id, movement_id, now)?;
        }
        Ok(())
    })
}

/// Destroys every outgoing edge of a leaver, then repairs fan-in: each
/// former leader is offered one replacement follower when a candidate
/// exists.
pub(crate) fn remove_all_leaders(
    db: &Database,
    clock: &dyn Clock,
    rng: &dyn RandomSource,
    fanout_target: usize,
    follower_id: UserId,
    movement_id: MovementId,
) -> GridtResult<()> {
    // Destroy first and commit, so the repair pass sees the leaver gone.
    let former_leaders = db.write(|s| {
        let link_ids: Vec<LinkId> = s
            .active_links_from(follower_id, movement_id)
            .into_iter()
            .map(|link| link.id)
            .collect();

        let now = clock.now();
        let mut leaders = Vec::with_capacity(link_ids.len());
        for link_id in link_ids {
            let link = s.link_mut(link_id)?;
            link.destroy(now);
            leaders.push(link.leader_id);
        }
        Ok(leaders)
    })?;

    db.write(|s| {
        let now = clock.now();
        for leader_id in former_leaders {
            s.check_deadline()?;
            let candidates = possible_followers(s, leader_id, movement_id, fanout_target);
            if let Some(&new_follower) = choose_from(rng, &candidates) {
                s.insert_link(new_follower, leader_id, movement_id, now)?;
            }
        }
        Ok(())
    })
}

/// Destroys every incoming edge of a leaver, then repairs fan-out: each
/// former follower is offered one replacement leader when a candidate
/// exists. Followers without a replacement simply run short until a later
/// wiring pass.
pub(crate) fn remove_all_followers(
    db: &Database,
    clock: &dyn Clock,
    rng: &dyn RandomSource,
    leader_id: UserId,
    movement_id: MovementId,
) -> GridtResult<()> {
    let former_followers = db.write(|s| {
        let link_ids: Vec<LinkId> = s
            .active_links_to(leader_id, movement_id)
            .into_iter()
            .map(|link| link.id)
            .collect();

        let now = clock.now();
        let mut followers = Vec::with_capacity(link_ids.len());
        for link_id in link_ids {
            let link = s.link_mut(link_id)?;
            link.destroy(now);
            followers.push(link.follower_id);
        }
        Ok(followers)
    })?;

    db.write(|s| {
        let now = clock.now();
        for follower_id in former_followers {
            s.check_deadline()?;
            let candidates: Vec<UserId> = leader::possible_leaders(s, follower_id, movement_id)
                .into_iter()
                .filter(|candidate| *candidate != leader_id)
                .collect();
            if let Some(&new_leader) = choose_from(rng, &candidates) {
                s.insert_link(follower_id, new_leader, movement_id, now)?;
            }
        }
        Ok(())
    })
}

impl Gridt {
    /// The distinct leaders a follower currently observes in a movement.
    pub fn get_leaders(
        &self,
        follower_id: UserId,
        movement_id: MovementId,
    ) -> GridtResult<Vec<UserId>> {
        self.db().read(|s| {
            s.user(follower_id)?;
            s.movement(movement_id)?;
            Ok(s.current_leaders(follower_id, movement_id)
                .into_iter()
                .collect())
        })
    }

    /// The candidate followers for a user in a movement.
    pub fn possible_followers(
        &self,
        user_id: UserId,
        movement_id: MovementId,
    ) -> GridtResult<Vec<UserId>> {
        self.db().read(|s| {
            s.user(user_id)?;
            s.movement(movement_id)?;
            Ok(possible_followers(
                s,
                user_id,
                movement_id,
                self.config().fanout_target,
            ))
        })
    }

    /// True when an active link (follower → leader) exists in the movement.
    pub fn follows_leader(
        &self,
        follower_id: UserId,
        movement_id: MovementId,
        leader_id: UserId,
    ) -> GridtResult<bool> {
        self.db().read(|s| {
            Ok(s.active_link(follower_id, leader_id, movement_id).is_some())
        })
    }

    /// A leader's profile plus their recent message history, for a
    /// follower that observes them.
    pub fn get_leader(
        &self,
        follower_id: UserId,
        movement_id: MovementId,
        leader_id: UserId,
    ) -> GridtResult<Value> {
        self.db().read(|s| {
            if s.active_link(follower_id, leader_id, movement_id).is_none() {
                return Err(DomainError::NotFollowing {
                    follower_id,
                    leader_id,
                    movement_id,
                }
                .into());
            }

            let mut response = s.user(leader_id)?.to_json(false);
            let history: Vec<Value> = s
                .signals_of(leader_id, movement_id)
                .into_iter()
                .take(self.config().message_history_depth)
                .map(|signal| signal.to_json())
                .collect();
            response["message_history"] = Value::Array(history);
            Ok(response)
        })
    }

    /// Swaps one leader of a follower for a random other candidate.
    ///
    /// Returns `Ok(None)`, a successful non-change, when the movement
    /// offers no replacement candidate; the existing link stays intact.
    pub fn swap_leader(
        &self,
        follower_id: UserId,
        movement_id: MovementId,
        leader_id: UserId,
    ) -> GridtResult<Option<Value>> {
        self.db().write_with_deadline(self.deadline(), |s| {
            s.user(follower_id)?;
            s.user(leader_id)?;
            s.movement(movement_id)?;

            // Without a replacement there is nothing to swap to.
            let candidates = leader::possible_leaders(s, follower_id, movement_id);
            let Some(&new_leader_id) = choose_from(self.rng(), &candidates) else {
                return Ok(None);
            };

            let link_id = s
                .active_link(follower_id, leader_id, movement_id)
                .map(|link| link.id)
                .ok_or(DomainError::NotFollowing {
                    follower_id,
                    leader_id,
                    movement_id,
                })?;

            let now = self.now();
            s.link_mut(link_id)?.destroy(now);
            s.insert_link(follower_id, new_leader_id, movement_id, now)?;

            let mut response = s.user(new_leader_id)?.to_json(false);
            if let Some(signal) = s.last_signal(new_leader_id, movement_id) {
                response["last_signal"] = json!({
                    "time_stamp": format_timestamp(signal.time_stamp),
                    "message": signal.message.clone(),
                });
            }
            Ok(Some(response))
        })
    }
}
