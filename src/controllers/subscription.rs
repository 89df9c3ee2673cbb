//! Subscription lifecycle.
//!
//! The graph-wiring side effects do not run inline: the subscription row is
//! committed first, then the bus delivers `onSubscribe`/`onUnsubscribe` and
//! the registered wiring hooks run in sessions of their own. A failed hook
//! is reported and isolated; the subscription itself stands.

use serde_json::Value;

use crate::engine::Gridt;
use crate::error::{DomainError, GridtResult, ValidationError};
use crate::events::EventKind;
use crate::models::{MovementId, RelationKind, UserId};
use crate::views::extend_movement_json;

impl Gridt {
    /// True when the user holds an active subscription to the movement.
    pub fn is_subscribed(&self, user_id: UserId, movement_id: MovementId) -> GridtResult<bool> {
        self.db().read(|s| Ok(s.is_subscribed(user_id, movement_id)))
    }

    /// Subscribes a user to a movement and returns the subscription JSON.
    ///
    /// Emits `onSubscribe` strictly after the commit; the wiring handlers
    /// (`add_initial_leaders`, `add_initial_followers`) run on that event.
    pub fn new_subscription(
        &self,
        user_id: UserId,
        movement_id: MovementId,
    ) -> GridtResult<Value> {
        let view = self.db().write_with_deadline(self.deadline(), |s| {
            let user = s.user(user_id)?.clone();
            let movement = s.movement(movement_id)?.clone();

            if s.is_subscribed(user_id, movement_id) {
                return Err(ValidationError::DuplicateRelation {
                    kind: RelationKind::Subscription.as_str(),
                    user_id,
                    movement_id,
                }
                .into());
            }

            let relation_id =
                s.insert_relation(RelationKind::Subscription, user_id, movement_id, self.now())?;
            Ok(s.relation(relation_id)?.subscription_json(&user, &movement))
        })?;

        self.bus().emit(EventKind::Subscribe, user_id, movement_id);
        Ok(view)
    }

    /// Ends the active subscription and returns its JSON.
    ///
    /// Emits `onUnsubscribe` after the commit; the handlers destroy the
    /// user's links and repair the graph around them.
    pub fn remove_subscription(
        &self,
        user_id: UserId,
        movement_id: MovementId,
    ) -> GridtResult<Value> {
        let view = self.db().write_with_deadline(self.deadline(), |s| {
            let relation_id = s
                .active_relation(RelationKind::Subscription, user_id, movement_id)
                .map(|relation| relation.id)
                .ok_or(DomainError::SubscriptionNotFound {
                    user_id,
                    movement_id,
                })?;

            let user = s.user(user_id)?.clone();
            let movement = s.movement(movement_id)?.clone();
            let now = self.now();

            let relation = s.relation_mut(relation_id)?;
            relation.end(now);
            Ok(relation.subscription_json(&user, &movement))
        })?;

        self.bus().emit(EventKind::Unsubscribe, user_id, movement_id);
        Ok(view)
    }

    /// All active subscribers of a movement, as user JSON.
    pub fn get_subscribers(&self, movement_id: MovementId) -> GridtResult<Vec<Value>> {
        self.db().read(|s| {
            s.movement(movement_id)?;
            let mut subscribers = Vec::new();
            for user_id in s.active_subscriber_ids(movement_id) {
                subscribers.push(s.user(user_id)?.to_json(false));
            }
            Ok(subscribers)
        })
    }

    /// All movements the user is subscribed to, as composed movement views.
    pub fn get_subscriptions(&self, user_id: UserId) -> GridtResult<Vec<Value>> {
        self.db().read(|s| {
            s.user(user_id)?;
            let mut views = Vec::new();
            for relation in s.active_subscriptions_of(user_id) {
                let movement = s.movement(relation.movement_id)?;
                views.push(extend_movement_json(s, movement, user_id)?);
            }
            Ok(views)
        })
    }
}
