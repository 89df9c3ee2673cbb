//! The creation relation: which admin created which movement.

use serde_json::Value;

use crate::engine::Gridt;
use crate::error::{DomainError, GridtResult};
use crate::events::EventKind;
use crate::models::{MovementId, RelationKind, UserId};

use super::movements::validate_movement_fields;

impl Gridt {
    /// True when the user holds the active creation relation for the
    /// movement.
    pub fn is_creator(&self, user_id: UserId, movement_id: MovementId) -> GridtResult<bool> {
        self.db().read(|s| {
            Ok(s
                .active_relation(RelationKind::Creation, user_id, movement_id)
                .is_some())
        })
    }

    /// Creates a movement on behalf of an administrator, recording the
    /// creation relation and (by default) subscribing the creator.
    ///
    /// Emits `onCreation` after the commit. The auto-subscription goes
    /// through [`Gridt::new_subscription`] and therefore fires the graph
    /// hooks like any other subscribe.
    pub fn new_movement_by_user(
        &self,
        user_id: UserId,
        name: &str,
        interval: &str,
        short_description: Option<&str>,
        description: Option<&str>,
        auto_subscribe: bool,
    ) -> GridtResult<Value> {
        let short_description = short_description.unwrap_or_default();
        let description = description.unwrap_or_default();
        validate_movement_fields(name, interval, short_description, description)?;

        let (movement_id, creation_json) =
            self.db().write_with_deadline(self.deadline(), |s| {
                let user = s.user(user_id)?.clone();
                if !user.is_admin {
                    return Err(DomainError::UserNotAdmin { user_id }.into());
                }

                let movement_id =
                    s.insert_movement(name, interval, short_description, description)?;
                let movement = s.movement(movement_id)?.clone();

                let relation_id =
                    s.insert_relation(RelationKind::Creation, user_id, movement_id, self.now())?;
                let creation_json = s.relation(relation_id)?.creation_json(&user, &movement);
                Ok((movement_id, creation_json))
            })?;

        self.bus().emit(EventKind::Creation, user_id, movement_id);

        if auto_subscribe {
            self.new_subscription(user_id, movement_id)?;
        }

        Ok(creation_json)
    }

    /// Ends the creation relation. The movement itself persists.
    ///
    /// Emits `onRemoveCreation` after the commit.
    pub fn remove_creation(
        &self,
        user_id: UserId,
        movement_id: MovementId,
    ) -> GridtResult<Value> {
        let view = self.db().write_with_deadline(self.deadline(), |s| {
            let relation_id = s
                .active_relation(RelationKind::Creation, user_id, movement_id)
                .map(|relation| relation.id)
                .ok_or(DomainError::UserIsNotCreator {
                    user_id,
                    movement_id,
                })?;

            let user = s.user(user_id)?.clone();
            let movement = s.movement(movement_id)?.clone();
            let now = self.now();

            let relation = s.relation_mut(relation_id)?;
            relation.end(now);
            Ok(relation.creation_json(&user, &movement))
        })?;

        self.bus().emit(EventKind::RemoveCreation, user_id, movement_id);
        Ok(view)
    }
}
