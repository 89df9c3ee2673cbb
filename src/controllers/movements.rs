//! The movement registry.

use serde_json::Value;

use crate::engine::Gridt;
use crate::error::{DomainError, GridtResult, ValidationError};
use crate::models::{MovementId, UserId};
use crate::views::extend_movement_json;

pub(crate) const NAME_MAX_LEN: usize = 50;
pub(crate) const INTERVAL_MAX_LEN: usize = 20;
pub(crate) const SHORT_DESCRIPTION_MAX_LEN: usize = 100;
pub(crate) const DESCRIPTION_MAX_LEN: usize = 1000;

/// Column-length and presence checks shared by both creation paths.
pub(crate) fn validate_movement_fields(
    name: &str,
    interval: &str,
    short_description: &str,
    description: &str,
) -> GridtResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "name" }.into());
    }
    if interval.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "interval" }.into());
    }

    let limits = [
        ("name", name, NAME_MAX_LEN),
        ("interval", interval, INTERVAL_MAX_LEN),
        ("short_description", short_description, SHORT_DESCRIPTION_MAX_LEN),
        ("description", description, DESCRIPTION_MAX_LEN),
    ];
    for (field, value, max_length) in limits {
        if value.chars().count() > max_length {
            return Err(ValidationError::FieldTooLong { field, max_length }.into());
        }
    }
    Ok(())
}

impl Gridt {
    /// Creates a movement and returns its JSON.
    ///
    /// Duplicate names are allowed here; callers wanting uniqueness probe
    /// [`Gridt::movement_name_exists`] first.
    pub fn create_movement(
        &self,
        name: &str,
        interval: &str,
        short_description: Option<&str>,
        description: Option<&str>,
    ) -> GridtResult<Value> {
        let short_description = short_description.unwrap_or_default();
        let description = description.unwrap_or_default();
        validate_movement_fields(name, interval, short_description, description)?;

        self.db().write_with_deadline(self.deadline(), |s| {
            let movement_id = s.insert_movement(name, interval, short_description, description)?;
            Ok(s.movement(movement_id)?.to_json())
        })
    }

    /// True when a movement with this exact name exists.
    pub fn movement_name_exists(&self, name: &str) -> GridtResult<bool> {
        self.db().read(|s| Ok(s.movement_by_name(name).is_some()))
    }

    /// True when a movement with this id exists.
    pub fn movement_exists(&self, movement_id: MovementId) -> GridtResult<bool> {
        self.db().read(|s| Ok(s.try_movement(movement_id).is_some()))
    }

    /// The composed movement view for a viewer, addressed by id or name.
    pub fn get_movement(&self, identifier: &str, user_id: UserId) -> GridtResult<Value> {
        self.db().read(|s| {
            s.user(user_id)?;
            let movement = match identifier.parse::<i64>() {
                Ok(raw) => s.try_movement(MovementId::from(raw)),
                Err(_) => s.movement_by_name(identifier),
            }
            .ok_or_else(|| DomainError::MovementNotFound {
                identifier: identifier.to_string(),
            })?;
            extend_movement_json(s, movement, user_id)
        })
    }

    /// The composed movement view for a viewer, by id.
    pub fn get_movement_by_id(
        &self,
        movement_id: MovementId,
        user_id: UserId,
    ) -> GridtResult<Value> {
        self.db().read(|s| {
            s.user(user_id)?;
            let movement = s.movement(movement_id)?;
            extend_movement_json(s, movement, user_id)
        })
    }

    /// Composed views of every movement, for one viewer.
    pub fn get_all_movements(&self, user_id: UserId) -> GridtResult<Vec<Value>> {
        self.db().read(|s| {
            s.user(user_id)?;
            let mut views = Vec::new();
            for movement in s.movements() {
                views.push(extend_movement_json(s, movement, user_id)?);
            }
            Ok(views)
        })
    }
}
