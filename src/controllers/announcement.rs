//! Movement-wide announcements.
//!
//! Every mutation is admin-gated. Posting rights are role-based, not
//! ownership-based: any administrator may update or delete any
//! announcement.

use serde_json::Value;

use crate::engine::Gridt;
use crate::error::{DomainError, GridtResult, ValidationError};
use crate::models::{AnnouncementId, MovementId, UserId, MESSAGE_MAX_LEN};
use crate::storage::Session;

fn validate_message(message: &str) -> GridtResult<()> {
    if message.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "message" }.into());
    }
    if message.chars().count() > MESSAGE_MAX_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "message",
            max_length: MESSAGE_MAX_LEN,
        }
        .into());
    }
    Ok(())
}

fn ensure_admin(session: &Session<'_>, user_id: UserId) -> GridtResult<()> {
    if session.user(user_id)?.is_admin {
        Ok(())
    } else {
        Err(DomainError::UserNotAdmin { user_id }.into())
    }
}

impl Gridt {
    /// Posts an announcement to a movement.
    pub fn create_announcement(
        &self,
        message: &str,
        movement_id: MovementId,
        user_id: UserId,
    ) -> GridtResult<Value> {
        validate_message(message)?;

        self.db().write_with_deadline(self.deadline(), |s| {
            ensure_admin(s, user_id)?;
            s.movement(movement_id)?;

            let announcement_id =
                s.insert_announcement(movement_id, user_id, message, self.now())?;
            let announcement = s
                .try_announcement(announcement_id)
                .ok_or(DomainError::AnnouncementNotFound {
                    id: announcement_id,
                })?;
            Ok(announcement.to_json(s.user(user_id)?))
        })
    }

    /// Replaces an announcement's message and stamps `updated_time`.
    pub fn update_announcement(
        &self,
        message: &str,
        announcement_id: AnnouncementId,
        user_id: UserId,
    ) -> GridtResult<Value> {
        validate_message(message)?;

        self.db().write_with_deadline(self.deadline(), |s| {
            ensure_admin(s, user_id)?;

            match s.try_announcement(announcement_id) {
                Some(announcement) if announcement.is_active() => {}
                _ => {
                    return Err(DomainError::AnnouncementNotFound {
                        id: announcement_id,
                    }
                    .into())
                }
            }

            let now = self.now();
            let announcement = s.announcement_mut(announcement_id)?;
            announcement.update_message(message.to_string(), now);

            let poster_id = announcement.poster_id;
            let json = s
                .try_announcement(announcement_id)
                .ok_or(DomainError::AnnouncementNotFound {
                    id: announcement_id,
                })?
                .to_json(s.user(poster_id)?);
            Ok(json)
        })
    }

    /// Soft-deletes an announcement; the row remains.
    pub fn delete_announcement(
        &self,
        announcement_id: AnnouncementId,
        user_id: UserId,
    ) -> GridtResult<Value> {
        self.db().write_with_deadline(self.deadline(), |s| {
            ensure_admin(s, user_id)?;

            if s.try_announcement(announcement_id).is_none() {
                return Err(DomainError::AnnouncementNotFound {
                    id: announcement_id,
                }
                .into());
            }

            let now = self.now();
            let announcement = s.announcement_mut(announcement_id)?;
            announcement.remove(now);

            let poster_id = announcement.poster_id;
            let json = s
                .try_announcement(announcement_id)
                .ok_or(DomainError::AnnouncementNotFound {
                    id: announcement_id,
                })?
                .to_json(s.user(poster_id)?);
            Ok(json)
        })
    }

    /// Active announcements of a movement, newest first.
    pub fn get_announcements(&self, movement_id: MovementId) -> GridtResult<Vec<Value>> {
        self.db().read(|s| {
            s.movement(movement_id)?;
            let mut announcements = Vec::new();
            for announcement in s.active_announcements_of(movement_id) {
                announcements.push(announcement.to_json(s.user(announcement.poster_id)?));
            }
            Ok(announcements)
        })
    }
}
