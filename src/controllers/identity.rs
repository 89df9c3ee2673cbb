//! User lifecycle and credential flows.
//!
//! The two request-* flows deliberately swallow "unknown email" and
//! "target email already registered": answering differently would let a
//! caller enumerate registered addresses. Both log the attempt instead.
//!
//! Notification mail is best-effort; a provider outage must not fail a
//! password change. Only where the send *is* the operation (the two
//! request-* flows) does a send failure surface.

use serde_json::Value;

use crate::email::templates;
use crate::engine::Gridt;
use crate::error::{DomainError, GridtResult, TokenError, ValidationError};
use crate::models::{hash_password, UserId};
use crate::token::{self, TokenClaims};

pub(crate) const USERNAME_MAX_LEN: usize = 32;
pub(crate) const EMAIL_MAX_LEN: usize = 40;

const SALT_LEN: usize = 16;

fn validate_email(email: &str) -> GridtResult<()> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "email" }.into());
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "email",
            max_length: EMAIL_MAX_LEN,
        }
        .into());
    }
    Ok(())
}

impl Gridt {
    /// Registers a user. Fails with [`ValidationError::EmailTaken`] when
    /// the address is already registered.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> GridtResult<UserId> {
        if username.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "username" }.into());
        }
        if username.chars().count() > USERNAME_MAX_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "username",
                max_length: USERNAME_MAX_LEN,
            }
            .into());
        }
        validate_email(email)?;

        let mut salt = [0u8; SALT_LEN];
        self.rng().fill(&mut salt);
        let password_hash = hash_password(password, &salt);

        self.db().write_with_deadline(self.deadline(), |s| {
            if s.user_by_email(email).is_some() {
                return Err(ValidationError::EmailTaken {
                    email: email.to_string(),
                }
                .into());
            }
            s.insert_user(username, email, password_hash.clone(), is_admin, "")
        })
    }

    /// True when a user with this id exists.
    pub fn user_exists(&self, user_id: UserId) -> GridtResult<bool> {
        self.db().read(|s| Ok(s.try_user(user_id).is_some()))
    }

    /// The user's own JSON, including the email address.
    pub fn get_identity(&self, user_id: UserId) -> GridtResult<Value> {
        self.db().read(|s| Ok(s.user(user_id)?.to_json(true)))
    }

    /// Verifies credentials by email, returning the user id.
    ///
    /// Fails with [`DomainError::BadCredentials`] both when the email is
    /// unknown and when the password mismatches.
    pub fn verify_password_by_email(&self, email: &str, password: &str) -> GridtResult<UserId> {
        self.db().read(|s| {
            let user = s
                .user_by_email(email)
                .ok_or(DomainError::BadCredentials)?;
            if user.verify_password(password) {
                Ok(user.id)
            } else {
                Err(DomainError::BadCredentials.into())
            }
        })
    }

    /// Verifies a password for a known user id.
    pub fn verify_password_by_id(&self, user_id: UserId, password: &str) -> GridtResult<bool> {
        self.db()
            .read(|s| Ok(s.user(user_id)?.verify_password(password)))
    }

    /// Replaces the user's bio.
    pub fn update_bio(&self, user_id: UserId, bio: &str) -> GridtResult<()> {
        self.db().write_with_deadline(self.deadline(), |s| {
            s.user_mut(user_id)?.bio = bio.to_string();
            Ok(())
        })
    }

    /// Rehashes and stores a new password, then notifies the user by mail.
    pub fn change_password(&self, user_id: UserId, new_password: &str) -> GridtResult<()> {
        let email = self.store_new_password(user_id, new_password)?;

        if let Err(err) =
            templates::send_password_change_notification(self.mailer(), self.config(), &email)
        {
            tracing::warn!(user = %user_id, error = %err, "password change notification failed");
        }
        Ok(())
    }

    /// Starts a password reset: mails a 2-hour token to the address.
    ///
    /// Unknown addresses are logged and silently accepted.
    pub fn request_password_reset(&self, email: &str) -> GridtResult<()> {
        let user = self.db().read(|s| Ok(s.user_by_email(email).cloned()))?;
        let Some(user) = user else {
            tracing::warn!(email, "password reset requested for unregistered email");
            return Ok(());
        };

        let claims =
            TokenClaims::password_reset(user.id, self.now() + self.config().token_ttl);
        let token = token::encode(&claims, &self.config().secret_key)?;

        templates::send_password_reset_email(self.mailer(), self.config(), &user.email, &token)
    }

    /// Completes a password reset with a valid token.
    pub fn reset_password(&self, token: &str, new_password: &str) -> GridtResult<()> {
        let claims = token::decode(token, &self.config().secret_key, self.now())?;
        let email = self.store_new_password(claims.user_id, new_password)?;

        if let Err(err) =
            templates::send_password_change_notification(self.mailer(), self.config(), &email)
        {
            tracing::warn!(user = %claims.user_id, error = %err, "password change notification failed");
        }
        Ok(())
    }

    /// Starts an email change: mails a confirmation token to the *new*
    /// address.
    ///
    /// An already-registered target address is logged and silently
    /// accepted.
    pub fn request_email_change(&self, user_id: UserId, new_email: &str) -> GridtResult<()> {
        validate_email(new_email)?;

        let user = self.db().read(|s| Ok(s.user(user_id)?.clone()))?;
        let taken = self
            .db()
            .read(|s| Ok(s.user_by_email(new_email).is_some()))?;
        if taken {
            tracing::warn!(user = %user_id, "email change to already-registered address requested");
            return Ok(());
        }

        let claims = TokenClaims::email_change(
            user.id,
            new_email.to_string(),
            self.now() + self.config().token_ttl,
        );
        let token = token::encode(&claims, &self.config().secret_key)?;

        templates::send_email_change_email(
            self.mailer(),
            self.config(),
            new_email,
            &user.username,
            &token,
        )
    }

    /// Completes an email change with a valid token, then notifies the new
    /// address.
    pub fn change_email(&self, token: &str) -> GridtResult<()> {
        let claims = token::decode(token, &self.config().secret_key, self.now())?;
        let new_email = claims.new_email.ok_or_else(|| TokenError::Malformed {
            reason: "missing new_email claim".to_string(),
        })?;

        let username = self.db().write_with_deadline(self.deadline(), |s| {
            if let Some(holder) = s.user_by_email(&new_email) {
                if holder.id != claims.user_id {
                    return Err(ValidationError::EmailTaken {
                        email: new_email.clone(),
                    }
                    .into());
                }
            }
            let user = s.user_mut(claims.user_id)?;
            user.email = new_email.clone();
            Ok(user.username.clone())
        })?;

        if let Err(err) = templates::send_email_change_notification(
            self.mailer(),
            self.config(),
            &new_email,
            &username,
        ) {
            tracing::warn!(user = %claims.user_id, error = %err, "email change notification failed");
        }
        Ok(())
    }

    fn store_new_password(&self, user_id: UserId, new_password: &str) -> GridtResult<String> {
        let mut salt = [0u8; SALT_LEN];
        self.rng().fill(&mut salt);
        let password_hash = hash_password(new_password, &salt);

        self.db().write_with_deadline(self.deadline(), |s| {
            let user = s.user_mut(user_id)?;
            user.password_hash = password_hash.clone();
            Ok(user.email.clone())
        })
    }
}
