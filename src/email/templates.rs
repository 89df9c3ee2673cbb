//! The predefined identity email templates.
//!
//! Template ids come from configuration; the data keys (`link`,
//! `username`) are fixed contract with the mail provider's templates.

use serde_json::json;

use crate::config::GridtConfig;
use crate::error::GridtResult;

use super::Mailer;

const RESET_CONFIRM_URL: &str = "https://app.gridt.org/user/reset_password/confirm";
const RESET_REQUEST_URL: &str = "https://app.gridt.org/user/reset_password/request";
const EMAIL_CHANGE_CONFIRM_URL: &str = "https://app.gridt.org/user/change_email/confirm";

/// Sends the password-reset template with a confirmation link.
pub fn send_password_reset_email(
    mailer: &dyn Mailer,
    config: &GridtConfig,
    email: &str,
    token: &str,
) -> GridtResult<()> {
    let data = json!({
        "link": format!("{RESET_CONFIRM_URL}?token={token}"),
    });
    mailer.send(email, &config.password_reset_template, &data)
}

/// Notifies a user that their password was changed.
pub fn send_password_change_notification(
    mailer: &dyn Mailer,
    config: &GridtConfig,
    email: &str,
) -> GridtResult<()> {
    let data = json!({
        "link": RESET_REQUEST_URL,
    });
    mailer.send(email, &config.password_change_notification_template, &data)
}

/// Sends the email-change confirmation link to the *new* address.
pub fn send_email_change_email(
    mailer: &dyn Mailer,
    config: &GridtConfig,
    email: &str,
    username: &str,
    token: &str,
) -> GridtResult<()> {
    let data = json!({
        "username": username,
        "link": format!("{EMAIL_CHANGE_CONFIRM_URL}?token={token}"),
    });
    mailer.send(email, &config.email_change_template, &data)
}

/// Notifies the (now current) address that the email change completed.
pub fn send_email_change_notification(
    mailer: &dyn Mailer,
    config: &GridtConfig,
    email: &str,
    username: &str,
) -> GridtResult<()> {
    let data = json!({
        "username": username,
    });
    mailer.send(email, &config.email_change_notification_template, &data)
}
