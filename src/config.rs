//! Runtime configuration.
//!
//! The core reads its settings from the environment (`from_env`) or takes
//! them programmatically (tests). The tunable design constants (fan-out
//! cap, signal history depth, token lifetime) live here as plain fields.

use chrono::Duration;

/// Environment variable holding the store connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Environment variable holding the HS256 signing key.
pub const ENV_SECRET_KEY: &str = "SECRET_KEY";
/// Environment variable holding the password-reset mail template id.
pub const ENV_PASSWORD_RESET_TEMPLATE: &str = "PASSWORD_RESET_TEMPLATE";
/// Environment variable holding the password-change notification template id.
pub const ENV_PASSWORD_CHANGE_NOTIFICATION_TEMPLATE: &str = "PASSWORD_CHANGE_NOTIFICATION_TEMPLATE";
/// Environment variable holding the email-change confirmation template id.
pub const ENV_EMAIL_CHANGE_TEMPLATE: &str = "EMAIL_CHANGE_TEMPLATE";
/// Environment variable holding the email-change notification template id.
pub const ENV_EMAIL_CHANGE_NOTIFICATION_TEMPLATE: &str = "EMAIL_CHANGE_NOTIFICATION_TEMPLATE";
/// Environment variable holding the outbound mail credential.
pub const ENV_EMAIL_API_KEY: &str = "EMAIL_API_KEY";

/// Configuration for a [`crate::Gridt`] instance.
#[derive(Debug, Clone)]
pub struct GridtConfig {
    /// Store connection string. `memory://` selects the in-memory engine.
    pub database_url: String,
    /// HS256 signing key for password-reset and email-change tokens.
    pub secret_key: String,
    /// Template id for password-reset mail.
    pub password_reset_template: String,
    /// Template id for password-change notifications.
    pub password_change_notification_template: String,
    /// Template id for email-change confirmation mail.
    pub email_change_template: String,
    /// Template id for email-change notifications.
    pub email_change_notification_template: String,
    /// Credential for the outbound mail provider.
    pub email_api_key: String,
    /// Target number of leaders per follower in a movement.
    pub fanout_target: usize,
    /// Number of signals returned in a leader's message history.
    pub message_history_depth: usize,
    /// Lifetime of password-reset and email-change tokens.
    pub token_ttl: Duration,
    /// Optional per-operation deadline; `None` disables deadline checks.
    pub operation_timeout: Option<Duration>,
}

impl Default for GridtConfig {
    fn default() -> Self {
        Self {
            database_url: "memory://".to_string(),
            secret_key: "insecure-development-key".to_string(),
            password_reset_template: "password-reset".to_string(),
            password_change_notification_template: "password-change-notification".to_string(),
            email_change_template: "email-change".to_string(),
            email_change_notification_template: "email-change-notification".to_string(),
            email_api_key: String::new(),
            fanout_target: 4,
            message_history_depth: 3,
            token_ttl: Duration::hours(2),
            operation_timeout: None,
        }
    }
}

impl GridtConfig {
    /// Builds a configuration from the recognized environment variables,
    /// falling back to the defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env_or(ENV_DATABASE_URL, defaults.database_url),
            secret_key: env_or(ENV_SECRET_KEY, defaults.secret_key),
            password_reset_template: env_or(
                ENV_PASSWORD_RESET_TEMPLATE,
                defaults.password_reset_template,
            ),
            password_change_notification_template: env_or(
                ENV_PASSWORD_CHANGE_NOTIFICATION_TEMPLATE,
                defaults.password_change_notification_template,
            ),
            email_change_template: env_or(ENV_EMAIL_CHANGE_TEMPLATE, defaults.email_change_template),
            email_change_notification_template: env_or(
                ENV_EMAIL_CHANGE_NOTIFICATION_TEMPLATE,
                defaults.email_change_notification_template,
            ),
            email_api_key: env_or(ENV_EMAIL_API_KEY, defaults.email_api_key),
            fanout_target: defaults.fanout_target,
            message_history_depth: defaults.message_history_depth,
            token_ttl: defaults.token_ttl,
            operation_timeout: defaults.operation_timeout,
        }
    }

    /// Sets the secret key (builder style, mostly for tests).
    #[must_use]
    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = key.into();
        self
    }

    /// Sets the fan-out target.
    #[must_use]
    pub fn with_fanout_target(mut self, target: usize) -> Self {
        self.fanout_target = target;
        self
    }

    /// Sets the per-operation deadline.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}

fn env_or(name: &str, fallback: String) -> String {
    std::env::var(name).unwrap_or(fallback)
}
