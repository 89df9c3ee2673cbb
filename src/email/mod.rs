//! Outbound email seam.
//!
//! The core never talks SMTP; it hands a template id and a data map to a
//! pluggable [`Mailer`]. Identity flows tolerate delivery failures (logged,
//! not surfaced) except where the send *is* the operation.

pub mod templates;

use std::sync::Mutex;

use serde_json::Value;

use crate::error::GridtResult;

/// Sends templated mail to an address.
pub trait Mailer: Send + Sync {
    /// Sends `template_id` to `to` with the given template data.
    fn send(&self, to: &str, template_id: &str, data: &Value) -> GridtResult<()>;
}

/// A mailer that drops everything on the floor (the default when no
/// provider is configured). Sends are logged at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardMailer;

impl Mailer for DiscardMailer {
    fn send(&self, to: &str, template_id: &str, _data: &Value) -> GridtResult<()> {
        tracing::debug!(to, template_id, "discarding outbound email");
        Ok(())
    }
}

/// One captured outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEmail {
    /// Recipient address.
    pub to: String,
    /// Template id passed to the provider.
    pub template_id: String,
    /// Template data.
    pub data: Value,
}

/// A mailer that records every send, for tests.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<RecordedEmail>>,
}

impl RecordingMailer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<RecordedEmail> {
        self.sent.lock().expect("mailer lock").clone()
    }

    /// The most recent send, if any.
    #[must_use]
    pub fn last(&self) -> Option<RecordedEmail> {
        self.sent.lock().expect("mailer lock").last().cloned()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, to: &str, template_id: &str, data: &Value) -> GridtResult<()> {
        self.sent.lock().expect("mailer lock").push(RecordedEmail {
            to: to.to_string(),
            template_id: template_id.to_string(),
            data: data.clone(),
        });
        Ok(())
    }
}

/// A mailer that always fails, for exercising the failure-tolerance paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _to: &str, _template_id: &str, _data: &Value) -> GridtResult<()> {
        Err(crate::error::GridtError::email("provider unavailable"))
    }
}
