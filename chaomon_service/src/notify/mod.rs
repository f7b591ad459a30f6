//! Outbound delivery.
//!
//! The alert flows hand a [`Notification`] to a [`Notifier`] and only look
//! at whether it succeeded. Failures never propagate past this boundary as
//! panics; the caller logs them and leaves its state untouched so the next
//! run can retry.

pub mod line;

use thiserror::Error;

use crate::config::Config;
use crate::logging::DataSource;

pub use line::LineNotifier;

/// Text plus an optional image, as delivered to the chat.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    pub image_url: Option<String>,
}

impl Notification {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum NotifyError {
    #[error("messaging credentials are not configured")]
    MissingCredentials,
    #[error("delivery rejected with HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("delivery failed: {0}")]
    Request(String),
}

pub trait Notifier {
    fn channel(&self) -> DataSource {
        DataSource::Line
    }

    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Logs what would be sent and reports success.
pub struct DryRunNotifier;

impl Notifier for DryRunNotifier {
    fn channel(&self) -> DataSource {
        DataSource::System
    }

    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            image = notification.image_url.as_deref().unwrap_or("-"),
            "[dry-run] would send:\n{}",
            notification.text
        );
        Ok(())
    }
}

/// Stands in when no credentials are configured; every send fails.
pub struct UnconfiguredNotifier;

impl Notifier for UnconfiguredNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::MissingCredentials)
    }
}

/// Picks the notifier for this run.
pub fn notifier_from_config(config: &Config) -> Box<dyn Notifier> {
    if config.dry_run {
        return Box::new(DryRunNotifier);
    }
    match (config.line_token.as_deref(), config.line_target.as_deref()) {
        (Some(token), Some(target)) => match LineNotifier::new(token, target) {
            Ok(notifier) => Box::new(notifier),
            Err(e) => {
                tracing::error!("could not build LINE client: {}", e);
                Box::new(UnconfiguredNotifier)
            }
        },
        _ => {
            tracing::warn!("LINE_CHANNEL_ACCESS_TOKEN / LINE_TARGET_ID not set; alerts cannot be delivered");
            Box::new(UnconfiguredNotifier)
        }
    }
}
