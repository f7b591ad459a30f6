/// LINE Messaging API push delivery.
///
/// API Documentation: https://developers.line.biz/en/reference/messaging-api/#send-push-message

use serde_json::{Value, json};

use super::{Notification, Notifier, NotifyError};
use crate::ingest::API_TIMEOUT;

pub const LINE_PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";

pub struct LineNotifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
    target: String,
}

impl LineNotifier {
    pub fn new(token: &str, target: &str) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: LINE_PUSH_URL.to_string(),
            token: token.to_string(),
            target: target.to_string(),
        })
    }

    /// Points the notifier at another endpoint (local mock servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Request body for one push: a text message, then the image if any.
pub fn push_payload(target: &str, notification: &Notification) -> Value {
    let mut messages = vec![json!({ "type": "text", "text": notification.text })];
    if let Some(url) = &notification.image_url {
        messages.push(json!({
            "type": "image",
            "originalContentUrl": url,
            "previewImageUrl": url,
        }));
    }
    json!({ "to": target, "messages": messages })
}

impl Notifier for LineNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&push_payload(&self.target, notification))
            .send()
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NotifyError::Http { status: status.as_u16(), body });
        }
        tracing::info!(status = status.as_u16(), "LINE push delivered");
        Ok(())
    }
}
