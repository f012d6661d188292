//! Expo push service client.
//!
//! Sends one push message per notification to the Expo push API:
//!   https://exp.host/--/api/v2/push/send
//!
//! Messages go out with sound, high priority and the `default` Android
//! channel, which the mobile app registers at maximum importance.

use serde::{Deserialize, Serialize};

use super::{NotificationChannel, PushToken};
use crate::model::MonitorError;

pub const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

const ANDROID_CHANNEL_ID: &str = "default";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq)]
pub struct PushMessage<'a> {
    pub to: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub sound: &'a str,
    pub priority: &'a str,
    #[serde(rename = "channelId")]
    pub channel_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    data: Option<PushTicket>,
    #[serde(default)]
    errors: Vec<PushApiError>,
}

#[derive(Debug, Deserialize)]
struct PushTicket {
    status: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushApiError {
    message: String,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

pub struct ExpoPushChannel {
    client: reqwest::blocking::Client,
    url: String,
    token: PushToken,
}

impl ExpoPushChannel {
    pub fn new(token: PushToken) -> Self {
        Self::with_url(token, EXPO_PUSH_URL)
    }

    pub fn with_url(token: PushToken, url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.into(),
            token,
        }
    }

    pub fn message<'a>(&'a self, title: &'a str, body: &'a str) -> PushMessage<'a> {
        PushMessage {
            to: self.token.as_str(),
            title,
            body,
            sound: "default",
            priority: "high",
            channel_id: ANDROID_CHANNEL_ID,
        }
    }
}

impl NotificationChannel for ExpoPushChannel {
    fn deliver(&self, title: &str, body: &str) -> Result<(), MonitorError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.message(title, body))
            .send()
            .map_err(|e| MonitorError::NotificationDelivery(format!("POST {} failed: {}", self.url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| MonitorError::NotificationDelivery(format!("Failed to read push response: {}", e)))?;

        if !status.is_success() {
            return Err(MonitorError::NotificationDelivery(format!(
                "push service returned HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        check_push_response(&text)
    }
}

/// Interprets the push service's JSON reply for a single message.
fn check_push_response(text: &str) -> Result<(), MonitorError> {
    let response: PushResponse = serde_json::from_str(text)
        .map_err(|e| MonitorError::NotificationDelivery(format!("unexpected push response: {}", e)))?;

    if let Some(error) = response.errors.first() {
        return Err(MonitorError::NotificationDelivery(error.message.clone()));
    }

    match response.data {
        Some(ticket) if ticket.status == "ok" => Ok(()),
        Some(ticket) => Err(MonitorError::NotificationDelivery(
            ticket.message.unwrap_or_else(|| format!("ticket status {}", ticket.status)),
        )),
        None => Err(MonitorError::NotificationDelivery("push response had no ticket".to_string())),
    }
}
