use async_trait::async_trait;
use chrono::{DateTime, NaiveTime};
use chrono_tz::Tz;
use thiserror::Error;
use url::Url;

use crate::models::ClassEvent;
use crate::scheduler::REMINDER_LEAD_MIN;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("channel {channel_id} rejected the message: {status}")]
    Rejected {
        channel_id: u64,
        status: reqwest::StatusCode,
    },
}

/// What the scheduler hands to the messaging layer for one matched class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub channel_id: u64,
    pub title: String,
    pub body: String,
    pub class_time: NaiveTime,
    pub description: Option<String>,
    pub timestamp: DateTime<Tz>,
}

impl Reminder {
    pub fn for_class(event: &ClassEvent, now: DateTime<Tz>) -> Self {
        Self {
            channel_id: event.channel_id,
            title: "🔔 Class reminder".to_string(),
            body: format!(
                "**{}** starts in {} minutes!",
                event.name, REMINDER_LEAD_MIN
            ),
            class_time: event.time,
            description: if event.description.is_empty() {
                None
            } else {
                Some(event.description.clone())
            },
            timestamp: now,
        }
    }
}

/// Delivery seam between the scheduler and the chat platform. Delivery
/// outcome is reported for logging only; it never feeds back into the
/// schedule.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn dispatch(&self, reminder: &Reminder) -> Result<(), DispatchError>;
}

/// Posts reminder embeds to Discord channels through the REST API.
#[derive(Clone)]
pub struct DiscordSink {
    client: reqwest::Client,
    api_base: Url,
    bot_token: String,
}

impl DiscordSink {
    pub fn new(api_base: Url, bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            bot_token,
        }
    }

    fn message_url(&self, channel_id: u64) -> String {
        format!(
            "{}/channels/{}/messages",
            self.api_base.as_str().trim_end_matches('/'),
            channel_id
        )
    }

    fn payload(reminder: &Reminder) -> serde_json::Value {
        let mut fields = vec![serde_json::json!({
            "name": "Class time",
            "value": reminder.class_time.format("%H:%M").to_string(),
            "inline": true,
        })];
        if let Some(description) = &reminder.description {
            fields.push(serde_json::json!({
                "name": "Class info",
                "value": description,
                "inline": false,
            }));
        }
        serde_json::json!({
            "content": "@everyone",
            "embeds": [{
                "title": reminder.title,
                "description": reminder.body,
                "color": 0xffaa00,
                "timestamp": reminder.timestamp.to_rfc3339(),
                "fields": fields,
                "footer": { "text": "Get ready for class! 📚" },
            }],
        })
    }
}

#[async_trait]
impl DispatchSink for DiscordSink {
    async fn dispatch(&self, reminder: &Reminder) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(self.message_url(reminder.channel_id))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bot {}", self.bot_token),
            )
            .json(&Self::payload(reminder))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                channel_id: reminder.channel_id,
                status,
            });
        }
        Ok(())
    }
}
