use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

/// The number of characters shown in a message preview.
const PREVIEW_CHARS: usize = 100;

/// Represents a message delivered to a disposable mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    /// The unique identifier for the message.
    pub id: Uuid,
    /// The ID of the mailbox this message belongs to.
    pub mailbox_id: Uuid,
    /// The bare address the message was sent from.
    pub sender_email: String,
    /// The display name of the sender, if the provider supplied one.
    pub sender_name: Option<String>,
    /// The message subject.
    pub subject: String,
    /// The plain-text body, if any.
    pub body_text: Option<String>,
    /// The HTML body, if any.
    pub body_html: Option<String>,
    /// The timestamp when the message was received.
    pub received_at: DateTime<Utc>,
}

/// The fields of a message as handed over by the ingestion webhook.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
}

impl MailMessage {
    /// Returns a preview of the body, truncated to 100 characters with an
    /// ellipsis. Prefers the text body over the HTML one.
    pub fn preview(&self) -> String {
        let body = self
            .body_text
            .as_deref()
            .or(self.body_html.as_deref())
            .unwrap_or("");
        truncate_preview(body, PREVIEW_CHARS)
    }

    /// Renders the received timestamp in a long human-readable format.
    pub fn format_received(&self) -> String {
        self.received_at.format("%B %e, %Y %H:%M:%S").to_string()
    }
}

impl From<&Row> for MailMessage {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            mailbox_id: row.get("temp_email_id"),
            sender_email: row.get("sender_email"),
            sender_name: row.get("sender_name"),
            subject: row.get("subject"),
            body_text: row.get("body_text"),
            body_html: row.get("body_html"),
            received_at: row.get("received_at"),
        }
    }
}

/// Truncates `body` to at most `limit` characters, appending an ellipsis
/// when anything was cut. Operates on characters, not bytes, so multi-byte
/// input never splits a boundary.
fn truncate_preview(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }
    let mut preview: String = body.chars().take(limit).collect();
    preview.push_str("...");
    preview
}
