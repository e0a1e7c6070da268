use serde::Deserialize;
use crate::{
    error::Result,
    models::message::{MailMessage, NewMessage},
    state::AppState,
};

/// The webhook payload posted by the mail-receiving provider.
#[derive(Deserialize, Debug)]
pub struct EmailWebhookPayload {
    pub to: String,
    pub from: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// The result of handing a webhook payload to the store.
pub enum IngestOutcome {
    /// No active, unexpired mailbox matches the recipient.
    NoActiveMailbox,
    /// The message was stored.
    Stored(MailMessage),
}

/// Reduces a `Name <addr@domain>` form to the bare address. Returns `None`
/// for empty input.
pub fn extract_address(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let (Some(start), Some(end)) = (raw.find('<'), raw.rfind('>')) {
        if start < end {
            let inner = raw[start + 1..end].trim();
            if !inner.is_empty() {
                return Some(inner.to_string());
            }
        }
    }

    Some(raw.to_string())
}

/// Routes an inbound message to the mailbox it was addressed to.
///
/// Mirrors what the client's polling model depends on: a matching active,
/// non-expired mailbox gets a `temp_email_messages` row; anything else is
/// reported as not found, never stored.
pub async fn ingest(state: &AppState, payload: EmailWebhookPayload) -> Result<IngestOutcome> {
    let Some(recipient) = extract_address(&payload.to) else {
        tracing::debug!("Webhook payload without a recipient");
        return Ok(IngestOutcome::NoActiveMailbox);
    };
    let sender = extract_address(&payload.from).unwrap_or_else(|| "unknown".to_string());

    let Some(mailbox) = state.store.find_active_by_address(&recipient).await? else {
        tracing::debug!("No active mailbox for {}", recipient);
        return Ok(IngestOutcome::NoActiveMailbox);
    };

    let subject = payload
        .subject
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "(no subject)".to_string());

    let message = state
        .store
        .ingest_message(
            mailbox.id,
            NewMessage {
                sender_email: sender,
                sender_name: payload.sender_name,
                subject,
                body_text: payload.text,
                body_html: payload.html,
            },
        )
        .await?;

    tracing::info!("📨 Message {} delivered to {}", message.id, mailbox.address);
    Ok(IngestOutcome::Stored(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_addresses_pass_through_trimmed() {
        assert_eq!(
            extract_address(" foo@lorza.pl "),
            Some("foo@lorza.pl".to_string())
        );
    }

    #[test]
    fn bracketed_forms_reduce_to_the_address() {
        assert_eq!(
            extract_address("Jan Kowalski <jan@example.com>"),
            Some("jan@example.com".to_string())
        );
        assert_eq!(
            extract_address("<only@example.com>"),
            Some("only@example.com".to_string())
        );
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(extract_address(""), None);
        assert_eq!(extract_address("   "), None);
    }

    #[test]
    fn malformed_brackets_fall_back_to_raw() {
        assert_eq!(
            extract_address("broken >foo< input"),
            Some("broken >foo< input".to_string())
        );
        assert_eq!(extract_address("<>"), Some("<>".to_string()));
    }
}
