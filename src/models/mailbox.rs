use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

/// Represents a disposable mailbox.
///
/// A mailbox is live when `is_active` is true and `expires_at` is in the
/// future. Expiry is enforced twice: the client runs a countdown, and every
/// storage query filters on active, non-expired rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mailbox {
    /// The unique identifier for the mailbox.
    pub id: Uuid,
    /// The full address, `<local part>@<domain>`.
    pub address: String,
    /// Whether the mailbox still accepts mail.
    pub is_active: bool,
    /// The timestamp when the mailbox was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the mailbox expires.
    pub expires_at: DateTime<Utc>,
}

impl Mailbox {
    /// Returns the number of whole seconds until expiry, clamped at zero.
    pub fn seconds_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

impl From<&Row> for Mailbox {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            address: row.get("email_address"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn seconds_left_clamps_at_zero() {
        let now = Utc::now();
        let mailbox = Mailbox {
            id: Uuid::new_v4(),
            address: "foo@lorza.pl".to_string(),
            is_active: true,
            created_at: now - Duration::seconds(700),
            expires_at: now - Duration::seconds(100),
        };
        assert_eq!(mailbox.seconds_left(now), 0);

        let live = Mailbox {
            expires_at: now + Duration::seconds(42),
            ..mailbox
        };
        assert_eq!(live.seconds_left(now), 42);
    }
}
