use std::sync::Arc;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::mailbox::Mailbox,
    models::message::MailMessage,
    storage::SessionBackend,
    validation::mailbox::validate_local_part,
};

/// The outcome of one countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// No session is running.
    Idle,
    /// The session is alive with this many seconds left.
    Running(u32),
    /// The countdown hit zero; the session was torn down automatically.
    /// This is the one transition that warrants an "expired" notice.
    Expired,
}

enum LifecycleState {
    Idle,
    Active {
        mailbox: Mailbox,
        seconds_left: u32,
        messages: Vec<MailMessage>,
    },
}

/// The disposable-mailbox session: an explicit two-state machine.
///
/// `Idle` knows nothing; `Active` owns the minted mailbox, the countdown,
/// and the last polled inbox snapshot. The caller drives time: a 1-second
/// tick for the countdown and a 5-second tick for polling, both running
/// only while a session is active. Poll results are tagged with the session
/// they were issued for and dropped if the session changed in flight.
pub struct MailboxLifecycle {
    backend: Arc<dyn SessionBackend>,
    ttl_secs: u32,
    state: LifecycleState,
}

impl MailboxLifecycle {
    pub fn new(backend: Arc<dyn SessionBackend>, ttl_secs: u32) -> Self {
        Self {
            backend,
            ttl_secs,
            state: LifecycleState::Idle,
        }
    }

    /// The active session's mailbox, if any.
    pub fn session(&self) -> Option<&Mailbox> {
        match &self.state {
            LifecycleState::Active { mailbox, .. } => Some(mailbox),
            LifecycleState::Idle => None,
        }
    }

    /// Seconds left on the countdown, if a session is active.
    pub fn seconds_left(&self) -> Option<u32> {
        match &self.state {
            LifecycleState::Active { seconds_left, .. } => Some(*seconds_left),
            LifecycleState::Idle => None,
        }
    }

    /// The messages from the most recent applied poll.
    pub fn messages(&self) -> &[MailMessage] {
        match &self.state {
            LifecycleState::Active { messages, .. } => messages,
            LifecycleState::Idle => &[],
        }
    }

    /// Mints a mailbox and enters `Active`.
    ///
    /// Validation and conflict failures leave the state untouched.
    pub async fn generate(&mut self, local_part: &str) -> Result<Mailbox> {
        let local_part = validate_local_part(local_part)?;

        let mailbox = self
            .backend
            .create_mailbox(&local_part)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "An active mailbox for '{}' already exists",
                    local_part
                ))
            })?;

        self.state = LifecycleState::Active {
            mailbox: mailbox.clone(),
            seconds_left: self.ttl_secs,
            messages: Vec::new(),
        };
        Ok(mailbox)
    }

    /// Advances the countdown by one second.
    ///
    /// At zero the session is expired: the row is deleted best-effort and
    /// the machine returns to `Idle`.
    pub async fn tick(&mut self) -> Tick {
        let seconds_left = match &mut self.state {
            LifecycleState::Idle => return Tick::Idle,
            LifecycleState::Active { seconds_left, .. } => {
                *seconds_left = seconds_left.saturating_sub(1);
                *seconds_left
            }
        };

        if seconds_left == 0 {
            self.teardown("expired").await;
            Tick::Expired
        } else {
            Tick::Running(seconds_left)
        }
    }

    /// Fetches the inbox for the active session and replaces the snapshot
    /// wholesale. A no-op returning an empty list while `Idle`.
    pub async fn poll(&mut self) -> Result<Vec<MailMessage>> {
        let Some(session_id) = self.session().map(|m| m.id) else {
            return Ok(Vec::new());
        };

        let fetched = self.backend.messages_for(session_id).await?;

        if self.apply_poll(session_id, fetched.clone()) {
            Ok(fetched)
        } else {
            Ok(Vec::new())
        }
    }

    /// Applies a poll result if and only if `session_id` still names the
    /// active session. Stale results from a session that expired or was
    /// regenerated mid-flight are dropped.
    pub fn apply_poll(&mut self, session_id: Uuid, fetched: Vec<MailMessage>) -> bool {
        match &mut self.state {
            LifecycleState::Active { mailbox, messages, .. } if mailbox.id == session_id => {
                *messages = fetched;
                true
            }
            _ => false,
        }
    }

    /// Discards the current session on user request. Silent: unlike an
    /// automatic expiry, this is not reported as the mail having expired.
    pub async fn regenerate(&mut self) {
        if matches!(self.state, LifecycleState::Active { .. }) {
            self.teardown("regenerated").await;
        }
    }

    /// Deletes the session row best-effort and resets to `Idle`. A failed
    /// delete is logged, not retried; the sweeper reaps the row later.
    async fn teardown(&mut self, reason: &str) {
        if let LifecycleState::Active { mailbox, .. } = &self.state {
            let id = mailbox.id;
            let address = mailbox.address.clone();
            if let Err(e) = self.backend.delete_mailbox(id).await {
                tracing::warn!("Failed to delete mailbox {} ({}): {}", address, reason, e);
            } else {
                tracing::debug!("Mailbox {} removed ({})", address, reason);
            }
        }
        self.state = LifecycleState::Idle;
    }
}

/// Renders the countdown as `minutes:seconds` with zero-padded seconds.
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::models::message::NewMessage;
    use crate::storage::memory::MemoryStore;
    use crate::storage::MailboxStore;

    /// Delegates to a `MemoryStore` while counting message queries, so
    /// tests can assert that `Idle` polls never touch storage.
    struct CountingBackend {
        store: MemoryStore,
        message_queries: AtomicUsize,
    }

    impl CountingBackend {
        fn new(store: MemoryStore) -> Arc<Self> {
            Arc::new(Self {
                store,
                message_queries: AtomicUsize::new(0),
            })
        }

        fn message_queries(&self) -> usize {
            self.message_queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionBackend for CountingBackend {
        async fn create_mailbox(&self, local_part: &str) -> Result<Option<Mailbox>> {
            self.store.create_mailbox(local_part).await
        }

        async fn delete_mailbox(&self, id: Uuid) -> Result<bool> {
            self.store.delete_mailbox(id).await
        }

        async fn messages_for(&self, mailbox_id: Uuid) -> Result<Vec<MailMessage>> {
            self.message_queries.fetch_add(1, Ordering::SeqCst);
            self.store.messages_for(mailbox_id).await
        }
    }

    fn new_message(subject: &str) -> NewMessage {
        NewMessage {
            sender_email: "sender@example.com".to_string(),
            sender_name: Some("Sender".to_string()),
            subject: subject.to_string(),
            body_text: Some("body".to_string()),
            body_html: None,
        }
    }

    #[tokio::test]
    async fn generate_rejects_blank_local_parts() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mut lifecycle = MailboxLifecycle::new(Arc::new(store.clone()), 600);

        assert!(matches!(
            lifecycle.generate("").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            lifecycle.generate("   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(lifecycle.session().is_none());
        assert_eq!(store.mailbox_count().await, 0);
    }

    #[tokio::test]
    async fn generate_conflicts_on_taken_address() {
        let store = MemoryStore::new("lorza.pl", 600);
        store.create_mailbox("foo").await.unwrap();

        let mut lifecycle = MailboxLifecycle::new(Arc::new(store.clone()), 600);
        assert!(matches!(
            lifecycle.generate("foo").await,
            Err(AppError::Conflict(_))
        ));
        assert!(lifecycle.session().is_none());
        assert_eq!(store.mailbox_count().await, 1);
    }

    #[tokio::test]
    async fn generate_starts_countdown_at_ttl() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mut lifecycle = MailboxLifecycle::new(Arc::new(store), 600);

        let mailbox = lifecycle.generate("foo").await.unwrap();
        assert_eq!(mailbox.address, "foo@lorza.pl");
        assert_eq!(lifecycle.seconds_left(), Some(600));
        assert!(lifecycle.messages().is_empty());
    }

    #[tokio::test]
    async fn countdown_decrements_and_expires_at_zero() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mut lifecycle = MailboxLifecycle::new(Arc::new(store.clone()), 600);
        let mailbox = lifecycle.generate("foo").await.unwrap();

        assert_eq!(lifecycle.tick().await, Tick::Running(599));
        assert_eq!(lifecycle.seconds_left(), Some(599));

        for _ in 0..598 {
            lifecycle.tick().await;
        }
        assert_eq!(lifecycle.seconds_left(), Some(1));

        assert_eq!(lifecycle.tick().await, Tick::Expired);
        assert!(lifecycle.session().is_none());
        assert!(store.find_active(mailbox.id).await.unwrap().is_none());
        assert_eq!(store.mailbox_count().await, 0);

        // Further ticks are a no-op.
        assert_eq!(lifecycle.tick().await, Tick::Idle);
    }

    #[tokio::test]
    async fn idle_poll_returns_empty_without_touching_storage() {
        let backend = CountingBackend::new(MemoryStore::new("lorza.pl", 600));
        let mut lifecycle = MailboxLifecycle::new(backend.clone(), 600);

        assert!(lifecycle.poll().await.unwrap().is_empty());
        assert_eq!(backend.message_queries(), 0);
    }

    #[tokio::test]
    async fn poll_replaces_snapshot_wholesale() {
        let store = MemoryStore::new("lorza.pl", 600);
        let backend = CountingBackend::new(store.clone());
        let mut lifecycle = MailboxLifecycle::new(backend.clone(), 600);
        let mailbox = lifecycle.generate("foo").await.unwrap();

        assert!(lifecycle.poll().await.unwrap().is_empty());

        store
            .ingest_message(mailbox.id, new_message("hello"))
            .await
            .unwrap();

        let polled = lifecycle.poll().await.unwrap();
        assert_eq!(polled.len(), 1);
        assert_eq!(polled[0].subject, "hello");
        assert_eq!(lifecycle.messages().len(), 1);
        assert_eq!(backend.message_queries(), 2);
    }

    #[tokio::test]
    async fn stale_poll_results_are_dropped() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mut lifecycle = MailboxLifecycle::new(Arc::new(store.clone()), 600);
        let old = lifecycle.generate("foo").await.unwrap();

        lifecycle.regenerate().await;
        let new = lifecycle.generate("bar").await.unwrap();

        let stale = vec![MailMessage {
            id: Uuid::new_v4(),
            mailbox_id: old.id,
            sender_email: "late@example.com".to_string(),
            sender_name: None,
            subject: "too late".to_string(),
            body_text: None,
            body_html: None,
            received_at: chrono::Utc::now(),
        }];

        assert!(!lifecycle.apply_poll(old.id, stale));
        assert!(lifecycle.messages().is_empty());
        assert!(lifecycle.apply_poll(new.id, Vec::new()));
    }

    #[tokio::test]
    async fn regenerate_is_silent_and_clears_everything() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mut lifecycle = MailboxLifecycle::new(Arc::new(store.clone()), 600);
        let mailbox = lifecycle.generate("foo").await.unwrap();

        store
            .ingest_message(mailbox.id, new_message("pending"))
            .await
            .unwrap();
        lifecycle.poll().await.unwrap();
        assert_eq!(lifecycle.messages().len(), 1);

        lifecycle.regenerate().await;

        assert!(lifecycle.session().is_none());
        assert!(lifecycle.messages().is_empty());
        assert_eq!(lifecycle.seconds_left(), None);
        assert_eq!(store.mailbox_count().await, 0);
        // Not an expiry: the next tick reports Idle, never Expired.
        assert_eq!(lifecycle.tick().await, Tick::Idle);
    }

    #[tokio::test]
    async fn address_is_free_again_after_regenerate() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mut lifecycle = MailboxLifecycle::new(Arc::new(store), 600);

        lifecycle.generate("foo").await.unwrap();
        lifecycle.regenerate().await;
        assert!(lifecycle.generate("foo").await.is_ok());
    }

    #[test]
    fn countdown_formats_with_padded_seconds() {
        assert_eq!(format_countdown(600), "10:00");
        assert_eq!(format_countdown(65), "1:05");
        assert_eq!(format_countdown(9), "0:09");
        assert_eq!(format_countdown(0), "0:00");
    }
}
