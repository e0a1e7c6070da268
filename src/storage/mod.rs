pub mod api;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;
use crate::{
    error::Result,
    models::mailbox::Mailbox,
    models::message::{MailMessage, NewMessage},
};

/// The slice of the storage collaborator a mailbox session needs.
///
/// The CLI implements this over the server's HTTP API; the server-side
/// stores get it for free as a supertrait of [`MailboxStore`].
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Creates a mailbox for `<local_part>@<domain>`, or returns `None` on
    /// an address conflict.
    async fn create_mailbox(&self, local_part: &str) -> Result<Option<Mailbox>>;

    /// Deletes a mailbox and, transitively, its messages. Returns whether a
    /// row was removed.
    async fn delete_mailbox(&self, id: Uuid) -> Result<bool>;

    /// Lists a mailbox's messages, newest first.
    async fn messages_for(&self, mailbox_id: Uuid) -> Result<Vec<MailMessage>>;
}

/// The full storage collaborator behind the mailbox feature.
///
/// The server wires this to PostgreSQL; tests run against the in-memory
/// backend. `create_mailbox` is the one operation with non-obvious
/// semantics: it must be atomic, returning `None` when an active mailbox
/// with the same address already exists, with no window in which two
/// callers can both succeed.
#[async_trait]
pub trait MailboxStore: SessionBackend {
    /// Finds an active, non-expired mailbox by ID.
    async fn find_active(&self, id: Uuid) -> Result<Option<Mailbox>>;

    /// Finds an active, non-expired mailbox by full address.
    async fn find_active_by_address(&self, address: &str) -> Result<Option<Mailbox>>;

    /// Stores a message delivered to a mailbox.
    async fn ingest_message(&self, mailbox_id: Uuid, message: NewMessage) -> Result<MailMessage>;

    /// Removes every expired mailbox. Returns the number swept.
    async fn sweep_expired(&self) -> Result<u64>;
}
