use async_trait::async_trait;
use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::{
    error::Result,
    models::mailbox::Mailbox,
    models::message::{MailMessage, NewMessage},
    repositories::{mailbox as mailbox_repo, message as message_repo},
    storage::{MailboxStore, SessionBackend},
};

/// The PostgreSQL-backed mailbox store used by the server.
pub struct PgStore {
    db: Pool,
    domain: String,
    ttl_secs: i64,
}

impl PgStore {
    pub fn new(db: Pool, domain: String, ttl_secs: u32) -> Self {
        Self {
            db,
            domain,
            ttl_secs: i64::from(ttl_secs),
        }
    }
}

#[async_trait]
impl SessionBackend for PgStore {
    async fn create_mailbox(&self, local_part: &str) -> Result<Option<Mailbox>> {
        let address = format!("{}@{}", local_part, self.domain);
        mailbox_repo::create(&self.db, &address, self.ttl_secs).await
    }

    async fn delete_mailbox(&self, id: Uuid) -> Result<bool> {
        mailbox_repo::delete(&self.db, &id).await
    }

    async fn messages_for(&self, mailbox_id: Uuid) -> Result<Vec<MailMessage>> {
        message_repo::for_mailbox(&self.db, &mailbox_id).await
    }
}

#[async_trait]
impl MailboxStore for PgStore {
    async fn find_active(&self, id: Uuid) -> Result<Option<Mailbox>> {
        mailbox_repo::find_active(&self.db, &id).await
    }

    async fn find_active_by_address(&self, address: &str) -> Result<Option<Mailbox>> {
        mailbox_repo::find_active_by_address(&self.db, address).await
    }

    async fn ingest_message(&self, mailbox_id: Uuid, message: NewMessage) -> Result<MailMessage> {
        message_repo::insert(&self.db, &mailbox_id, message).await
    }

    async fn sweep_expired(&self) -> Result<u64> {
        mailbox_repo::sweep_expired(&self.db).await
    }
}
