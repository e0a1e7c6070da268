use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::{
    error::Result,
    models::mailbox::Mailbox,
    models::message::{MailMessage, NewMessage},
    storage::{MailboxStore, SessionBackend},
};

#[derive(Default)]
struct Inner {
    mailboxes: HashMap<Uuid, Mailbox>,
    messages: HashMap<Uuid, Vec<MailMessage>>,
}

/// An in-memory mailbox store.
///
/// Mirrors the PostgreSQL semantics closely enough for the test suite: the
/// address-uniqueness invariant is checked under the same write lock as the
/// insert, and deleting a mailbox drops its messages the way the cascade
/// does.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    domain: String,
    ttl_secs: u32,
}

impl MemoryStore {
    pub fn new(domain: impl Into<String>, ttl_secs: u32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            domain: domain.into(),
            ttl_secs,
        }
    }

    /// Returns the number of mailbox rows currently stored, expired or not.
    pub async fn mailbox_count(&self) -> usize {
        self.inner.read().await.mailboxes.len()
    }
}

#[async_trait]
impl SessionBackend for MemoryStore {
    async fn create_mailbox(&self, local_part: &str) -> Result<Option<Mailbox>> {
        let address = format!("{}@{}", local_part, self.domain);
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        // Unswept expired rows lose the address, matching the deactivation
        // pass the SQL path runs before its insert.
        for mailbox in inner.mailboxes.values_mut() {
            if mailbox.address == address && mailbox.expires_at <= now {
                mailbox.is_active = false;
            }
        }

        let conflict = inner
            .mailboxes
            .values()
            .any(|m| m.address == address && m.is_active && m.expires_at > now);
        if conflict {
            return Ok(None);
        }

        let mailbox = Mailbox {
            id: Uuid::new_v4(),
            address,
            is_active: true,
            created_at: now,
            expires_at: now + Duration::seconds(i64::from(self.ttl_secs)),
        };
        inner.mailboxes.insert(mailbox.id, mailbox.clone());
        inner.messages.insert(mailbox.id, Vec::new());
        Ok(Some(mailbox))
    }

    async fn delete_mailbox(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.messages.remove(&id);
        Ok(inner.mailboxes.remove(&id).is_some())
    }

    async fn messages_for(&self, mailbox_id: Uuid) -> Result<Vec<MailMessage>> {
        let inner = self.inner.read().await;
        let mut messages = inner
            .messages
            .get(&mailbox_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(messages)
    }
}

#[async_trait]
impl MailboxStore for MemoryStore {
    async fn find_active(&self, id: Uuid) -> Result<Option<Mailbox>> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        Ok(inner
            .mailboxes
            .get(&id)
            .filter(|m| m.is_active && m.expires_at > now)
            .cloned())
    }

    async fn find_active_by_address(&self, address: &str) -> Result<Option<Mailbox>> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        Ok(inner
            .mailboxes
            .values()
            .find(|m| m.address == address && m.is_active && m.expires_at > now)
            .cloned())
    }

    async fn ingest_message(&self, mailbox_id: Uuid, message: NewMessage) -> Result<MailMessage> {
        let mut inner = self.inner.write().await;
        let stored = MailMessage {
            id: Uuid::new_v4(),
            mailbox_id,
            sender_email: message.sender_email,
            sender_name: message.sender_name,
            subject: message.subject,
            body_text: message.body_text,
            body_html: message.body_html,
            received_at: Utc::now(),
        };
        inner
            .messages
            .entry(mailbox_id)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn sweep_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let expired: Vec<Uuid> = inner
            .mailboxes
            .values()
            .filter(|m| m.expires_at <= now)
            .map(|m| m.id)
            .collect();
        for id in &expired {
            inner.mailboxes.remove(id);
            inner.messages.remove(id);
        }
        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(subject: &str) -> NewMessage {
        NewMessage {
            sender_email: "sender@example.com".to_string(),
            sender_name: None,
            subject: subject.to_string(),
            body_text: Some("body".to_string()),
            body_html: None,
        }
    }

    #[tokio::test]
    async fn second_creation_for_same_address_conflicts() {
        let store = MemoryStore::new("lorza.pl", 600);
        let first = store.create_mailbox("foo").await.unwrap();
        assert!(first.is_some());
        let second = store.create_mailbox("foo").await.unwrap();
        assert!(second.is_none());
        assert_eq!(store.mailbox_count().await, 1);
    }

    #[tokio::test]
    async fn expired_mailbox_frees_its_address() {
        let store = MemoryStore::new("lorza.pl", 0);
        let first = store.create_mailbox("foo").await.unwrap().unwrap();
        // ttl 0 means the first row is already expired.
        let second = store.create_mailbox("foo").await.unwrap();
        assert!(second.is_some());
        assert!(store.find_active(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mailbox = store.create_mailbox("foo").await.unwrap().unwrap();
        store
            .ingest_message(mailbox.id, new_message("hi"))
            .await
            .unwrap();
        assert!(store.delete_mailbox(mailbox.id).await.unwrap());
        assert!(store.messages_for(mailbox.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_come_back_newest_first() {
        let store = MemoryStore::new("lorza.pl", 600);
        let mailbox = store.create_mailbox("foo").await.unwrap().unwrap();
        store
            .ingest_message(mailbox.id, new_message("first"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .ingest_message(mailbox.id, new_message("second"))
            .await
            .unwrap();
        let messages = store.messages_for(mailbox.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].subject, "second");
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let short = MemoryStore::new("lorza.pl", 600);
        short.create_mailbox("keep").await.unwrap();
        assert_eq!(short.sweep_expired().await.unwrap(), 0);

        let expired = MemoryStore::new("lorza.pl", 0);
        expired.create_mailbox("gone").await.unwrap();
        assert_eq!(expired.sweep_expired().await.unwrap(), 1);
        assert_eq!(expired.mailbox_count().await, 0);
    }
}
