use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::{
    error::Result,
    models::message::{MailMessage, NewMessage},
};

/// Lists every message delivered to a mailbox, newest first.
pub async fn for_mailbox(pool: &Pool, mailbox_id: &Uuid) -> Result<Vec<MailMessage>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT id, temp_email_id, sender_email, sender_name, subject,
                   body_text, body_html, received_at
            FROM temp_email_messages
            WHERE temp_email_id = $1
            ORDER BY received_at DESC
            "#,
            &[mailbox_id],
        )
        .await?;
    Ok(rows.iter().map(MailMessage::from).collect())
}

/// Inserts a newly received message for a mailbox.
pub async fn insert(
    pool: &Pool,
    mailbox_id: &Uuid,
    message: NewMessage,
) -> Result<MailMessage> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO temp_email_messages
                (id, temp_email_id, sender_email, sender_name, subject, body_text, body_html)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, temp_email_id, sender_email, sender_name, subject,
                      body_text, body_html, received_at
            "#,
            &[
                &Uuid::new_v4(),
                mailbox_id,
                &message.sender_email,
                &message.sender_name,
                &message.subject,
                &message.body_text,
                &message.body_html,
            ],
        )
        .await?;
    Ok(MailMessage::from(&row))
}
