use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Result,
    models::message::MailMessage,
    services::mailbox as mailbox_service,
    state::AppState,
};

/// The request payload for minting a mailbox.
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateMailboxRequest {
    pub local_part: String,
}

/// The response payload for a freshly minted mailbox.
#[derive(Serialize, Deserialize)]
pub struct MailboxResponse {
    pub id: Uuid,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

/// The response payload for a mailbox poll.
#[derive(Serialize, Deserialize)]
pub struct MessagesResponse {
    pub mailbox_id: Uuid,
    pub messages: Vec<MailMessage>,
    pub count: usize,
}

/// Mints a new disposable mailbox.
#[axum::debug_handler]
pub async fn create_mailbox(
    State(state): State<AppState>,
    Json(req): Json<CreateMailboxRequest>,
) -> Result<Response> {
    let mailbox = mailbox_service::create_mailbox(&state, &req.local_part).await?;

    tracing::info!("📬 Mailbox minted: {}", mailbox.address);

    let body = MailboxResponse {
        id: mailbox.id,
        ttl_seconds: mailbox.seconds_left(Utc::now()),
        address: mailbox.address,
        created_at: mailbox.created_at,
        expires_at: mailbox.expires_at,
    };

    Ok((StatusCode::CREATED, sonic_rs::to_string(&body).unwrap()).into_response())
}

/// Lists the messages delivered to a mailbox, newest first.
#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(mailbox_id): Path<Uuid>,
) -> Result<Response> {
    let messages = mailbox_service::list_messages(&state, mailbox_id).await?;

    let body = MessagesResponse {
        mailbox_id,
        count: messages.len(),
        messages,
    };

    Ok((StatusCode::OK, sonic_rs::to_string(&body).unwrap()).into_response())
}

/// Deletes a mailbox and everything delivered to it.
#[axum::debug_handler]
pub async fn delete_mailbox(
    State(state): State<AppState>,
    Path(mailbox_id): Path<Uuid>,
) -> Result<Response> {
    mailbox_service::delete_mailbox(&state, mailbox_id).await?;
    Ok((StatusCode::OK, r#"{"message":"Mailbox deleted"}"#).into_response())
}
