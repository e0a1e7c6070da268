use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    handlers::mailbox::{CreateMailboxRequest, MailboxResponse, MessagesResponse},
    models::mailbox::Mailbox,
    models::message::MailMessage,
    storage::SessionBackend,
};

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// A [`SessionBackend`] over the server's HTTP API, used by the mailbox CLI.
pub struct ApiStore {
    http: reqwest::Client,
    base_url: String,
}

impl ApiStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn error_message(response: reqwest::Response) -> String {
        match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "request rejected by server".to_string(),
        }
    }
}

#[async_trait]
impl SessionBackend for ApiStore {
    async fn create_mailbox(&self, local_part: &str) -> Result<Option<Mailbox>> {
        let response = self
            .http
            .post(format!("{}/api/mailbox", self.base_url))
            .json(&CreateMailboxRequest {
                local_part: local_part.to_string(),
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                let body: MailboxResponse = response.json().await?;
                Ok(Some(Mailbox {
                    id: body.id,
                    address: body.address,
                    is_active: true,
                    created_at: body.created_at,
                    expires_at: body.expires_at,
                }))
            }
            StatusCode::CONFLICT => Ok(None),
            StatusCode::BAD_REQUEST => {
                Err(AppError::Validation(Self::error_message(response).await))
            }
            status => Err(AppError::Internal(format!(
                "mailbox creation failed with status {status}"
            ))),
        }
    }

    async fn delete_mailbox(&self, id: Uuid) -> Result<bool> {
        let response = self
            .http
            .delete(format!("{}/api/mailbox/{}", self.base_url, id))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AppError::Internal(format!(
                "mailbox deletion failed with status {status}"
            ))),
        }
    }

    async fn messages_for(&self, mailbox_id: Uuid) -> Result<Vec<MailMessage>> {
        let response = self
            .http
            .get(format!(
                "{}/api/mailbox/{}/messages",
                self.base_url, mailbox_id
            ))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: MessagesResponse = response.json().await?;
                Ok(body.messages)
            }
            // The mailbox is gone server-side; the session will notice on
            // its own countdown.
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status => Err(AppError::Internal(format!(
                "message poll failed with status {status}"
            ))),
        }
    }
}
