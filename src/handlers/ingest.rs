use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::{
    error::Result,
    services::ingest::{self as ingest_service, EmailWebhookPayload, IngestOutcome},
    state::AppState,
};

/// The header carrying the shared webhook secret, when one is configured.
const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Receives an inbound email from the mail provider's webhook.
///
/// Contract: 200 with the stored message id on delivery, 404 when no
/// active mailbox matches the recipient, 500 on storage failure. The
/// client's polling model depends on exactly this behavior.
#[axum::debug_handler]
pub async fn receive_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EmailWebhookPayload>,
) -> Result<Response> {
    if let Some(expected) = &state.config.webhook_token {
        let provided = headers
            .get(WEBHOOK_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let matches: bool = expected
            .as_bytes()
            .ct_eq(provided.as_bytes())
            .into();
        if !matches {
            tracing::warn!("Webhook call with missing or bad token");
            return Ok((
                StatusCode::UNAUTHORIZED,
                r#"{"error":"Invalid webhook token"}"#,
            )
                .into_response());
        }
    }

    tracing::debug!("Received email webhook: to={} from={}", payload.to, payload.from);

    match ingest_service::ingest(&state, payload).await? {
        IngestOutcome::NoActiveMailbox => Ok((
            StatusCode::NOT_FOUND,
            r#"{"message":"Email not found or expired"}"#,
        )
            .into_response()),
        IngestOutcome::Stored(message) => {
            let body = sonic_rs::to_string(&sonic_rs::json!({
                "message": "Email received and saved successfully",
                "id": message.id.to_string(),
            }))
            .unwrap();
            Ok((StatusCode::OK, body).into_response())
        }
    }
}
