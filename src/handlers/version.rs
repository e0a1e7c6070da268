use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{error::Result, state::AppState};

/// The query parameters for the version endpoint.
#[derive(Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// Reports the short hash of the latest deployed revision.
///
/// Never fails: the cache absorbs every fetch problem and the reason, if
/// any, rides along as `fallback_reason`.
#[axum::debug_handler]
pub async fn get_version(
    State(state): State<AppState>,
    Query(query): Query<VersionQuery>,
) -> Result<Response> {
    let hash = if query.refresh {
        state.version.force_refresh().await
    } else {
        state.version.latest(false).await
    };

    let fallback_reason = state.version.last_failure().await;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "hash": hash,
        "stale": fallback_reason.is_some(),
        "fallback_reason": fallback_reason.map(|r| r.to_string()),
    }))
    .unwrap();

    Ok((StatusCode::OK, body).into_response())
}
