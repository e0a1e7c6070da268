use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::mailbox::Mailbox,
    models::message::MailMessage,
    state::AppState,
    validation::mailbox::validate_local_part,
};

/// Mints a new disposable mailbox for `<local_part>@<domain>`.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `local_part` - The user-chosen prefix, validated and trimmed here.
///
/// # Returns
///
/// A `Result` containing the created `Mailbox`; `Conflict` when the address
/// already has an active, unexpired mailbox.
pub async fn create_mailbox(state: &AppState, local_part: &str) -> Result<Mailbox> {
    let local_part = validate_local_part(local_part)?;

    state
        .store
        .create_mailbox(&local_part)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "An active mailbox for '{}' already exists",
                local_part
            ))
        })
}

/// Lists a mailbox's messages, newest first.
///
/// Fails with `NotFound` when the mailbox does not exist, expired, or was
/// deleted; the poller treats that as the session being over.
pub async fn list_messages(state: &AppState, mailbox_id: Uuid) -> Result<Vec<MailMessage>> {
    state
        .store
        .find_active(mailbox_id)
        .await?
        .ok_or(AppError::NotFound)?;

    state.store.messages_for(mailbox_id).await
}

/// Deletes a mailbox and its messages.
pub async fn delete_mailbox(state: &AppState, mailbox_id: Uuid) -> Result<()> {
    let removed = state.store.delete_mailbox(mailbox_id).await?;
    if !removed {
        return Err(AppError::NotFound);
    }
    tracing::info!("🗑️  Mailbox {} deleted", mailbox_id);
    Ok(())
}

/// Removes every expired mailbox row. Called by the background sweeper.
pub async fn sweep(state: &AppState) -> Result<u64> {
    state.store.sweep_expired().await
}
