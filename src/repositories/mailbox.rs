use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::{error::Result, models::mailbox::Mailbox};

/// Creates a new mailbox, or returns `None` when an active mailbox with the
/// same address already exists.
///
/// The uniqueness check is not check-then-act: insertion races on the
/// partial unique index over active addresses, so exactly one of two
/// concurrent creations wins. Expired rows that the sweeper has not reached
/// yet are deactivated first so they cannot block the address.
pub async fn create(pool: &Pool, address: &str, ttl_secs: i64) -> Result<Option<Mailbox>> {
    let client = pool.get().await?;

    client
        .execute(
            r#"
            UPDATE temp_emails
            SET is_active = false
            WHERE email_address = $1 AND is_active AND expires_at <= NOW()
            "#,
            &[&address],
        )
        .await?;

    let row = client
        .query_opt(
            r#"
            INSERT INTO temp_emails (id, email_address, is_active, expires_at)
            VALUES ($1, $2, true, NOW() + make_interval(secs => $3::double precision))
            ON CONFLICT (email_address) WHERE is_active DO NOTHING
            RETURNING id, email_address, is_active, created_at, expires_at
            "#,
            &[&Uuid::new_v4(), &address, &ttl_secs],
        )
        .await?;

    Ok(row.map(|r| Mailbox::from(&r)))
}

/// Finds an active, non-expired mailbox by its ID.
pub async fn find_active(pool: &Pool, id: &Uuid) -> Result<Option<Mailbox>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, email_address, is_active, created_at, expires_at
            FROM temp_emails
            WHERE id = $1 AND is_active AND expires_at > NOW()
            "#,
            &[id],
        )
        .await?;
    Ok(row.map(|r| Mailbox::from(&r)))
}

/// Finds an active, non-expired mailbox by its full address.
pub async fn find_active_by_address(pool: &Pool, address: &str) -> Result<Option<Mailbox>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, email_address, is_active, created_at, expires_at
            FROM temp_emails
            WHERE email_address = $1 AND is_active AND expires_at > NOW()
            "#,
            &[&address],
        )
        .await?;
    Ok(row.map(|r| Mailbox::from(&r)))
}

/// Deletes a mailbox row. Messages cascade with it.
///
/// Returns whether a row was actually removed.
pub async fn delete(pool: &Pool, id: &Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let affected = client
        .execute("DELETE FROM temp_emails WHERE id = $1", &[id])
        .await?;
    Ok(affected > 0)
}

/// Removes every mailbox whose expiry has passed.
///
/// Returns the number of rows swept.
pub async fn sweep_expired(pool: &Pool) -> Result<u64> {
    let client = pool.get().await?;
    let affected = client
        .execute("DELETE FROM temp_emails WHERE expires_at <= NOW()", &[])
        .await?;
    Ok(affected)
}
