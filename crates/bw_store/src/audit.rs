//! Append-only audit log. Rows are never updated or deleted.

use chrono::Utc;
use tracing::debug;

use crate::error::StoreError;
use crate::models::LogEntry;
use crate::vault::Workspace;

pub async fn record(
    ws: &Workspace,
    user_id: Option<i64>,
    action: &str,
) -> Result<(), StoreError> {
    debug!(user_id, action, "audit");
    sqlx::query("INSERT INTO logs (user_id, action, timestamp) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(action)
        .bind(Utc::now())
        .execute(ws.pool())
        .await?;
    Ok(())
}

/// The most recent entries, newest first.
pub async fn recent(ws: &Workspace, limit: i64) -> Result<Vec<LogEntry>, StoreError> {
    Ok(sqlx::query_as::<_, LogEntry>(
        "SELECT id, user_id, action, timestamp FROM logs ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(ws.pool())
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault;
    use bw_crypto::kdf::vault_key_from_credentials;
    use tempfile::tempdir;

    #[tokio::test]
    async fn entries_come_back_newest_first() {
        let dir = tempdir().unwrap();
        let key = vault_key_from_credentials("t", "t");
        let ws = vault::open(&dir.path().join("b.db.enc"), &dir.path().join("b.db"), key)
            .await
            .unwrap();

        record(&ws, Some(1), "login (user: alice)").await.unwrap();
        record(&ws, None, "failed_login (user: mallory)").await.unwrap();

        let entries = recent(&ws, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "failed_login (user: mallory)");
        assert_eq!(entries[0].user_id, None);
        assert_eq!(entries[1].user_id, Some(1));

        let one = recent(&ws, 1).await.unwrap();
        assert_eq!(one.len(), 1);
        ws.persist().await.unwrap();
    }
}
