//! Account rows. Policy (who may change whom) lives in the core crate; this
//! module is plain persistence.

use crate::error::StoreError;
use crate::models::User;
use crate::vault::Workspace;

pub async fn count_users(ws: &Workspace) -> Result<i64, StoreError> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(ws.pool())
        .await?)
}

pub async fn insert_user(
    ws: &Workspace,
    username: &str,
    password: &str,
    is_admin: bool,
    is_superadmin: bool,
) -> Result<i64, StoreError> {
    if find_by_username(ws, username).await?.is_some() {
        return Err(StoreError::DuplicateUsername(username.to_string()));
    }
    let res = sqlx::query(
        "INSERT INTO users (username, password, is_admin, is_superadmin, privileges) \
         VALUES (?, ?, ?, ?, '')",
    )
    .bind(username)
    .bind(password)
    .bind(is_admin)
    .bind(is_superadmin)
    .execute(ws.pool())
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_by_username(
    ws: &Workspace,
    username: &str,
) -> Result<Option<User>, StoreError> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, username, password, is_admin, is_superadmin, privileges \
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(ws.pool())
    .await?)
}

pub async fn find_user(ws: &Workspace, id: i64) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, password, is_admin, is_superadmin, privileges \
         FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(ws.pool())
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("user id {id}")))
}

pub async fn list_users(ws: &Workspace) -> Result<Vec<User>, StoreError> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, username, password, is_admin, is_superadmin, privileges \
         FROM users ORDER BY id",
    )
    .fetch_all(ws.pool())
    .await?)
}

pub async fn set_admin(ws: &Workspace, id: i64, is_admin: bool) -> Result<(), StoreError> {
    let res = sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
        .bind(is_admin)
        .bind(id)
        .execute(ws.pool())
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("user id {id}")));
    }
    Ok(())
}

pub async fn set_privileges(ws: &Workspace, id: i64, privileges: &str) -> Result<(), StoreError> {
    let res = sqlx::query("UPDATE users SET privileges = ? WHERE id = ?")
        .bind(privileges)
        .bind(id)
        .execute(ws.pool())
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("user id {id}")));
    }
    Ok(())
}

pub async fn delete_user(ws: &Workspace, id: i64) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(ws.pool())
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("user id {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault;
    use bw_crypto::kdf::vault_key_from_credentials;
    use tempfile::tempdir;

    async fn open_store(dir: &std::path::Path) -> Workspace {
        let key = vault_key_from_credentials("t", "t");
        vault::open(&dir.join("b.db.enc"), &dir.join("b.db"), key)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;

        insert_user(&ws, "alice", "pw", true, true).await.unwrap();
        let err = insert_user(&ws, "alice", "other", false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(_)));
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn flags_and_privileges_roundtrip() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;

        let id = insert_user(&ws, "bob", "pw", false, false).await.unwrap();
        set_admin(&ws, id, true).await.unwrap();
        set_privileges(&ws, id, "db,reader").await.unwrap();

        let u = find_user(&ws, id).await.unwrap();
        assert!(u.is_admin);
        assert!(!u.is_superadmin);
        assert_eq!(u.privileges, "db,reader");

        delete_user(&ws, id).await.unwrap();
        assert!(matches!(
            find_user(&ws, id).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        ws.persist().await.unwrap();
    }
}
