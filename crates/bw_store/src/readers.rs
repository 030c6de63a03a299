//! Reader (patron) registry.

use crate::error::StoreError;
use crate::models::Reader;
use crate::vault::Workspace;

/// Register a reader. All three fields are required.
pub async fn add_reader(
    ws: &Workspace,
    name: &str,
    surname: &str,
    grade: &str,
) -> Result<i64, StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::EmptyField("name"));
    }
    if surname.trim().is_empty() {
        return Err(StoreError::EmptyField("surname"));
    }
    if grade.trim().is_empty() {
        return Err(StoreError::EmptyField("grade"));
    }
    let res = sqlx::query("INSERT INTO readers (name, surname, grade) VALUES (?, ?, ?)")
        .bind(name)
        .bind(surname)
        .bind(grade)
        .execute(ws.pool())
        .await?;
    Ok(res.last_insert_rowid())
}

/// List readers, optionally narrowed by a case-insensitive substring match
/// against name or surname.
pub async fn list_readers(
    ws: &Workspace,
    needle: Option<&str>,
) -> Result<Vec<Reader>, StoreError> {
    let all = sqlx::query_as::<_, Reader>(
        "SELECT id, name, surname, grade FROM readers ORDER BY id",
    )
    .fetch_all(ws.pool())
    .await?;

    Ok(match needle {
        Some(n) if !n.trim().is_empty() => {
            let n = n.to_lowercase();
            all.into_iter()
                .filter(|r| {
                    r.name.to_lowercase().contains(&n)
                        || r.surname.to_lowercase().contains(&n)
                })
                .collect()
        }
        _ => all,
    })
}

pub async fn find_reader(ws: &Workspace, id: i64) -> Result<Reader, StoreError> {
    sqlx::query_as::<_, Reader>("SELECT id, name, surname, grade FROM readers WHERE id = ?")
        .bind(id)
        .fetch_optional(ws.pool())
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("reader id {id}")))
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
    async fn add_requires_all_fields() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;
        let err = add_reader(&ws, "Ann", "", "3a").await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyField("surname")));
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn search_matches_name_or_surname() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;

        add_reader(&ws, "Anna", "Kowalska", "3a").await.unwrap();
        add_reader(&ws, "Piotr", "Nowak", "2b").await.unwrap();

        let hits = list_readers(&ws, Some("kowal")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Anna");

        let hits = list_readers(&ws, Some("PIOTR")).await.unwrap();
        assert_eq!(hits.len(), 1);

        let all = list_readers(&ws, None).await.unwrap();
        assert_eq!(all.len(), 2);
        ws.persist().await.unwrap();
    }
}
