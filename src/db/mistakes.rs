//! Mistake record storage
//!
//! Repository over the `mistakes` table. `tags` is stored as a JSON-encoded
//! array of label strings and is always written together with `analysis`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// One stored question entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mistake {
    pub id: i64,
    pub content: String,
    pub image_path: Option<String>,
    pub created_at: String,
    /// JSON array of labels, NULL until analyzed
    pub tags: Option<String>,
    pub analysis: Option<String>,
}

impl Mistake {
    /// Parse the stored tags column into a list, empty when absent.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .and_then(|t| serde_json::from_str(t).ok())
            .unwrap_or_default()
    }

    /// Whether the tagging handler has already processed this record.
    pub fn is_analyzed(&self) -> bool {
        self.tags.is_some() && self.analysis.is_some()
    }
}

/// Timestamp format used for storage and display
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Mistake repository
pub struct MistakeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MistakeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a specific record
    pub async fn get(&self, id: i64) -> Result<Option<Mistake>> {
        let mistake = sqlx::query_as::<_, Mistake>(
            r#"
            SELECT id, content, image_path, created_at, tags, analysis
            FROM mistakes
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(mistake)
    }

    /// List all records, newest first
    pub async fn list(&self) -> Result<Vec<Mistake>> {
        let mistakes = sqlx::query_as::<_, Mistake>(
            r#"
            SELECT id, content, image_path, created_at, tags, analysis
            FROM mistakes
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(mistakes)
    }

    /// Fetch records for a list of ids, preserving caller order.
    /// Ids with no matching row are silently skipped.
    pub async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Mistake>> {
        let mut mistakes = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(mistake) = self.get(id).await? {
                mistakes.push(mistake);
            }
        }
        Ok(mistakes)
    }

    /// Create a new record; `content` must be non-empty (handlers validate)
    pub async fn create(&self, content: &str, image_path: Option<&str>) -> Result<Mistake> {
        let now = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO mistakes (content, image_path, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(content)
        .bind(image_path)
        .bind(&now)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await?.ok_or_else(|| {
            crate::error::AppError::Database(sqlx::Error::RowNotFound)
        })
    }

    /// Overwrite a record's content. Tags and analysis are deliberately left
    /// untouched; see DESIGN.md for the staleness decision.
    pub async fn update_content(&self, id: i64, content: &str) -> Result<Option<Mistake>> {
        sqlx::query("UPDATE mistakes SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(self.pool)
            .await?;

        self.get(id).await
    }

    /// Persist tagging output. Both columns are written in one statement so
    /// a record is never left half-analyzed.
    pub async fn set_analysis(&self, id: i64, tags_json: &str, analysis: &str) -> Result<()> {
        sqlx::query("UPDATE mistakes SET tags = ?, analysis = ? WHERE id = ?")
            .bind(tags_json)
            .bind(analysis)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete a record, reporting whether it existed
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mistakes WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete many records in one statement, returning rows removed
    pub async fn delete_many(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!("DELETE FROM mistakes WHERE id IN ({})", placeholders);

        let mut sql_query = sqlx::query(&query);
        for &id in ids {
            sql_query = sql_query.bind(id);
        }

        let result = sql_query.execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use tempfile::TempDir;

    async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}/test.db", dir.path().display());
        let pool = create_pool(&url).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn create_and_get() {
        let (_dir, pool) = test_pool().await;
        let repo = MistakeRepository::new(&pool);

        let created = repo.create("2+2=?", None).await.unwrap();
        assert_eq!(created.content, "2+2=?");
        assert!(created.image_path.is_none());
        assert!(created.tags.is_none());
        assert!(created.analysis.is_none());
        assert!(!created.is_analyzed());

        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "2+2=?");
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (_dir, pool) = test_pool().await;
        let repo = MistakeRepository::new(&pool);

        let first = repo.create("first", None).await.unwrap();
        let second = repo.create("second", None).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        // Same-second inserts fall back to id ordering
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn tags_round_trip() {
        let (_dir, pool) = test_pool().await;
        let repo = MistakeRepository::new(&pool);

        let m = repo.create("solve x^2 - 1 = 0", None).await.unwrap();
        let tags = vec!["代数".to_string(), "一元二次方程".to_string()];
        let tags_json = serde_json::to_string(&tags).unwrap();

        repo.set_analysis(m.id, &tags_json, "factor the difference of squares")
            .await
            .unwrap();

        let fetched = repo.get(m.id).await.unwrap().unwrap();
        assert!(fetched.is_analyzed());
        assert_eq!(fetched.tag_list(), tags);
    }

    #[tokio::test]
    async fn update_content_keeps_analysis() {
        let (_dir, pool) = test_pool().await;
        let repo = MistakeRepository::new(&pool);

        let m = repo.create("original", None).await.unwrap();
        repo.set_analysis(m.id, r#"["tag"]"#, "analysis").await.unwrap();

        let updated = repo.update_content(m.id, "edited").await.unwrap().unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.analysis.as_deref(), Some("analysis"));
    }

    #[tokio::test]
    async fn delete_many_ignores_missing_ids() {
        let (_dir, pool) = test_pool().await;
        let repo = MistakeRepository::new(&pool);

        let a = repo.create("a", None).await.unwrap();
        let b = repo.create("b", None).await.unwrap();

        let removed = repo.delete_many(&[a.id, b.id, 9999]).await.unwrap();
        assert_eq!(removed, 2);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_missing() {
        let (_dir, pool) = test_pool().await;
        let repo = MistakeRepository::new(&pool);

        assert!(!repo.delete(42).await.unwrap());
    }

    #[tokio::test]
    async fn list_by_ids_preserves_order() {
        let (_dir, pool) = test_pool().await;
        let repo = MistakeRepository::new(&pool);

        let a = repo.create("a", None).await.unwrap();
        let b = repo.create("b", None).await.unwrap();

        let fetched = repo.list_by_ids(&[b.id, 777, a.id]).await.unwrap();
        let ids: Vec<i64> = fetched.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
