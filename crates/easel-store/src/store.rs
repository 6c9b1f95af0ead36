//! Image store
//!
//! SQLite records for every generated image, the lineage edges between
//! them, and the saved flag plus blob location for images the user kept.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use easel_canvas::{
    EntityId, ImageStore, LineageRecorder, RelationshipKind, SaveRequest, SavedImage,
};

use crate::config::StorageConfig;
use crate::error::Result;
use crate::media::MediaStore;

/// A row of the `images` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Image id
    pub id: String,
    /// Prompt the image was generated from
    pub prompt: String,
    /// Whether the user saved the image
    pub saved: bool,
    /// Where the blob was written, once saved
    pub storage_path: Option<String>,
}

/// A row of the `image_relationships` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRecord {
    /// Source image
    pub source_id: String,
    /// Derived image
    pub target_id: String,
    /// Relationship kind
    pub kind: String,
}

/// SQLite-backed image store
#[derive(Debug, Clone)]
pub struct SqliteImageStore {
    pool: SqlitePool,
    media: MediaStore,
}

impl SqliteImageStore {
    /// Create a store over an existing pool
    #[must_use]
    pub fn new(pool: SqlitePool, media: MediaStore) -> Self {
        Self { pool, media }
    }

    /// Open the configured database, creating it if needed, and initialise the schema
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::new(pool, MediaStore::new(config)?);
        store.init().await?;
        info!(database = %config.database_url, media_dir = %config.media_dir.display(), "image store ready");
        Ok(store)
    }

    /// Media blob store
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Initialize the database schema
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id TEXT PRIMARY KEY,
                prompt TEXT NOT NULL DEFAULT '',
                saved INTEGER NOT NULL DEFAULT 0,
                storage_path TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS image_relationships (
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (source_id, target_id, kind)
            );

            CREATE INDEX IF NOT EXISTS idx_images_saved ON images(saved, updated_at);
            CREATE INDEX IF NOT EXISTS idx_relationships_target ON image_relationships(target_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert an image record unless one exists
    pub async fn insert_image(&self, id: &str, prompt: &str) -> Result<()> {
        let now = timestamp();
        sqlx::query(
            r#"
            INSERT INTO images (id, prompt, saved, storage_path, created_at, updated_at)
            VALUES (?, ?, 0, NULL, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(prompt)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a relationship edge; duplicates are ignored
    pub async fn insert_relationship(&self, source: &str, target: &str, kind: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO image_relationships (source_id, target_id, kind, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(source)
        .bind(target)
        .bind(kind)
        .bind(timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Write the blob for `src` and mark the image saved.
    ///
    /// Creates the record if the image was never recorded. An empty prompt
    /// keeps the prompt already on file.
    #[instrument(skip(self, src, prompt))]
    pub async fn save(&self, id: &str, src: &str, prompt: &str) -> Result<()> {
        let path = self.media.store(id, src).await?;
        let storage_path = path.to_string_lossy().into_owned();
        let now = timestamp();

        sqlx::query(
            r#"
            INSERT INTO images (id, prompt, saved, storage_path, created_at, updated_at)
            VALUES (?, ?, 1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                saved = 1,
                storage_path = excluded.storage_path,
                prompt = CASE WHEN excluded.prompt = '' THEN images.prompt ELSE excluded.prompt END,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(prompt)
        .bind(&storage_path)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(image_id = id, storage_path = %storage_path, "image marked saved");
        Ok(())
    }

    /// Saved images, newest first
    pub async fn list_saved(&self) -> Result<Vec<SavedImage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, prompt, storage_path
            FROM images
            WHERE saved = 1 AND storage_path IS NOT NULL
            ORDER BY updated_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let prompt: String = row.get("prompt");
                let storage_path: String = row.get("storage_path");
                SavedImage {
                    id: EntityId::new(id),
                    prompt,
                    url: self.media.public_url(&storage_path),
                }
            })
            .collect())
    }

    /// Look up one image record
    pub async fn get_image(&self, id: &str) -> Result<Option<ImageRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, prompt, saved, storage_path
            FROM images
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ImageRecord {
            id: row.get("id"),
            prompt: row.get("prompt"),
            saved: row.get::<i64, _>("saved") != 0,
            storage_path: row.get("storage_path"),
        }))
    }

    /// Relationships where `id` is the source or the target
    pub async fn relationships_of(&self, id: &str) -> Result<Vec<RelationshipRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT source_id, target_id, kind
            FROM image_relationships
            WHERE source_id = ? OR target_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(id)
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RelationshipRecord {
                source_id: row.get("source_id"),
                target_id: row.get("target_id"),
                kind: row.get("kind"),
            })
            .collect())
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn save_image(&self, request: SaveRequest) -> easel_canvas::Result<()> {
        self.save(request.id.as_str(), &request.src, &request.prompt)
            .await
            .map_err(Into::into)
    }

    async fn list_saved_images(&self) -> Vec<SavedImage> {
        self.list_saved().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to list saved images");
            Vec::new()
        })
    }
}

#[async_trait]
impl LineageRecorder for SqliteImageStore {
    async fn record_image(&self, id: &EntityId, prompt: &str) -> easel_canvas::Result<()> {
        self.insert_image(id.as_str(), prompt)
            .await
            .map_err(Into::into)
    }

    async fn record_relationship(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: RelationshipKind,
    ) -> easel_canvas::Result<()> {
        self.insert_relationship(source.as_str(), target.as_str(), kind.as_str())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    async fn setup_test_db() -> (SqliteImageStore, PathBuf) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let media_dir = std::env::temp_dir().join(format!("easel-store-{}", uuid::Uuid::new_v4()));
        let config = StorageConfig {
            media_dir: media_dir.clone(),
            ..StorageConfig::default()
        };
        let store = SqliteImageStore::new(pool, MediaStore::new(&config).unwrap());
        store.init().await.unwrap();
        (store, media_dir)
    }

    #[tokio::test]
    async fn test_store_init_is_idempotent() {
        let (store, _) = setup_test_db().await;
        store.init().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_writes_blob_and_lists_newest_first() {
        let (store, media_dir) = setup_test_db().await;

        store.save("a", PNG, "first").await.unwrap();
        store.save("b", PNG, "second").await.unwrap();

        let saved = store.list_saved().await.unwrap();
        let ids: Vec<_> = saved.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(saved[0].url, "/media/b.png");
        assert_eq!(saved[1].prompt, "first");
        assert!(media_dir.join("a.png").exists());

        tokio::fs::remove_dir_all(&media_dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_recorded_image_keeps_prompt_when_saved_without_one() {
        let (store, media_dir) = setup_test_db().await;

        store
            .record_image(&EntityId::from("g1"), "a lighthouse")
            .await
            .unwrap();
        let record = store.get_image("g1").await.unwrap().unwrap();
        assert!(!record.saved);
        assert!(store.list_saved().await.unwrap().is_empty());

        store.save("g1", PNG, "").await.unwrap();
        let record = store.get_image("g1").await.unwrap().unwrap();
        assert!(record.saved);
        assert_eq!(record.prompt, "a lighthouse");
        assert!(record.storage_path.unwrap().ends_with("g1.png"));

        tokio::fs::remove_dir_all(&media_dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_relationships_recorded_once() {
        let (store, _) = setup_test_db().await;
        let parent = EntityId::from("parent");
        let child = EntityId::from("child");

        store
            .record_relationship(&parent, &child, RelationshipKind::Variation)
            .await
            .unwrap();
        store
            .record_relationship(&parent, &child, RelationshipKind::Variation)
            .await
            .unwrap();

        let edges = store.relationships_of("child").await.unwrap();
        assert_eq!(
            edges,
            vec![RelationshipRecord {
                source_id: "parent".to_string(),
                target_id: "child".to_string(),
                kind: "variation".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_save_is_upstream_error() {
        let (store, _) = setup_test_db().await;
        let err = store
            .save_image(SaveRequest {
                id: EntityId::from("x"),
                src: "/no/such/file.png".to_string(),
                prompt: "p".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, easel_canvas::Error::Upstream(_)));
        assert!(store.get_image("x").await.unwrap().is_none());
    }
}
