//! Preview persistence contract
//!
//! The compositor never stores anything itself. A saved preview is the current
//! placement plus references to the two images, handed to a [`PreviewStore`].

use crate::{
    error::{Result, TryOnError},
    types::{ImageReference, PlacementState},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Saved try-on preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub base: ImageReference,
    pub overlay: ImageReference,
    pub placement: PlacementState,
}

impl PreviewRecord {
    #[must_use]
    pub fn new(base: ImageReference, overlay: ImageReference, placement: PlacementState) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            base,
            overlay,
            placement,
        }
    }
}

/// Destination for saved previews
#[async_trait]
pub trait PreviewStore: Send + Sync {
    async fn save(&self, record: &PreviewRecord) -> Result<()>;
}

/// Writes each record as `<id>.json` into a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a record is written to
    #[must_use]
    pub fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Read a previously saved record back
    pub async fn load(&self, id: Uuid) -> Result<PreviewRecord> {
        let path = self.record_path(id);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| TryOnError::file_io_error("read preview record", &path, &e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl PreviewStore for JsonFileStore {
    async fn save(&self, record: &PreviewRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TryOnError::file_io_error("create preview directory", &self.dir, &e))?;

        let path = self.record_path(record.id);
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| TryOnError::file_io_error("write preview record", &path, &e))?;

        tracing::info!(id = %record.id, path = %path.display(), "Preview saved");
        Ok(())
    }
}
