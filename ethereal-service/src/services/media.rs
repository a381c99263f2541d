//! Media artifact storage for document attachments.
//!
//! Uploads happen before the owning row is updated; when that update fails
//! the artifact is deleted again (compensating cleanup) so no orphaned blob
//! is ever visible to readers.

use async_trait::async_trait;
use ethereal_core::error::AppError;
use std::path::PathBuf;
use tokio::fs;

use uuid::Uuid;

/// Storage key for a document attachment: room- and document-scoped, with a
/// random component so filenames from different devices never collide.
pub fn media_key(room_id: Uuid, document_id: Uuid, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}/{}/{}-{}", room_id, document_id, Uuid::new_v4(), safe)
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct LocalMediaStore {
    base_path: PathBuf,
}

impl LocalMediaStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    /// Keys come from `media_key` and are relative; anything that still
    /// escapes the base directory is refused outright.
    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        if key.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "invalid media key"
            )));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        let data = fs::read(path).await?;
        Ok(data)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}
