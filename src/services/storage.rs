//! Cover image storage

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Stores binary blobs on behalf of a user and hands back a reference
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `data` for `owner`, returning a reference to save on the book
    async fn save(&self, owner: &str, extension: Option<String>, data: &[u8]) -> AppResult<String>;

    /// Read a previously stored blob, `None` if it no longer exists
    async fn read(&self, reference: &str) -> AppResult<Option<Vec<u8>>>;

    /// Delete a stored blob; a reference that no longer exists is not an error
    async fn remove(&self, reference: &str) -> AppResult<()>;
}

/// Files under `<root>/users/<owner>/<uuid>.<ext>`
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path of a reference; only plain relative segments are accepted
    fn resolve(&self, reference: &str) -> AppResult<PathBuf> {
        let relative = Path::new(reference);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AppError::BadRequest(format!("Invalid file reference: {}", reference)));
        }
        Ok(self.root.join(relative))
    }
}

/// Keep only characters that are safe in a single path segment
fn sanitize_segment(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

fn sanitize_extension(extension: &str) -> Option<String> {
    let ext: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    (!ext.is_empty()).then_some(ext)
}

/// File extension of an uploaded file name, if any
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_string())
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, owner: &str, extension: Option<String>, data: &[u8]) -> AppResult<String> {
        let owner_dir = sanitize_segment(owner);
        let file_name = match extension.as_deref().and_then(sanitize_extension) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        let directory = self.root.join("users").join(&owner_dir);
        tokio::fs::create_dir_all(&directory).await?;
        tokio::fs::write(directory.join(&file_name), data).await?;

        let reference = format!("users/{}/{}", owner_dir, file_name);
        tracing::debug!(owner, reference = %reference, size = data.len(), "Stored file");
        Ok(reference)
    }

    async fn read(&self, reference: &str) -> AppResult<Option<Vec<u8>>> {
        match tokio::fs::read(self.resolve(reference)?).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, reference: &str) -> AppResult<()> {
        match tokio::fs::remove_file(self.resolve(reference)?).await {
            Ok(()) => {
                tracing::debug!(reference, "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
