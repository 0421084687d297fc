use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::services::ServiceError;

/// Blob storage used for sign-up uploads (company logos).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `bucket`/`key` and return its location.
    async fn upload(
        &self,
        data: Vec<u8>,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, ServiceError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ServiceError>;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        Ok(Self { base_path })
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(bucket).join(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ServiceError::Storage(format!(
                "Invalid object path: {}/{}",
                bucket, key
            )));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        data: Vec<u8>,
        bucket: &str,
        key: &str,
        _content_type: &str,
    ) -> Result<String, ServiceError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ServiceError> {
        let path = self.object_path(bucket, key)?;
        if path.exists() {
            fs::remove_file(path)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(
        &self,
        data: Vec<u8>,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, ServiceError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| ServiceError::Storage(format!("S3 upload failed: {}", e)))?;
        Ok(format!("s3://{}/{}", bucket, key))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ServiceError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ServiceError::Storage(format!("S3 delete failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_upload_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let location = storage
            .upload(b"png".to_vec(), "logos", "org/logo.png", "image/png")
            .await
            .unwrap();
        assert!(Path::new(&location).exists());

        storage.delete("logos", "org/logo.png").await.unwrap();
        assert!(!Path::new(&location).exists());
    }

    #[tokio::test]
    async fn local_rejects_parent_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage
            .upload(b"x".to_vec(), "logos", "../escape.png", "image/png")
            .await;
        assert!(matches!(result, Err(ServiceError::Storage(_))));
    }
}
