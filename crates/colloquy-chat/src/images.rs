use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::RwLock;

use crate::error::{ChatError, Result};

/// Binary image storage keyed by thread and file name
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, thread_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<()>;

    /// `None` when no image is stored under the key
    async fn load(&self, thread_id: &str, file_name: &str) -> Result<Option<Vec<u8>>>;
}

/// Reject key components that could escape the store root
pub fn validate_component(component: &str) -> Result<()> {
    if component.is_empty()
        || component.contains('/')
        || component.contains('\\')
        || component.contains("..")
    {
        return Err(ChatError::Validation(format!(
            "Invalid image path component: {:?}",
            component
        )));
    }
    Ok(())
}

/// Public URL served by the image endpoint
pub fn image_url(public_base_url: &str, thread_id: &str, file_name: &str) -> String {
    format!(
        "{}/api/images?t={}&img={}",
        public_base_url.trim_end_matches('/'),
        thread_id,
        file_name
    )
}

/// Decode a `data:image/...;base64,...` URL into raw bytes
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| ChatError::InvalidImage("expected a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ChatError::InvalidImage("missing data URL payload".to_string()))?;

    if !meta.ends_with(";base64") {
        return Err(ChatError::InvalidImage("data URL is not base64-encoded".to_string()));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| ChatError::InvalidImage(e.to_string()))
}

/// Images stored as `{root}/{thread_id}/{file_name}`
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, thread_id: &str, file_name: &str) -> Result<PathBuf> {
        validate_component(thread_id)?;
        validate_component(file_name)?;
        Ok(self.root.join(thread_id).join(file_name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, thread_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(thread_id, file_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), "Stored image");
        Ok(())
    }

    async fn load(&self, thread_id: &str, file_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(thread_id, file_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryImageStore {
    images: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn save(&self, thread_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        validate_component(thread_id)?;
        validate_component(file_name)?;
        self.images
            .write()
            .await
            .insert((thread_id.to_string(), file_name.to_string()), bytes);
        Ok(())
    }

    async fn load(&self, thread_id: &str, file_name: &str) -> Result<Option<Vec<u8>>> {
        validate_component(thread_id)?;
        validate_component(file_name)?;
        Ok(self
            .images
            .read()
            .await
            .get(&(thread_id.to_string(), file_name.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_plain_url() {
        assert!(matches!(
            decode_data_url("https://example.com/cat.png"),
            Err(ChatError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_validate_component_rejects_traversal() {
        assert!(validate_component("../etc").is_err());
        assert!(validate_component("a/b").is_err());
        assert!(validate_component("a\\b").is_err());
        assert!(validate_component("").is_err());
        assert!(validate_component("image.png").is_ok());
    }

    #[test]
    fn test_image_url_trims_trailing_slash() {
        assert_eq!(
            image_url("https://chat.example.com/", "t1", "a.png"),
            "https://chat.example.com/api/images?t=t1&img=a.png"
        );
    }

    #[tokio::test]
    async fn test_in_memory_round_trip_and_missing() {
        let store = InMemoryImageStore::new();
        store.save("t1", "a.png", vec![1, 2, 3]).await.unwrap();

        assert_eq!(store.load("t1", "a.png").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.load("t1", "b.png").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fs_store_writes_under_thread_directory() {
        let root = std::env::temp_dir().join(format!("colloquy-images-{}", uuid::Uuid::new_v4()));
        let store = FsImageStore::new(&root);

        store.save("t1", "a.png", vec![9]).await.unwrap();
        assert!(root.join("t1").join("a.png").exists());
        assert_eq!(store.load("t1", "a.png").await.unwrap(), Some(vec![9]));
        assert_eq!(store.load("t1", "missing.png").await.unwrap(), None);

        let _ = std::fs::remove_dir_all(&root);
    }
}
