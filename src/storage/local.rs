use super::traits::{ObjectReader, ObjectStore, StoreError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Object store backed by a local directory.
///
/// Objects live at `<root>/<container>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object location to a path under the root directory
    pub fn object_path(&self, container: &str, key: &str) -> Result<PathBuf, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidLocation {
            container: container.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if container.is_empty() || key.is_empty() {
            return Err(invalid("empty container or key"));
        }

        let relative = Path::new(container).join(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid("location must not escape the store root"));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, container: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let path = self.object_path(container, key)?;
        debug!(path = %path.display(), "Opening local object");

        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(StoreError::Io {
                container: container.to_string(),
                key: key.to_string(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_get_object_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let object_dir = dir.path().join("logs-bucket").join("2016/03/31");
        std::fs::create_dir_all(&object_dir).unwrap();
        std::fs::write(object_dir.join("elb log.gz"), b"payload").unwrap();

        let store = LocalObjectStore::new(dir.path().to_path_buf());
        let mut reader = store
            .get_object("logs-bucket", "2016/03/31/elb log.gz")
            .await
            .unwrap();

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"payload");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf());

        let result = store.get_object("bucket", "missing.gz").await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_object_path_rejects_traversal() {
        let store = LocalObjectStore::new(PathBuf::from("/data"));

        assert!(store.object_path("bucket", "../../etc/passwd").is_err());
        assert!(store.object_path("bucket", "/etc/passwd").is_err());
        assert!(store.object_path("..", "key").is_err());
        assert!(store.object_path("", "key").is_err());
        assert_eq!(
            store.object_path("bucket", "a/b.gz").unwrap(),
            PathBuf::from("/data/bucket/a/b.gz")
        );
    }
}
