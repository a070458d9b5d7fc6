use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn ensure_root(&self) -> io::Result<()>;
    /// Returns `None` when the object does not exist.
    async fn get_object(&self, key: &str) -> io::Result<Option<Bytes>>;
    /// Replaces the whole object. Readers never observe a partial write.
    async fn put_object(&self, key: &str, body: Bytes) -> io::Result<()>;
}

/// Objects stored as plain files under a root directory.
#[derive(Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StorageClient for FileStorage {
    async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn get_object(&self, key: &str) -> io::Result<Option<Bytes>> {
        match tokio::fs::read(self.root.join(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_object(&self, key: &str, body: Bytes) -> io::Result<()> {
        let target = self.root.join(key);
        let tmp = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        tokio::fs::write(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!(key, bytes = body.len(), "object written");
        Ok(())
    }
}

/// In-memory objects for tests, with switchable write failures.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    objects: std::sync::Mutex<std::collections::HashMap<String, Bytes>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn with_object(key: &str, body: &'static [u8]) -> Self {
        let storage = Self::default();
        storage
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(body));
        storage
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl StorageClient for MemoryStorage {
    async fn ensure_root(&self) -> io::Result<()> {
        Ok(())
    }

    async fn get_object(&self, key: &str) -> io::Result<Option<Bytes>> {
        Ok(self.raw(key))
    }

    async fn put_object(&self, key: &str, body: Bytes) -> io::Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }
}
