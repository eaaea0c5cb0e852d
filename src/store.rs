//! Persistence of the shared table between runs.
//! 在多次运行之间持久化共享表。

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// Where the encoded table is read from at startup and written to at
/// shutdown.
///
/// Implementations only move opaque blobs; encoding is done by
/// [`QTable::save`](crate::table::QTable::save) and
/// [`QTable::load`](crate::table::QTable::load).
///
/// 启动时读取、关闭时写入编码后表的位置。实现只负责搬运不透明的字节块。
#[async_trait]
pub trait TableStore: Send + Sync + 'static {
    /// Reads the persisted blob. `Ok(None)` means nothing was saved yet.
    /// 读取已持久化的字节块。`Ok(None)` 表示尚未保存过。
    async fn load(&self) -> Result<Option<Bytes>>;

    /// Persists a blob, replacing any previous one.
    /// 持久化字节块，替换之前的内容。
    async fn save(&self, blob: Bytes) -> Result<()>;
}

/// A store backed by files. Reading and writing may use different paths.
///
/// 基于文件的存储。读取与写入可以使用不同的路径。
#[derive(Debug, Clone)]
pub struct FileStore {
    read_path: PathBuf,
    save_path: PathBuf,
}

impl FileStore {
    /// Reads from and writes to the same file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            read_path: path.clone(),
            save_path: path,
        }
    }

    /// Reads from `read_path` and writes to `save_path`.
    pub fn with_paths(read_path: impl Into<PathBuf>, save_path: impl Into<PathBuf>) -> Self {
        Self {
            read_path: read_path.into(),
            save_path: save_path.into(),
        }
    }
}

#[async_trait]
impl TableStore for FileStore {
    async fn load(&self) -> Result<Option<Bytes>> {
        match tokio::fs::read(&self.read_path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, blob: Bytes) -> Result<()> {
        tokio::fs::write(&self.save_path, &blob).await?;
        Ok(())
    }
}

/// An in-process store, for tests and for hosts that persist elsewhere.
///
/// 进程内存储，用于测试或自行处理持久化的主机。
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `blob` already saved.
    pub fn with_blob(blob: impl Into<Bytes>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// The last saved blob.
    pub fn blob(&self) -> Option<Bytes> {
        match self.blob.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn load(&self) -> Result<Option<Bytes>> {
        Ok(self.blob())
    }

    async fn save(&self, blob: Bytes) -> Result<()> {
        match self.blob.lock() {
            Ok(mut guard) => *guard = Some(blob),
            Err(poisoned) => *poisoned.into_inner() = Some(blob),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("qcong-store-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load().await.unwrap(), None);
        store.save(Bytes::from_static(b"abc")).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(Bytes::from_static(b"abc")));
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let store = FileStore::new(scratch_path("missing"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_separate_paths() {
        let read = scratch_path("read");
        let save = scratch_path("save");
        tokio::fs::write(&read, b"seed").await.unwrap();

        let store = FileStore::with_paths(&read, &save);
        assert_eq!(store.load().await.unwrap(), Some(Bytes::from_static(b"seed")));
        store.save(Bytes::from_static(b"learned")).await.unwrap();

        // The read path is left alone.
        assert_eq!(tokio::fs::read(&read).await.unwrap(), b"seed");
        assert_eq!(tokio::fs::read(&save).await.unwrap(), b"learned");

        let _ = tokio::fs::remove_file(&read).await;
        let _ = tokio::fs::remove_file(&save).await;
    }

    #[tokio::test]
    async fn test_file_store_reports_io_errors() {
        // A directory cannot be read as a file.
        let store = FileStore::new(std::env::temp_dir());
        assert!(store.load().await.is_err());
    }
}
