use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use super::{StorageError, StorageResult};

/// 探测可用性时写入的哨兵键
pub const PROBE_KEY: &str = "__afroxhub_test__";

/// 同步的文本键值存储
pub trait TextStore: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// 目录下每个键一个文件，文件名为键的 SHA-256
#[derive(Debug, Clone)]
pub struct FileTextStore {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileTextStore {
    pub fn new(dir: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{:x}.json", Sha256::digest(key.as_bytes())))
    }

    /// 除 `exclude` 以外所有条目占用的字节数
    fn usage_excluding(&self, exclude: &Path) -> StorageResult<u64> {
        let mut used = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path() != exclude {
                used += entry.metadata()?.len();
            }
        }
        Ok(used)
    }
}

impl TextStore for FileTextStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        if let Some(quota) = self.quota_bytes {
            let used = self.usage_excluding(&path)? + value.len() as u64;
            if used > quota {
                return Err(StorageError::QuotaExceeded { used, quota });
            }
        }

        fs::write(path, value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// 进程内的文本存储，配额按键和值的字节数计算
#[derive(Debug, Default)]
pub struct MemoryTextStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryTextStore {
    pub fn new(quota_bytes: Option<u64>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes,
        }
    }
}

impl TextStore for MemoryTextStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let used = (others + key.len() + value.len()) as u64;
            if used > quota {
                return Err(StorageError::QuotaExceeded { used, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.remove(key);
        Ok(())
    }
}

/// 文本存储之上的 JSON 读写，所有错误都被吞掉
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn TextStore>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn TextStore>) -> Self {
        Self { backend }
    }

    /// 写入再删除哨兵键，能成功才认为可用
    pub fn is_available(&self) -> bool {
        let probe = self
            .backend
            .set_item(PROBE_KEY, "1")
            .and_then(|_| self.backend.remove_item(PROBE_KEY));
        match probe {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Fallback storage unavailable: {}", e);
                false
            }
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_available() {
            return None;
        }
        let raw = match self.backend.get_item(key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!("Fallback read of {} failed: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed fallback entry {}: {}", key, e);
                None
            }
        }
    }

    /// 返回是否写入成功
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        if !self.is_available() {
            return false;
        }
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|json| self.backend.set_item(key, &json));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Fallback write of {} dropped: {}", key, e);
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        if !self.is_available() {
            return false;
        }
        match self.backend.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Fallback remove of {} failed: {}", key, e);
                false
            }
        }
    }

    /// 直接读取原始文本，不做解析
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.backend.get_item(key).ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTextStore::new(dir.path().join("kv"), None);

        assert_eq!(store.get_item("water-tracker").unwrap(), None);
        store.set_item("water-tracker", "{\"glasses\":3}").unwrap();
        assert_eq!(
            store.get_item("water-tracker").unwrap().as_deref(),
            Some("{\"glasses\":3}")
        );

        store.remove_item("water-tracker").unwrap();
        store.remove_item("water-tracker").unwrap();
        assert_eq!(store.get_item("water-tracker").unwrap(), None);
    }

    #[test]
    fn file_store_enforces_quota_but_allows_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTextStore::new(dir.path(), Some(10));

        store.set_item("a", "123456").unwrap();
        store.set_item("a", "1234567890").unwrap();
        assert!(matches!(
            store.set_item("b", "1"),
            Err(StorageError::QuotaExceeded { quota: 10, .. })
        ));
    }

    #[test]
    fn memory_store_quota_counts_keys() {
        let store = MemoryTextStore::new(Some(4));
        store.set_item("ab", "cd").unwrap();
        assert!(store.set_item("ab", "cde").is_err());
        assert_eq!(store.get_item("ab").unwrap().as_deref(), Some("cd"));
    }

    #[test]
    fn local_store_round_trips_nested_values() {
        let local = LocalStore::new(Arc::new(MemoryTextStore::default()));
        let value = json!({ "days": [{ "label": "Day 1", "hours": 16 }], "active": true });

        assert!(local.set_json("autophagy-tracker", &value));
        assert_eq!(local.get_json::<Value>("autophagy-tracker"), Some(value));
        assert!(local.remove("autophagy-tracker"));
        assert_eq!(local.get_json::<Value>("autophagy-tracker"), None);
    }

    #[test]
    fn malformed_entry_reads_as_absent() {
        let backend = Arc::new(MemoryTextStore::default());
        backend.set_item("k", "{not json").unwrap();
        backend.set_item("empty", "").unwrap();

        let local = LocalStore::new(backend);
        assert_eq!(local.get_json::<Value>("k"), None);
        assert_eq!(local.get_json::<Value>("empty"), None);
        assert_eq!(local.get_raw("k").as_deref(), Some("{not json"));
    }

    #[test]
    fn probe_leaves_no_sentinel_behind() {
        let backend = Arc::new(MemoryTextStore::default());
        let local = LocalStore::new(backend.clone());
        assert!(local.is_available());
        assert_eq!(backend.get_item(PROBE_KEY).unwrap(), None);
    }

    #[test]
    fn full_store_reports_unavailable() {
        // 配额小于哨兵键本身
        let local = LocalStore::new(Arc::new(MemoryTextStore::new(Some(1))));
        assert!(!local.is_available());
        assert!(!local.set_json("k", &1));
        assert_eq!(local.get_json::<i32>("k"), None);
        assert!(!local.remove("k"));
    }

    #[test]
    fn unwritable_directory_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        // 目录路径被普通文件占用
        let local = LocalStore::new(Arc::new(FileTextStore::new(blocker.join("kv"), None)));
        assert!(!local.is_available());
        assert!(!local.set_json("k", &1));
    }
}
