use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{
    StorageError, StorageResult,
    durable::{DurableBackend, RedisBackend},
    local::{FileTextStore, LocalStore, MemoryTextStore, TextStore},
};
use crate::config::Config;

/// 混合存储
///
/// 读写优先走持久化后端，任何失败都退回到本地文本存储。两个后端互为替代，
/// 不做同步：持久化后端写入成功时不会再写本地存储。所有基础设施错误都在这里
/// 被吞掉，调用方只能通过读不到值来观察到写入失败。
#[derive(Clone)]
pub struct HybridStore {
    durable: Option<Arc<dyn DurableBackend>>,
    local: LocalStore,
}

impl HybridStore {
    /// `durable` 为 `None` 表示当前环境不支持持久化后端
    pub fn new(durable: Option<Arc<dyn DurableBackend>>, fallback: Arc<dyn TextStore>) -> Self {
        Self {
            durable,
            local: LocalStore::new(fallback),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let durable = config.storage_redis_url.as_deref().and_then(|url| {
            match RedisBackend::new(url, &config.storage_db_name, &config.storage_collection) {
                Ok(backend) => Some(Arc::new(backend) as Arc<dyn DurableBackend>),
                Err(e) => {
                    tracing::warn!("Durable storage disabled: {}", e);
                    None
                }
            }
        });

        let quota = Some(config.storage_fallback_quota_bytes);
        let fallback: Arc<dyn TextStore> = match &config.storage_fallback_dir {
            Some(dir) => Arc::new(FileTextStore::new(dir, quota)),
            None => Arc::new(MemoryTextStore::new(quota)),
        };

        tracing::info!(
            "Storage ready - durable: {}, fallback: {}",
            if durable.is_some() { "redis" } else { "unsupported" },
            config
                .storage_fallback_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "memory".into())
        );
        Self::new(durable, fallback)
    }

    fn durable(&self) -> StorageResult<&Arc<dyn DurableBackend>> {
        self.durable.as_ref().ok_or(StorageError::Unsupported)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.durable_get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(value) => return Some(value),
                Err(e) => tracing::debug!("Durable value for {} has unexpected shape: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => tracing::debug!("Durable read of {} failed, using fallback: {}", key, e),
        }
        self.local.get_json(key)
    }

    async fn durable_get(&self, key: &str) -> StorageResult<Option<Value>> {
        let value = self.durable()?.get(key).await?;
        // 存储的 null 与缺失同等对待
        Ok(value.filter(|v| !v.is_null()))
    }

    /// 返回值表示是否有任一后端保存了该值
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Refusing to store non-serializable value for {}: {}", key, e);
                return false;
            }
        };

        match self.durable_put(key, &value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Durable write of {} failed, using fallback: {}", key, e);
                self.local.set_json(key, &value)
            }
        }
    }

    async fn durable_put(&self, key: &str, value: &Value) -> StorageResult<()> {
        self.durable()?.put(key, value).await
    }

    pub async fn remove(&self, key: &str) -> bool {
        match self.durable_delete(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Durable remove of {} failed, using fallback: {}", key, e);
                self.local.remove(key)
            }
        }
    }

    async fn durable_delete(&self, key: &str) -> StorageResult<()> {
        self.durable()?.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn without_durable_backend_uses_fallback() {
        let fallback = Arc::new(MemoryTextStore::default());
        let store = HybridStore::new(None, fallback.clone());

        assert!(store.set("k", &json!({ "a": 1 })).await);
        assert_eq!(store.get::<Value>("k").await, Some(json!({ "a": 1 })));
        assert_eq!(fallback.get_item("k").unwrap().as_deref(), Some("{\"a\":1}"));

        assert!(store.remove("k").await);
        assert_eq!(store.get::<Value>("k").await, None);
    }

    #[tokio::test]
    async fn from_config_without_redis_uses_memory_fallback() {
        let store = HybridStore::from_config(&Config::default());
        assert!(store.durable.is_none());
        assert!(store.set("water-tracker", &vec![1, 2, 3]).await);
        assert_eq!(store.get::<Vec<i32>>("water-tracker").await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn from_config_with_bad_redis_url_disables_durable() {
        let config = Config {
            storage_redis_url: Some("not a url".into()),
            ..Config::default()
        };
        assert!(HybridStore::from_config(&config).durable.is_none());
    }
}
