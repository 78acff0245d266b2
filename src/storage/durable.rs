use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, aio::MultiplexedConnection};
use serde_json::Value;
use tokio::sync::OnceCell;

use super::StorageResult;

/// 异步持久化后端，按键读写结构化的值
#[async_trait]
pub trait DurableBackend: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    async fn put(&self, key: &str, value: &Value) -> StorageResult<()>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// 清空整个集合
    async fn clear(&self) -> StorageResult<()>;
}

/// 基于 Redis 哈希的持久化后端
///
/// 每个集合对应一个 `{db_name}:{collection}` 哈希。连接在首次使用时打开，
/// 并发的首次调用会等待同一个打开操作，之后整个进程复用该连接。
/// 打开失败不会被缓存，下一次调用会重新尝试。
pub struct RedisBackend {
    client: RedisClient,
    db_name: String,
    collection: String,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisBackend {
    pub fn new(redis_url: &str, db_name: &str, collection: &str) -> StorageResult<Self> {
        Ok(Self {
            client: RedisClient::open(redis_url)?,
            db_name: db_name.to_string(),
            collection: collection.to_string(),
            conn: OnceCell::new(),
        })
    }

    fn collection_key(&self) -> String {
        format!("{}:{}", self.db_name, self.collection)
    }

    fn catalog_key(&self) -> String {
        format!("{}:collections", self.db_name)
    }

    async fn open(&self) -> StorageResult<MultiplexedConnection> {
        tracing::debug!("Opening durable storage {}", self.collection_key());
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // 声明集合（幂等）
        let _: () = conn.sadd(self.catalog_key(), &self.collection).await?;
        tracing::info!("Durable storage {} ready", self.collection_key());
        Ok(conn)
    }

    async fn connection(&self) -> StorageResult<MultiplexedConnection> {
        let conn = self.conn.get_or_try_init(|| self.open()).await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl DurableBackend for RedisBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.hget(self.collection_key(), key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &Value) -> StorageResult<()> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(value)?;
        let _: () = conn.hset(self.collection_key(), key, json).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.hdel(self.collection_key(), key).await?;
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(self.collection_key()).await?;
        Ok(())
    }
}
