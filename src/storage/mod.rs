// 存储模块
// 优先使用持久化后端，失败时退回到同步的文本键值存储

pub mod durable;
pub mod hybrid;
pub mod local;

pub use durable::{DurableBackend, RedisBackend};
pub use hybrid::HybridStore;
pub use local::{FileTextStore, LocalStore, MemoryTextStore, TextStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("durable storage unavailable in this environment")]
    Unsupported,

    #[error("fallback storage unavailable")]
    Unavailable,

    #[error("storage quota exceeded ({used} of {quota} bytes)")]
    QuotaExceeded { used: u64, quota: u64 },

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
