//! 统一错误定义
//!
//! 聚焦配置、存储读写、回放与本地通知等最小必要集合，
//! 便于存储适配器与上层实现统一转换为 `SourcedError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SourcedError {
    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    // --- 配置 ---
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    // --- 存储读写 ---
    #[error("storage read error: {reason}")]
    Read { reason: String },
    #[error("storage write error: {reason}")]
    Write { reason: String },

    // --- 回放 ---
    #[error("replay error: {reason}")]
    Replay { reason: String },

    // --- 本地通知 ---
    #[error("notification error: {reason}")]
    Notify { reason: String },
}

impl SourcedError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn read(reason: impl Into<String>) -> Self {
        Self::Read {
            reason: reason.into(),
        }
    }

    pub fn write(reason: impl Into<String>) -> Self {
        Self::Write {
            reason: reason.into(),
        }
    }

    pub fn replay(reason: impl Into<String>) -> Self {
        Self::Replay {
            reason: reason.into(),
        }
    }

    pub fn notify(reason: impl Into<String>) -> Self {
        Self::Notify {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type SourcedResult<T> = Result<T, SourcedError>;
