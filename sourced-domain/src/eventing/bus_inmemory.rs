//! 内存版通知总线（InMemoryNotificationBus）
//!
//! 基于 `tokio::sync::broadcast` 实现的轻量通知总线，满足 `NotificationBus` 协议：
//! - `publish`：克隆并广播通知；
//! - `subscribe`：返回 `'static` 生命周期通知流，便于在 `tokio::spawn` 中使用；
//! - 典型用途：测试环境、示例与本地开发。
//!
//! 注意：若无订阅者时发送将被忽略；订阅者消费过慢可能丢失通知并在流中报错。

use crate::error::{SourcedError, SourcedResult as Result};
use crate::eventing::{Notification, NotificationBus};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// 简单的内存通知总线实现
#[derive(Clone)]
pub struct InMemoryNotificationBus {
    tx: broadcast::Sender<Notification>,
}

impl InMemoryNotificationBus {
    /// 创建一个内存总线，`capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for InMemoryNotificationBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl NotificationBus for InMemoryNotificationBus {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        // 若当前无订阅者，broadcast 的 send 会返回错误，这里视为非致命并忽略
        let _ = self.tx.send(notification.clone());
        Ok(())
    }

    async fn subscribe(&self) -> BoxStream<'static, Result<Notification>> {
        let rx = self.tx.subscribe();
        let stream =
            BroadcastStream::new(rx).map(|r| r.map_err(|e| SourcedError::notify(e.to_string())));
        Box::pin(stream)
    }
}
