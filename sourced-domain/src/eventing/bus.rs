//! 通知总线（NotificationBus）协议
//!
//! 定义通知发布与订阅的统一抽象，支持批量发布与 'static 生命周期通知流，
//! 以便在异步运行时（如 tokio::spawn）中消费。
//!
use crate::error::SourcedResult as Result;
use crate::eventing::Notification;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::sync::Arc;

/// 通知总线：负责分发通知与订阅通知流
#[async_trait]
pub trait NotificationBus: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<()>;

    /// 按给定顺序逐条发布
    async fn publish_batch(&self, notifications: &[Notification]) -> Result<()> {
        for notification in notifications {
            self.publish(notification).await?;
        }
        Ok(())
    }

    /// 返回一个 'static 生命周期的通知流，便于在 tokio::spawn 中使用
    async fn subscribe(&self) -> BoxStream<'static, Result<Notification>>;
}

#[async_trait]
impl<T> NotificationBus for Arc<T>
where
    T: NotificationBus + ?Sized,
{
    async fn publish(&self, notification: &Notification) -> Result<()> {
        (**self).publish(notification).await
    }

    async fn publish_batch(&self, notifications: &[Notification]) -> Result<()> {
        (**self).publish_batch(notifications).await
    }

    async fn subscribe(&self) -> BoxStream<'static, Result<Notification>> {
        (**self).subscribe().await
    }
}
