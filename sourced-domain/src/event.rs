use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync
{
    /// 事件类型（形如 `task.opened` 或自定义类型名）
    fn event_type(&self) -> &str;

    /// 应用该事件后实体到达的版本（同一实体内从 1 起连续递增）
    fn version(&self) -> usize;
}
