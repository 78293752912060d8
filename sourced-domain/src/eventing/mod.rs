//! 本地通知子系统（eventing）
//!
//! 提供持久化成功后的本地通知发布/订阅抽象：
//! - `Notification`：实体排队待发布的通知描述符（不经过存储层）；
//! - `NotificationBus`：统一发布/订阅接口；
//! - `InMemoryNotificationBus`：基于 broadcast 的内存实现。
//!
//! 通知仅在事件批量落盘成功后由仓储发布，观察者不会看到未持久化的事件。
//!
pub mod bus;
pub mod bus_inmemory;
pub mod notification;

pub use bus::NotificationBus;
pub use bus_inmemory::InMemoryNotificationBus;
pub use notification::Notification;
