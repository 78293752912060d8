//! 实体（Entity）回放契约
//!
//! 约束一个可持久化实体的核心行为：
//! - 标识与版本（`id` / `version` / `snapshot_version`）；
//! - 自上次提交以来产生、尚未持久化的事件队列；
//! - 持久化成功后待发布的本地通知队列；
//! - `snapshot` 生成可序列化状态，`apply` / `replay` 按序折叠事件重建状态。
//!
use crate::error::{SourcedError, SourcedResult};
use crate::event::DomainEvent;
use crate::eventing::Notification;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt::Display;

/// 可持久化实体的回放契约
pub trait Entity: Default + Serialize + DeserializeOwned + Send + Sync {
    /// 实体类型名，用于派生集合名（`<TYPE>.snapshots` / `<TYPE>.events`）
    const TYPE: &'static str;

    /// 实体标识类型，在实体生命周期内保持稳定
    type Id: Clone + Eq + Display + Serialize + DeserializeOwned + Send + Sync;

    /// 该实体产生的领域事件类型
    type Event: DomainEvent;

    fn id(&self) -> &Self::Id;

    /// 回放完成后由仓储显式设置标识
    fn set_id(&mut self, id: Self::Id);

    /// 当前版本：每应用一个事件严格加一
    fn version(&self) -> usize;

    /// 上次快照对应的版本（从未快照时为 0）
    fn snapshot_version(&self) -> usize;

    /// 快照落盘成功后由仓储调用
    fn set_snapshot_version(&mut self, version: usize);

    /// 自上次提交以来产生、尚未持久化的事件（按产生顺序）
    fn uncommitted_events(&self) -> &[Self::Event];

    /// 事件批量落盘成功后由仓储调用
    fn clear_uncommitted_events(&mut self);

    /// 取走待发布的本地通知（按入队顺序）
    fn drain_notifications(&mut self) -> Vec<Notification>;

    /// 生成可序列化的当前状态。
    ///
    /// 序列化结果必须是包含 `id`、`version`、`snapshot_version` 字段的
    /// JSON 对象；默认实现直接序列化自身。
    fn snapshot(&self) -> SourcedResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// 应用事件，更新实体状态
    fn apply(&mut self, event: &Self::Event);

    /// 回放构造：从可选快照状态与有序事件确定性重建实体。
    ///
    /// 相同的（快照, 事件序列）输入总是得到相同的状态；
    /// 默认实现为标准折叠，实体类型可按需覆盖。
    fn replay(snapshot: Option<Value>, events: &[Self::Event]) -> SourcedResult<Self> {
        let mut entity = match snapshot {
            Some(state) => serde_json::from_value(state)
                .map_err(|e| SourcedError::replay(format!("snapshot state: {e}")))?,
            None => Self::default(),
        };

        for event in events {
            entity.apply(event);
        }

        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::Entity;
    use crate::event::DomainEvent;
    use crate::eventing::Notification;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: String,
        version: usize,
        snapshot_version: usize,
        value: i64,
        #[serde(skip)]
        new_events: Vec<CounterEvent>,
        #[serde(skip)]
        to_emit: Vec<Notification>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum CounterEvent {
        Added { version: usize, amount: i64 },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &str {
            "counter.added"
        }

        fn version(&self) -> usize {
            match self {
                CounterEvent::Added { version, .. } => *version,
            }
        }
    }

    impl Entity for Counter {
        const TYPE: &'static str = "counter";
        type Id = String;
        type Event = CounterEvent;

        fn id(&self) -> &String {
            &self.id
        }
        fn set_id(&mut self, id: String) {
            self.id = id;
        }
        fn version(&self) -> usize {
            self.version
        }
        fn snapshot_version(&self) -> usize {
            self.snapshot_version
        }
        fn set_snapshot_version(&mut self, version: usize) {
            self.snapshot_version = version;
        }
        fn uncommitted_events(&self) -> &[CounterEvent] {
            &self.new_events
        }
        fn clear_uncommitted_events(&mut self) {
            self.new_events.clear();
        }
        fn drain_notifications(&mut self) -> Vec<Notification> {
            std::mem::take(&mut self.to_emit)
        }
        fn apply(&mut self, event: &CounterEvent) {
            match event {
                CounterEvent::Added { version, amount } => {
                    self.value += *amount;
                    self.version = *version;
                }
            }
        }
    }

    fn added(version: usize, amount: i64) -> CounterEvent {
        CounterEvent::Added { version, amount }
    }

    // 无快照时从默认状态折叠
    #[test]
    fn replay_without_snapshot_folds_from_default() {
        let events = vec![added(1, 3), added(2, 4)];
        let counter = Counter::replay(None, &events).unwrap();

        assert_eq!(counter.version(), 2);
        assert_eq!(counter.value, 7);
        assert_eq!(counter.snapshot_version(), 0);
    }

    // 有快照时先恢复状态再折叠增量事件
    #[test]
    fn replay_with_snapshot_applies_incremental_events() {
        let state = json!({
            "id": "c-1",
            "version": 10,
            "snapshot_version": 10,
            "value": 10,
        });
        let counter = Counter::replay(Some(state), &[added(11, 5)]).unwrap();

        assert_eq!(counter.version(), 11);
        assert_eq!(counter.snapshot_version(), 10);
        assert_eq!(counter.value, 15);
    }

    // 相同输入必须得到相同状态
    #[test]
    fn replay_is_deterministic() {
        let events = vec![added(1, 1), added(2, -2), added(3, 9)];
        let a = Counter::replay(None, &events).unwrap();
        let b = Counter::replay(None, &events).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn replay_rejects_malformed_snapshot_state() {
        let err = Counter::replay(Some(json!("not an object")), &[]).unwrap_err();
        assert!(matches!(err, crate::error::SourcedError::Replay { .. }));
    }

    // 默认快照实现序列化自身，携带标识与版本字段
    #[test]
    fn default_snapshot_carries_identity_and_versions() {
        let mut counter = Counter::default();
        counter.set_id("c-9".to_string());
        counter.apply(&added(1, 42));

        let state = counter.snapshot().unwrap();
        assert_eq!(state["id"], "c-9");
        assert_eq!(state["version"], 1);
        assert_eq!(state["snapshot_version"], 0);
        assert_eq!(state["value"], 42);
    }
}
