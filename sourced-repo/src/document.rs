//! 存储文档模型
//!
//! 定义快照与事件在文档存储中的标准形态：快照为平铺的实体状态对象，
//! 事件保留类型化载荷并在顶层镜像配置的索引字段。
//!
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sourced_domain::entity::Entity;
use sourced_domain::error::{SourcedError, SourcedResult as Result};
use sourced_domain::event::DomainEvent;

/// 快照文档：实体在某一版本的物化状态
///
/// 存储形态为平铺对象 `{ id, version, snapshot_version, <状态字段> }`，
/// 仅由提交在节奏触发时创建，创建后不再更新或删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    id: Value,
    version: usize,
    snapshot_version: usize,
    #[serde(flatten)]
    state: Map<String, Value>,
}

impl SnapshotDocument {
    /// 从实体当前状态捕获快照；`snapshot_version` 记录为本快照的版本
    pub fn from_entity<A: Entity>(entity: &A) -> Result<Self> {
        let Value::Object(mut state) = entity.snapshot()? else {
            return Err(serde_json::Error::custom("entity state is not a JSON object").into());
        };
        state.remove("id");
        state.remove("version");
        state.remove("snapshot_version");

        Ok(Self {
            id: serde_json::to_value(entity.id())?,
            version: entity.version(),
            snapshot_version: entity.version(),
            state,
        })
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn snapshot_version(&self) -> usize {
        self.snapshot_version
    }

    /// 重组完整的实体状态对象（含 id/version/snapshot_version），供回放使用
    pub fn into_state(self) -> Value {
        let mut state = self.state;
        state.insert("id".to_string(), self.id);
        state.insert("version".to_string(), self.version.into());
        state.insert(
            "snapshot_version".to_string(),
            self.snapshot_version.into(),
        );
        Value::Object(state)
    }
}

/// 事件文档：一次状态变更的不可变记录
///
/// `payload` 原样保留事件载荷的序列化形态，索引字段的镜像值与
/// `id` / `version` / `type` 平铺在顶层，便于按任意索引查询；
/// 镜像因此不会覆盖载荷内容，回放保持确定性。
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct EventDocument {
    id: Value,
    version: usize,
    #[serde(rename = "type")]
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: Value,
    #[serde(flatten)]
    indexed: Map<String, Value>,
}

/// 事件文档自身占用的顶层键，索引镜像跳过这些字段
const RESERVED_FIELDS: [&str; 5] = ["id", "version", "type", "occurred_at", "payload"];

impl EventDocument {
    /// 从待持久化事件构造文档：按配置的索引字段镜像实体当前值。
    ///
    /// 实体未序列化出的索引字段直接跳过。
    pub fn from_event<A: Entity>(
        entity: &A,
        entity_state: &Map<String, Value>,
        indices: &[String],
        event: &A::Event,
    ) -> Result<Self> {
        let mut indexed = Map::new();
        for field in indices {
            if RESERVED_FIELDS.contains(&field.as_str()) {
                continue;
            }
            if let Some(value) = entity_state.get(field) {
                indexed.insert(field.clone(), value.clone());
            }
        }

        Ok(Self {
            id: serde_json::to_value(entity.id())?,
            version: event.version(),
            event_type: event.event_type().to_string(),
            occurred_at: Utc::now(),
            payload: serde_json::to_value(event)?,
            indexed,
        })
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 某个镜像索引字段的值（未镜像时为 None）
    pub fn indexed_value(&self, field: &str) -> Option<&Value> {
        self.indexed.get(field)
    }

    /// 将载荷还原为类型化事件
    pub fn to_event<E: DomainEvent>(&self) -> Result<E> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| SourcedError::replay(format!("event payload: {e}")))
    }
}
