//! 实体仓储（Repository）
//!
//! 快照 + 事件日志持久化的核心编排：
//! - `get`：最新快照 + 其后事件按版本升序回放，重建实体；
//! - `commit`：按固定节奏先写快照、再批量追加事件、最后发布本地通知；
//! - 构建时为配置的索引字段向两个集合发出索引构建请求，并以一次性
//!   就绪信号闸控所有公开操作。
//!
//! 写入顺序约束了崩溃损害：快照先于事件落盘，崩溃最多导致下次加载
//! 重放已被快照覆盖的事件；通知仅在持久化成功后发布。
//!
use crate::document::{EventDocument, SnapshotDocument};
use crate::store::{Criteria, Direction, DocumentStore, Sort};
use futures_core::stream::BoxStream;
use serde_json::Value;
use sourced_domain::entity::Entity;
use sourced_domain::error::{SourcedError, SourcedResult as Result};
use sourced_domain::eventing::{InMemoryNotificationBus, Notification, NotificationBus};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;

/// 快照节奏：实体版本超出上次快照版本该值时，提交先落一个新快照
pub const SNAPSHOT_FREQUENCY: usize = 10;

#[derive(Debug, Clone)]
enum ReadyState {
    Pending,
    Ready,
    Failed(String),
}

/// 一次性就绪信号：仅解析一次，所有公开操作在解析前挂起，
/// 解析后不再阻塞；索引构建失败会使后续操作统一报错。
#[derive(Clone)]
struct ReadyGate {
    rx: watch::Receiver<ReadyState>,
}

impl ReadyGate {
    fn start<S>(store: Arc<S>, collections: Vec<String>, fields: Vec<String>) -> Self
    where
        S: DocumentStore + 'static,
    {
        let (tx, rx) = watch::channel(ReadyState::Pending);
        tokio::spawn(async move {
            for collection in &collections {
                for field in &fields {
                    if let Err(err) = store.ensure_index(collection, field).await {
                        let _ = tx.send(ReadyState::Failed(err.to_string()));
                        return;
                    }
                }
            }
            let _ = tx.send(ReadyState::Ready);
        });
        Self { rx }
    }

    async fn wait(&self) -> Result<()> {
        let mut rx = self.rx.clone();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                ReadyState::Ready => return Ok(()),
                ReadyState::Failed(reason) => {
                    return Err(SourcedError::write(format!("index build failed: {reason}")));
                }
                ReadyState::Pending => {
                    if rx.changed().await.is_err() {
                        return Err(SourcedError::configuration("readiness signal dropped"));
                    }
                }
            }
        }
    }
}

/// 按实体类型组织的仓储：一个实例对应一对集合
/// （`<TYPE>.snapshots` / `<TYPE>.events`）与一组固定的索引字段。
pub struct Repository<A, S>
where
    A: Entity,
    S: DocumentStore,
{
    store: Arc<S>,
    bus: Arc<dyn NotificationBus>,
    indices: Vec<String>,
    snapshots: String,
    events: String,
    ready: ReadyGate,
    _marker: PhantomData<A>,
}

impl<A, S> std::fmt::Debug for Repository<A, S>
where
    A: Entity,
    S: DocumentStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("indices", &self.indices)
            .field("snapshots", &self.snapshots)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl<A, S> Repository<A, S>
where
    A: Entity,
    S: DocumentStore + 'static,
{
    /// 创建仓储并发出索引构建请求（默认使用内存通知总线）。
    ///
    /// `indices` 去重后无条件并入 `id` 字段，此后作为不可变配置；
    /// 空的实体类型名或空白索引字段名立即返回配置错误。
    pub fn new(store: Arc<S>, indices: &[&str]) -> Result<Self> {
        Self::with_notification_bus(store, indices, Arc::new(InMemoryNotificationBus::default()))
    }

    /// 创建仓储，使用调用方提供的通知总线
    pub fn with_notification_bus(
        store: Arc<S>,
        indices: &[&str],
        bus: Arc<dyn NotificationBus>,
    ) -> Result<Self> {
        if A::TYPE.trim().is_empty() {
            return Err(SourcedError::configuration("entity type name is empty"));
        }

        let mut fields: Vec<String> = Vec::with_capacity(indices.len() + 1);
        fields.push("id".to_string());
        for field in indices {
            if field.trim().is_empty() {
                return Err(SourcedError::configuration("index field name is blank"));
            }
            if !fields.iter().any(|known| known == field) {
                fields.push((*field).to_string());
            }
        }

        let snapshots = format!("{}.snapshots", A::TYPE);
        let events = format!("{}.events", A::TYPE);

        tracing::debug!(entity_type = A::TYPE, "connecting entity store");
        let ready = ReadyGate::start(
            Arc::clone(&store),
            vec![snapshots.clone(), events.clone()],
            fields.clone(),
        );

        Ok(Self {
            store,
            bus,
            indices: fields,
            snapshots,
            events,
            ready,
            _marker: PhantomData,
        })
    }

    /// 显式等待就绪信号解析（索引构建请求已全部发出）
    pub async fn ready(&self) -> Result<()> {
        self.ready.wait().await
    }

    /// 已配置的索引字段（含 `id`，构建后不可变）
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    /// 订阅本地通知流
    pub async fn subscribe(&self) -> BoxStream<'static, Result<Notification>> {
        self.bus.subscribe().await
    }

    /// 按 id 加载实体：最新快照 + 其后事件升序回放。
    ///
    /// 无任何存储数据的 id 返回版本为 0 的全新实体（get-or-create），
    /// 不视为错误；存储读取失败原样向上传播。
    pub async fn get(&self, id: &A::Id) -> Result<A> {
        self.ready.wait().await?;
        tracing::debug!(entity_type = A::TYPE, id = %id, "getting entity");

        let id_value = serde_json::to_value(id)?;

        let latest = Criteria::builder().id(id_value.clone()).build();
        let snapshot = self
            .store
            .find(
                &self.snapshots,
                &latest,
                &Sort::by("version", Direction::Descending),
                Some(1),
            )
            .await?
            .into_iter()
            .next()
            .map(serde_json::from_value::<SnapshotDocument>)
            .transpose()
            .map_err(|e| SourcedError::replay(format!("snapshot document: {e}")))?;

        let newer = Criteria::builder()
            .id(id_value)
            .maybe_version_gt(snapshot.as_ref().map(SnapshotDocument::version))
            .build();
        let events = self
            .store
            .find(
                &self.events,
                &newer,
                &Sort::by("version", Direction::Ascending),
                None,
            )
            .await?
            .into_iter()
            .map(|document| {
                serde_json::from_value::<EventDocument>(document)
                    .map_err(|e| SourcedError::replay(format!("event document: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        self.deserialize(id, snapshot, &events)
    }

    /// 回放构造切面：无 I/O，委托实体的回放构造并显式设置 id。
    ///
    /// 实体类型如需定制重建逻辑，覆盖 `Entity::replay` 即可。
    pub fn deserialize(
        &self,
        id: &A::Id,
        snapshot: Option<SnapshotDocument>,
        events: &[EventDocument],
    ) -> Result<A> {
        let state = snapshot.map(SnapshotDocument::into_state);
        let events = events
            .iter()
            .map(|document| document.to_event::<A::Event>())
            .collect::<Result<Vec<_>>>()?;

        let mut entity = A::replay(state, &events)?;
        entity.set_id(id.clone());
        Ok(entity)
    }

    /// 提交实体的待持久化事件，按固定节奏先落快照。
    ///
    /// 严格顺序：快照（若 `version >= snapshot_version + SNAPSHOT_FREQUENCY`）
    /// → 事件批量追加 → 本地通知发布；任一步失败即中止，后续步骤不执行，
    /// 失败原样向上传播。
    ///
    /// 本层不串行化同一 id 上的并发提交：两个内存实例对同一 id 并发提交
    /// 可能在存储中交错或产生重复版本。加载与提交之间的单写者纪律由
    /// 调用方保证。
    pub async fn commit(&self, entity: &mut A) -> Result<()> {
        self.ready.wait().await?;
        tracing::debug!(entity_type = A::TYPE, id = %entity.id(), "committing entity");

        // 快照先于事件：崩溃最多导致下次加载重放已被快照覆盖的事件
        if entity.version() >= entity.snapshot_version() + SNAPSHOT_FREQUENCY {
            let document = SnapshotDocument::from_entity(entity)?;
            let version = document.version();
            self.store
                .insert_one(&self.snapshots, serde_json::to_value(&document)?)
                .await?;
            entity.set_snapshot_version(version);
            tracing::debug!(
                entity_type = A::TYPE,
                id = %entity.id(),
                version,
                "committed snapshot"
            );
        }

        let pending = entity.uncommitted_events();
        if !pending.is_empty() {
            let state = entity.snapshot()?;
            let state = state.as_object().cloned().unwrap_or_default();
            let documents = pending
                .iter()
                .map(|event| -> Result<Value> {
                    let document =
                        EventDocument::from_event(entity, &state, &self.indices, event)?;
                    Ok(serde_json::to_value(&document)?)
                })
                .collect::<Result<Vec<_>>>()?;

            let count = documents.len();
            self.store.insert_many(&self.events, documents).await?;
            entity.clear_uncommitted_events();
            tracing::debug!(
                entity_type = A::TYPE,
                id = %entity.id(),
                count,
                "committed events"
            );
        }

        // 通知仅在持久化成功后发布，观察者不会看到未持久化的事件
        let notifications = entity.drain_notifications();
        if !notifications.is_empty() {
            self.bus.publish_batch(&notifications).await?;
            tracing::debug!(
                entity_type = A::TYPE,
                id = %entity.id(),
                "emitted local notifications"
            );
        }

        Ok(())
    }
}
