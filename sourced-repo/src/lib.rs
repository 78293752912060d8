//! 实体仓储与文档存储（sourced-repo）
//!
//! 基于快照 + 事件日志的实体持久化实现：
//! - `repository`：核心编排（加载回放 / 节奏快照 / 批量追加 / 本地通知）；
//! - `store`：文档存储协议，具体引擎由适配器实现并注入；
//! - `store_inmemory`：内存实现，面向测试、示例与本地开发；
//! - `document`：快照与事件的存储文档模型。
//!
//! 领域侧契约（实体回放、领域事件、通知总线）见 `sourced-domain`。
//!
pub mod document;
pub mod repository;
pub mod store;
pub mod store_inmemory;

pub use document::{EventDocument, SnapshotDocument};
pub use repository::{Repository, SNAPSHOT_FREQUENCY};
pub use store::{Criteria, Direction, DocumentStore, Sort};
pub use store_inmemory::InMemoryDocumentStore;
