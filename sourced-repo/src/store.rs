//! 文档存储（DocumentStore）协议
//!
//! 定义仓储所依赖的最小文档存储能力：按实体类型划分集合，支持
//! 索引构建、带排序与上限的条件查询、单文档与批量插入。
//! 具体引擎（连接管理、索引实现、落盘原子性）由适配器实现并注入，
//! 适配器将自身的原生错误映射为 `Read` / `Write`。
//!
use async_trait::async_trait;
use bon::Builder;
use serde_json::Value;
use sourced_domain::error::SourcedResult as Result;
use std::sync::Arc;

/// 查询条件：按 `id` 精确匹配，可选版本下界（严格大于）
#[derive(Debug, Clone, Builder)]
pub struct Criteria {
    id: Value,
    version_gt: Option<usize>,
}

impl Criteria {
    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn version_gt(&self) -> Option<usize> {
        self.version_gt
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// 排序要求：按单一字段排序
#[derive(Debug, Clone)]
pub struct Sort {
    field: String,
    direction: Direction,
}

impl Sort {
    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// 文档存储：按集合组织的无模式文档读写能力
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 请求为集合的指定字段构建索引
    async fn ensure_index(&self, collection: &str, field: &str) -> Result<()>;

    /// 条件查询，返回按 `sort` 排序、受 `limit` 约束的有序结果
    async fn find(
        &self,
        collection: &str,
        criteria: &Criteria,
        sort: &Sort,
        limit: Option<usize>,
    ) -> Result<Vec<Value>>;

    /// 插入单个文档
    async fn insert_one(&self, collection: &str, document: Value) -> Result<()>;

    /// 批量插入文档（一次写入）
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<()>;
}

#[async_trait]
impl<T> DocumentStore for Arc<T>
where
    T: DocumentStore + ?Sized,
{
    async fn ensure_index(&self, collection: &str, field: &str) -> Result<()> {
        (**self).ensure_index(collection, field).await
    }

    async fn find(
        &self,
        collection: &str,
        criteria: &Criteria,
        sort: &Sort,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        (**self).find(collection, criteria, sort, limit).await
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<()> {
        (**self).insert_one(collection, document).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<()> {
        (**self).insert_many(collection, documents).await
    }
}
