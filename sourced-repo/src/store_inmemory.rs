//! 内存版文档存储（InMemoryDocumentStore）
//!
//! 满足 `DocumentStore` 协议的无模式内存实现：
//! - 集合为 `serde_json::Value` 文档的有序列表；
//! - `ensure_index` 仅登记请求（可供测试检视）；
//! - 典型用途：测试环境、示例与本地开发。
//!
use crate::store::{Criteria, Direction, DocumentStore, Sort};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sourced_domain::error::SourcedResult as Result;
use std::collections::BTreeSet;

/// 简单的内存文档存储实现
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: DashMap<String, Vec<Value>>,
    indexes: DashMap<String, BTreeSet<String>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某集合已登记的索引字段（测试检视用）
    pub fn indexed_fields(&self, collection: &str) -> Vec<String> {
        self.indexes
            .get(collection)
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 某集合当前的文档数（测试检视用）
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|documents| documents.len())
            .unwrap_or(0)
    }

    /// 某集合当前的全部文档，按插入顺序（测试检视用）
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .get(collection)
            .map(|documents| documents.clone())
            .unwrap_or_default()
    }

    fn matches(criteria: &Criteria, document: &Value) -> bool {
        if document.get("id") != Some(criteria.id()) {
            return false;
        }
        match criteria.version_gt() {
            Some(floor) => version_of(document) > floor,
            None => true,
        }
    }
}

fn version_of(document: &Value) -> usize {
    document
        .get("version")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize
}

fn sort_key(document: &Value, field: &str) -> i64 {
    document.get(field).and_then(Value::as_i64).unwrap_or(0)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_index(&self, collection: &str, field: &str) -> Result<()> {
        self.indexes
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        criteria: &Criteria,
        sort: &Sort,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        let mut documents: Vec<Value> = self
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| Self::matches(criteria, document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // 稳定排序：同键文档保持插入顺序
        documents.sort_by_key(|document| sort_key(document, sort.field()));
        if sort.direction() == Direction::Descending {
            documents.reverse();
        }
        if let Some(limit) = limit {
            documents.truncate(limit);
        }

        Ok(documents)
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(())
    }
}
