use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sourced_domain::entity::Entity;
use sourced_domain::error::{SourcedError, SourcedResult};
use sourced_domain::event::DomainEvent;
use sourced_domain::eventing::Notification;
use sourced_repo::{Criteria, DocumentStore, InMemoryDocumentStore, Repository, Sort};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Account {
    id: String,
    version: usize,
    snapshot_version: usize,
    balance: i64,
    #[serde(skip)]
    new_events: Vec<AccountEvent>,
    #[serde(skip)]
    to_emit: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum AccountEvent {
    Deposited { version: usize, amount: i64 },
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &str {
        "account.deposited"
    }
    fn version(&self) -> usize {
        match self {
            AccountEvent::Deposited { version, .. } => *version,
        }
    }
}

impl Entity for Account {
    const TYPE: &'static str = "account";
    type Id = String;
    type Event = AccountEvent;

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
    fn uncommitted_events(&self) -> &[AccountEvent] {
        &self.new_events
    }
    fn clear_uncommitted_events(&mut self) {
        self.new_events.clear();
    }
    fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.to_emit)
    }
    fn apply(&mut self, event: &AccountEvent) {
        match event {
            AccountEvent::Deposited { version, amount } => {
                self.balance += *amount;
                self.version = *version;
            }
        }
    }
}

impl Account {
    fn deposit(&mut self, amount: i64) {
        let event = AccountEvent::Deposited {
            version: self.version + 1,
            amount,
        };
        self.apply(&event);
        self.to_emit
            .push(Notification::new("account.deposited", json!({ "amount": amount })));
        self.new_events.push(event);
    }
}

/// 可注入失败的存储：按集合后缀使写入失败
#[derive(Default)]
struct FailingStore {
    inner: InMemoryDocumentStore,
    fail_snapshot_inserts: bool,
    fail_event_inserts: bool,
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn ensure_index(&self, collection: &str, field: &str) -> SourcedResult<()> {
        self.inner.ensure_index(collection, field).await
    }

    async fn find(
        &self,
        collection: &str,
        criteria: &Criteria,
        sort: &Sort,
        limit: Option<usize>,
    ) -> SourcedResult<Vec<Value>> {
        self.inner.find(collection, criteria, sort, limit).await
    }

    async fn insert_one(&self, collection: &str, document: Value) -> SourcedResult<()> {
        if self.fail_snapshot_inserts && collection.ends_with(".snapshots") {
            return Err(SourcedError::write("disk full"));
        }
        self.inner.insert_one(collection, document).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> SourcedResult<()> {
        if self.fail_event_inserts && collection.ends_with(".events") {
            return Err(SourcedError::write("disk full"));
        }
        self.inner.insert_many(collection, documents).await
    }
}

// 快照写入失败时，事件集合必须保持原样（无部分批量写入）
#[tokio::test]
async fn failed_snapshot_write_leaves_event_log_untouched() -> AnyResult<()> {
    let store = Arc::new(FailingStore {
        fail_snapshot_inserts: true,
        ..FailingStore::default()
    });
    let repo: Repository<Account, _> = Repository::new(Arc::clone(&store), &[])?;

    let mut account = Account::default();
    account.set_id("acct-1".to_string());
    for _ in 0..10 {
        account.deposit(5);
    }

    // 版本 10 触发快照，快照写入失败即中止提交
    let err = repo.commit(&mut account).await.unwrap_err();
    assert!(matches!(err, SourcedError::Write { .. }));

    assert_eq!(store.inner.count("account.events"), 0);
    assert_eq!(store.inner.count("account.snapshots"), 0);
    // 队列保持原样，快照版本未推进
    assert_eq!(account.uncommitted_events().len(), 10);
    assert_eq!(account.snapshot_version(), 0);
    assert!(!account.to_emit.is_empty());
    Ok(())
}

// 事件批量写入失败时不得发布任何本地通知
#[tokio::test]
async fn failed_event_append_emits_nothing() -> AnyResult<()> {
    let store = Arc::new(FailingStore {
        fail_event_inserts: true,
        ..FailingStore::default()
    });
    let repo: Repository<Account, _> = Repository::new(Arc::clone(&store), &[])?;

    let mut account = Account::default();
    account.set_id("acct-2".to_string());
    account.deposit(1);
    account.deposit(2);

    let err = repo.commit(&mut account).await.unwrap_err();
    match err {
        SourcedError::Write { reason } => assert_eq!(reason, "disk full"),
        other => panic!("unexpected {other:?}"),
    }

    // 事件未清空，通知仍在实体队列中（未被发布）
    assert_eq!(account.uncommitted_events().len(), 2);
    assert_eq!(account.to_emit.len(), 2);
    Ok(())
}

// 失败的提交可以在修复后重试并成功
#[tokio::test]
async fn commit_can_be_retried_by_caller_after_failure() -> AnyResult<()> {
    let flaky = Arc::new(FailingStore {
        fail_event_inserts: true,
        ..FailingStore::default()
    });
    let repo: Repository<Account, _> = Repository::new(Arc::clone(&flaky), &[])?;

    let mut account = Account::default();
    account.set_id("acct-3".to_string());
    account.deposit(7);
    assert!(repo.commit(&mut account).await.is_err());

    // 本层不重试；调用方换用健康存储重新提交同一实体
    let healthy = Arc::new(InMemoryDocumentStore::new());
    let repo: Repository<Account, _> = Repository::new(Arc::clone(&healthy), &[])?;
    repo.commit(&mut account).await?;

    assert!(account.uncommitted_events().is_empty());
    let loaded = repo.get(&"acct-3".to_string()).await?;
    assert_eq!(loaded.version(), 1);
    assert_eq!(loaded.balance, 7);
    Ok(())
}
