/// Repository 示例
/// 演示快照 + 事件日志仓储的完整流程：
/// 加载（get-or-create）、提交、节奏快照与本地通知订阅
use anyhow::Result as AnyResult;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sourced_domain::entity::Entity;
use sourced_domain::event::DomainEvent;
use sourced_domain::eventing::Notification;
use sourced_repo::{InMemoryDocumentStore, Repository, SNAPSHOT_FREQUENCY};
use std::sync::Arc;

// ============================================================================
// 领域模型定义
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TaskBoard {
    id: String,
    version: usize,
    snapshot_version: usize,
    open: Vec<String>,
    closed: Vec<String>,
    #[serde(skip)]
    new_events: Vec<TaskEvent>,
    #[serde(skip)]
    to_emit: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TaskEvent {
    Opened { version: usize, title: String },
    Closed { version: usize, title: String },
}

impl DomainEvent for TaskEvent {
    fn event_type(&self) -> &str {
        match self {
            TaskEvent::Opened { .. } => "task.opened",
            TaskEvent::Closed { .. } => "task.closed",
        }
    }

    fn version(&self) -> usize {
        match self {
            TaskEvent::Opened { version, .. } | TaskEvent::Closed { version, .. } => *version,
        }
    }
}

impl Entity for TaskBoard {
    const TYPE: &'static str = "task_board";
    type Id = String;
    type Event = TaskEvent;

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
    fn uncommitted_events(&self) -> &[TaskEvent] {
        &self.new_events
    }
    fn clear_uncommitted_events(&mut self) {
        self.new_events.clear();
    }
    fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.to_emit)
    }
    fn apply(&mut self, event: &TaskEvent) {
        match event {
            TaskEvent::Opened { version, title } => {
                self.open.push(title.clone());
                self.version = *version;
            }
            TaskEvent::Closed { version, title } => {
                self.open.retain(|open| open != title);
                self.closed.push(title.clone());
                self.version = *version;
            }
        }
    }
}

impl TaskBoard {
    fn open_task(&mut self, title: &str) {
        let event = TaskEvent::Opened {
            version: self.version + 1,
            title: title.to_string(),
        };
        self.apply(&event);
        self.to_emit
            .push(Notification::new("task.opened", json!({ "title": title })));
        self.new_events.push(event);
    }

    fn close_task(&mut self, title: &str) {
        let event = TaskEvent::Closed {
            version: self.version + 1,
            title: title.to_string(),
        };
        self.apply(&event);
        self.to_emit
            .push(Notification::new("task.closed", json!({ "title": title })));
        self.new_events.push(event);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyResult<()> {
    let store = Arc::new(InMemoryDocumentStore::new());
    let repo: Repository<TaskBoard, _> = Repository::new(Arc::clone(&store), &["owner"])?;
    repo.ready().await?;

    println!("=== Repository 示例（快照 + 事件日志）===\n");

    // 订阅本地通知：仅在持久化成功后收到
    let mut notifications = repo.subscribe().await;
    tokio::spawn(async move {
        while let Some(Ok(notification)) = notifications.next().await {
            println!("🔔 通知: {} {}", notification.name, notification.payload);
        }
    });

    // get-or-create：不存在的 id 返回版本 0 的全新实体
    println!("--- 加载（get-or-create）---");
    let mut board = repo.get(&"board-001".to_string()).await?;
    println!("加载 board-001: 版本={}（全新实体）", board.version());

    // 提交几个事件
    println!("\n--- 提交事件 ---");
    board.open_task("write parser");
    board.open_task("add tests");
    board.close_task("write parser");
    repo.commit(&mut board).await?;
    println!(
        "✅ 提交 3 个事件: 版本={}, 待提交队列={}",
        board.version(),
        board.uncommitted_events().len()
    );

    // 重新加载验证回放
    let loaded = repo.get(&"board-001".to_string()).await?;
    println!(
        "重新加载: 版本={}, 进行中={:?}, 已完成={:?}",
        loaded.version(),
        loaded.open,
        loaded.closed
    );

    // 持续提交直到触发快照节奏
    println!("\n--- 快照节奏（每 {SNAPSHOT_FREQUENCY} 个版本）---");
    let mut board = loaded;
    while board.version() < SNAPSHOT_FREQUENCY {
        let title = format!("task-{}", board.version() + 1);
        board.open_task(&title);
        repo.commit(&mut board).await?;
    }
    println!(
        "📸 版本 {} 触发快照: snapshot_version={}, 快照数={}",
        board.version(),
        board.snapshot_version(),
        store.count("task_board.snapshots")
    );

    // 快照之后的加载只重放增量事件
    let reloaded = repo.get(&"board-001".to_string()).await?;
    println!(
        "快照后重新加载: 版本={}, 进行中任务数={}",
        reloaded.version(),
        reloaded.open.len()
    );

    println!("\n--- 仓储的职责边界 ---");
    println!("✅ 加载: 最新快照 + 其后事件按版本升序回放");
    println!("✅ 提交: 快照（按节奏）→ 事件批量追加 → 本地通知");
    println!("✅ 失败即中止: 观察者不会看到未持久化的事件");
    println!("✅ 同一 id 的单写者纪律由调用方保证");

    Ok(())
}
