//! 任务关联表：task id → 状态/结果。
//!
//! 唯一跨连接共享的可变状态，命令入口与回报可能在不同任务中更新同一条记录。
//! 条目数有上限：满时先淘汰最早登记的终态任务，没有终态任务时淘汰最早登记的任务。

use domain::{CommandAlias, TaskId};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    /// 已写入设备连接
    Dispatched,
    /// 结果已回报
    Completed,
    /// 入口尚未实现，任务未执行
    Deferred,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Dispatched => "dispatched",
            TaskStatus::Completed => "completed",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Failed => "failed",
        }
    }

    /// 不会再被更新的状态（可被淘汰）
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub alias: CommandAlias,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub detail: Option<String>,
    pub updated_at_ms: i64,
}

/// 任务状态变更
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub result: Option<String>,
    pub detail: Option<String>,
}

/// 默认最多保留的任务数
pub const DEFAULT_TASK_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct TaskEntry {
    record: TaskRecord,
    /// 登记顺序，淘汰时取最小者
    seq: u64,
}

#[derive(Debug, Default)]
struct TaskMap {
    entries: HashMap<TaskId, TaskEntry>,
    next_seq: u64,
}

impl TaskMap {
    fn evict_one(&mut self) -> Option<TaskId> {
        let oldest = |terminal_only: bool| {
            self.entries
                .iter()
                .filter(|(_, entry)| !terminal_only || entry.record.status.is_terminal())
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(task_id, _)| task_id.clone())
        };
        let victim = oldest(true).or_else(|| oldest(false))?;
        self.entries.remove(&victim);
        Some(victim)
    }
}

#[derive(Debug)]
pub struct TaskTable {
    tasks: Mutex<TaskMap>,
    capacity: usize,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TASK_CAPACITY)
    }
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity` 至少为 1。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Mutex::new(TaskMap::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 登记任务；同一 task id 重复下发时覆盖旧记录。
    pub async fn begin(&self, task_id: &TaskId, alias: CommandAlias) -> TaskRecord {
        let record = TaskRecord {
            task_id: task_id.clone(),
            alias,
            status: TaskStatus::Pending,
            result: None,
            detail: None,
            updated_at_ms: now_epoch_ms(),
        };
        let mut tasks = self.tasks.lock().await;
        if !tasks.entries.contains_key(task_id) && tasks.entries.len() >= self.capacity {
            if let Some(evicted) = tasks.evict_one() {
                debug!(target: "trk.control", task_id = %evicted, "task_evicted");
            }
        }
        let seq = tasks.next_seq;
        tasks.next_seq += 1;
        tasks.entries.insert(
            task_id.clone(),
            TaskEntry {
                record: record.clone(),
                seq,
            },
        );
        record
    }

    /// 未登记的 task id 返回 `None`。
    pub async fn transition(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        update: TaskUpdate,
    ) -> Option<TaskRecord> {
        let mut tasks = self.tasks.lock().await;
        let record = &mut tasks.entries.get_mut(task_id)?.record;
        record.status = status;
        if update.result.is_some() {
            record.result = update.result;
        }
        record.detail = update.detail;
        record.updated_at_ms = now_epoch_ms();
        Some(record.clone())
    }

    pub async fn get(&self, task_id: &TaskId) -> Option<TaskRecord> {
        self.tasks
            .lock()
            .await
            .entries
            .get(task_id)
            .map(|entry| entry.record.clone())
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.entries.is_empty()
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn transition_keeps_result_when_update_has_none() {
        let table = TaskTable::new();
        let id = TaskId::from("7");
        table.begin(&id, CommandAlias::Configure).await;
        table
            .transition(
                &id,
                TaskStatus::Failed,
                TaskUpdate {
                    result: Some("{\"list\":[]}".to_string()),
                    detail: Some("timeout".to_string()),
                },
            )
            .await;
        let record = table
            .transition(&id, TaskStatus::Completed, TaskUpdate::default())
            .await
            .expect("known task");
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result.as_deref(), Some("{\"list\":[]}"));
        assert!(record.detail.is_none());
    }

    #[tokio::test]
    async fn unknown_task_is_not_created_by_transition() {
        let table = TaskTable::new();
        let updated = table
            .transition(&TaskId::from("x"), TaskStatus::Completed, TaskUpdate::default())
            .await;
        assert!(updated.is_none());
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_updates_are_serialized() {
        let table = Arc::new(TaskTable::new());
        let mut handles = Vec::new();
        for index in 0..16 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                table
                    .begin(&TaskId::new(index.to_string()), CommandAlias::Execute)
                    .await;
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert_eq!(table.len().await, 16);
    }

    #[tokio::test]
    async fn full_table_evicts_oldest_finished_task_first() {
        let table = TaskTable::with_capacity(3);
        let ids: Vec<TaskId> = (0..3).map(|index| TaskId::new(index.to_string())).collect();
        for id in &ids {
            table.begin(id, CommandAlias::Execute).await;
        }
        // 0 仍在进行，1、2 已结束
        table
            .transition(&ids[2], TaskStatus::Failed, TaskUpdate::default())
            .await;
        table
            .transition(&ids[1], TaskStatus::Dispatched, TaskUpdate::default())
            .await;

        table.begin(&TaskId::from("3"), CommandAlias::Execute).await;
        assert_eq!(table.len().await, 3);
        assert!(table.get(&ids[0]).await.is_some());
        assert!(table.get(&ids[1]).await.is_none());
        assert!(table.get(&ids[2]).await.is_some());

        table.begin(&TaskId::from("4"), CommandAlias::Execute).await;
        assert!(table.get(&ids[2]).await.is_none());
        assert!(table.get(&ids[0]).await.is_some());
    }

    #[tokio::test]
    async fn table_never_grows_past_capacity() {
        let table = TaskTable::with_capacity(8);
        for index in 0..100 {
            table
                .begin(&TaskId::new(index.to_string()), CommandAlias::Configure)
                .await;
        }
        assert_eq!(table.len().await, 8);
        // 全部在进行时淘汰最早登记者
        assert!(table.get(&TaskId::from("91")).await.is_none());
        assert!(table.get(&TaskId::from("92")).await.is_some());
        assert!(table.get(&TaskId::from("99")).await.is_some());
    }

    #[tokio::test]
    async fn re_registering_existing_id_does_not_evict() {
        let table = TaskTable::with_capacity(2);
        table.begin(&TaskId::from("a"), CommandAlias::Execute).await;
        table.begin(&TaskId::from("b"), CommandAlias::Execute).await;
        table.begin(&TaskId::from("a"), CommandAlias::Configure).await;
        assert_eq!(table.len().await, 2);
        assert!(table.get(&TaskId::from("b")).await.is_some());
    }
}
