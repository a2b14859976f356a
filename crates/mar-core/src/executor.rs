use crate::{TaskItem, TaskStatus};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("agent run failed: {0}")]
    Failed(String),
}

/// Runs the agents described by a task file and reports the resulting tasks.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, file_name: &str) -> Result<Vec<TaskItem>, ExecutorError>;
}

/// Placeholder executor: waits a fixed delay and returns [`demo_tasks`].
#[derive(Debug, Clone)]
pub struct MockExecutor {
    delay: Duration,
}

impl MockExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DELAY)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn run(&self, file_name: &str) -> Result<Vec<TaskItem>, ExecutorError> {
        info!(file = file_name, delay_ms = self.delay.as_millis() as u64, "mock agent run");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(demo_tasks())
    }
}

pub fn demo_tasks() -> Vec<TaskItem> {
    vec![
        TaskItem::new(
            "TEST-001",
            "Parse the task definition and split it into agent work items",
            "Every work item has an owner and an acceptance check",
            TaskStatus::Running,
        ),
        TaskItem::new(
            "TEST-002",
            "Implement the changes requested by the first work item",
            "Build passes and the new behaviour is covered by a test",
            TaskStatus::Pending,
        ),
        TaskItem::new(
            "TEST-003",
            "Review the combined diff and summarise the results",
            "Summary lists every changed file",
            TaskStatus::Pending,
        ),
    ]
}
