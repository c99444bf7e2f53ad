//! Task status and snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline status, in forward order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Parsing,
    Translating,
    Summarizing,
    Critiquing,
    Done,
    Failed,
}

impl TaskStatus {
    /// All statuses in declaration order
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Queued,
        TaskStatus::Parsing,
        TaskStatus::Translating,
        TaskStatus::Summarizing,
        TaskStatus::Critiquing,
        TaskStatus::Done,
        TaskStatus::Failed,
    ];

    /// `done` and `failed` end a task
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Progress percentage reported when entering this status.
    /// `failed` keeps whatever progress the task had.
    pub fn progress(self) -> Option<u8> {
        match self {
            TaskStatus::Queued => Some(0),
            TaskStatus::Parsing => Some(15),
            TaskStatus::Translating => Some(45),
            TaskStatus::Summarizing => Some(70),
            TaskStatus::Critiquing => Some(90),
            TaskStatus::Done => Some(100),
            TaskStatus::Failed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Parsing => "parsing",
            TaskStatus::Translating => "translating",
            TaskStatus::Summarizing => "summarizing",
            TaskStatus::Critiquing => "critiquing",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable copy of one task's state at one instant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub task_id: String,
    /// Paper the task operates on
    pub paper_id: String,
    pub status: TaskStatus,
    /// 0..=100
    pub progress: u8,
    /// Current activity, replaced on every update
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

impl TaskSnapshot {
    /// Fresh snapshot for a newly accepted task
    pub fn queued(task_id: impl Into<String>, paper_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            paper_id: paper_id.into(),
            status: TaskStatus::Queued,
            progress: 0,
            message: "Task queued, waiting to start.".to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        for status in TaskStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = TaskStatus::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&TaskStatus::Done, &TaskStatus::Failed]);
    }

    #[test]
    fn test_forward_progress_is_increasing() {
        let forward: Vec<u8> = TaskStatus::ALL
            .iter()
            .filter_map(|s| s.progress())
            .collect();
        assert_eq!(forward, vec![0, 15, 45, 70, 90, 100]);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = TaskSnapshot::queued("t1", "p1");
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["task_id"], "t1");
        assert_eq!(value["paper_id"], "p1");
        assert_eq!(value["status"], "queued");
        assert_eq!(value["progress"], 0);
        assert!(value["updated_at"].is_string());
    }
}
