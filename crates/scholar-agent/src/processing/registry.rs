//! In-memory task registry
//!
//! Source of truth for what every pipeline task is doing right now. Each
//! task id maps to one slot holding the current snapshot and the task's
//! subscribers; updates and their fan-out happen under the slot's shard lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::fanout::{SubscriberSet, Subscription};
use crate::error::{Error, Result};
use crate::types::{TaskSnapshot, TaskStatus};

struct TaskSlot {
    snapshot: TaskSnapshot,
    subscribers: SubscriberSet,
}

/// Concurrent registry of task snapshots and their subscribers
#[derive(Clone, Default)]
pub struct TaskRegistry {
    slots: Arc<DashMap<String, TaskSlot>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task in `queued` state
    pub fn create(&self, task_id: &str, paper_id: &str) -> Result<TaskSnapshot> {
        match self.slots.entry(task_id.to_string()) {
            Entry::Occupied(_) => Err(Error::DuplicateTask(task_id.to_string())),
            Entry::Vacant(entry) => {
                let snapshot = TaskSnapshot::queued(task_id, paper_id);
                entry.insert(TaskSlot {
                    snapshot: snapshot.clone(),
                    subscribers: SubscriberSet::default(),
                });
                tracing::info!("Task {} created for paper {}", task_id, paper_id);
                Ok(snapshot)
            }
        }
    }

    /// Replace a task's status, progress and message as one unit and notify
    /// its subscribers.
    ///
    /// Unknown ids are ignored and return `None`. A finished task never moves
    /// back to a running status; such updates return the stored snapshot
    /// unchanged. Progress is capped at 100.
    pub fn update(
        &self,
        task_id: &str,
        status: TaskStatus,
        progress: u8,
        message: impl Into<String>,
    ) -> Option<TaskSnapshot> {
        let Some(mut slot) = self.slots.get_mut(task_id) else {
            tracing::debug!("Ignoring update for unknown task {}", task_id);
            return None;
        };

        if slot.snapshot.is_terminal() && status != slot.snapshot.status {
            tracing::warn!(
                "Task {} is already {}, ignoring transition to {}",
                task_id,
                slot.snapshot.status,
                status
            );
            return Some(slot.snapshot.clone());
        }

        slot.snapshot.status = status;
        slot.snapshot.progress = progress.min(100);
        slot.snapshot.message = message.into();
        slot.snapshot.updated_at = chrono::Utc::now();

        let snapshot = slot.snapshot.clone();
        let delivered = slot.subscribers.publish(&snapshot);
        tracing::debug!(
            "Task {} -> {} ({}%), delivered to {} subscriber(s)",
            task_id,
            snapshot.status,
            snapshot.progress,
            delivered
        );

        Some(snapshot)
    }

    /// Current snapshot of a task
    pub fn get(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.slots.get(task_id).map(|slot| slot.snapshot.clone())
    }

    /// Snapshots of all tasks, most recently updated first
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let mut tasks: Vec<TaskSnapshot> =
            self.slots.iter().map(|slot| slot.snapshot.clone()).collect();
        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        tasks
    }

    /// Attach a subscriber to a task.
    ///
    /// The subscription starts with the snapshot current at this instant.
    pub fn subscribe(&self, task_id: &str) -> Result<Subscription> {
        let (subscriber_id, receiver) = {
            let mut slot = self
                .slots
                .get_mut(task_id)
                .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
            let current = slot.snapshot.clone();
            slot.subscribers.attach(current)
        };

        tracing::debug!("Subscriber {} attached to task {}", subscriber_id, task_id);
        Ok(Subscription::new(
            task_id.to_string(),
            subscriber_id,
            receiver,
            self.clone(),
        ))
    }

    /// Deliver a snapshot to the task's current subscribers without storing it.
    /// Returns the number of subscribers reached.
    pub fn publish(&self, task_id: &str, snapshot: &TaskSnapshot) -> usize {
        match self.slots.get_mut(task_id) {
            Some(mut slot) => slot.subscribers.publish(snapshot),
            None => 0,
        }
    }

    /// Number of subscribers attached to a task
    pub fn subscriber_count(&self, task_id: &str) -> usize {
        self.slots
            .get(task_id)
            .map(|slot| slot.subscribers.len())
            .unwrap_or(0)
    }

    pub(crate) fn detach(&self, task_id: &str, subscriber_id: u64) {
        if let Some(mut slot) = self.slots.get_mut(task_id) {
            slot.subscribers.detach(subscriber_id);
        }
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for slot in self.slots.iter() {
            stats.total_tasks += 1;
            stats.subscribers += slot.subscribers.len();
            match slot.snapshot.status {
                TaskStatus::Queued => stats.queued += 1,
                TaskStatus::Done => stats.done += 1,
                TaskStatus::Failed => stats.failed += 1,
                _ => stats.running += 1,
            }
        }
        stats
    }
}

/// Task counts by state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_tasks: usize,
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
    pub subscribers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_queued() {
        let registry = TaskRegistry::new();
        let task = registry.create("t1", "p1").unwrap();
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.progress, 0);
        assert_eq!(task.paper_id, "p1");
        assert_eq!(registry.get("t1"), Some(task));
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        let err = registry.create("t1", "p2").unwrap_err();
        assert!(matches!(err, Error::DuplicateTask(id) if id == "t1"));
        // The original task is untouched
        assert_eq!(registry.get("t1").unwrap().paper_id, "p1");
    }

    #[test]
    fn test_get_returns_last_update() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        registry.update("t1", TaskStatus::Parsing, 15, "Parsing PDF text.");
        registry.update("t1", TaskStatus::Translating, 45, "Translating.");

        let task = registry.get("t1").unwrap();
        assert_eq!(
            (task.status, task.progress, task.message.as_str()),
            (TaskStatus::Translating, 45, "Translating.")
        );
    }

    #[test]
    fn test_unknown_task_is_ignored() {
        let registry = TaskRegistry::new();
        assert!(registry
            .update("nonexistent-id", TaskStatus::Done, 100, "x")
            .is_none());
        assert!(registry.get("nonexistent-id").is_none());
        assert_eq!(registry.publish("nonexistent-id", &TaskSnapshot::queued("a", "b")), 0);
        assert!(matches!(
            registry.subscribe("nonexistent-id"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_terminal_state_is_never_reopened() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        registry.update("t1", TaskStatus::Parsing, 15, "Parsing.");
        registry.update("t1", TaskStatus::Failed, 15, "Task failed: boom");

        let again = registry
            .update("t1", TaskStatus::Failed, 15, "Task failed: boom again")
            .unwrap();
        assert_eq!(again.status, TaskStatus::Failed);
        assert_eq!(again.message, "Task failed: boom again");

        let stale = registry
            .update("t1", TaskStatus::Translating, 45, "Translating.")
            .unwrap();
        assert_eq!(stale.status, TaskStatus::Failed);
        assert_eq!(registry.get("t1").unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn test_progress_capped() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        let task = registry.update("t1", TaskStatus::Done, 250, "Done.").unwrap();
        assert_eq!(task.progress, 100);
    }

    #[tokio::test]
    async fn test_subscriber_before_updates_sees_every_transition() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        let mut sub = registry.subscribe("t1").unwrap();

        registry.update("t1", TaskStatus::Parsing, 15, "a");
        registry.update("t1", TaskStatus::Translating, 45, "b");
        registry.update("t1", TaskStatus::Done, 100, "c");

        let mut seen = Vec::new();
        while let Some(snapshot) = sub.recv().await {
            seen.push(snapshot.status);
        }
        assert_eq!(
            seen,
            vec![
                TaskStatus::Queued,
                TaskStatus::Parsing,
                TaskStatus::Translating,
                TaskStatus::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_subscriber_after_done_gets_single_snapshot() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        registry.update("t1", TaskStatus::Done, 100, "Task completed.");

        let mut sub = registry.subscribe("t1").unwrap();
        let only = sub.recv().await.unwrap();
        assert_eq!(only.status, TaskStatus::Done);
        assert!(sub.recv().await.is_none());
        assert_eq!(registry.subscriber_count("t1"), 0);
    }

    #[tokio::test]
    async fn test_dropped_subscription_detaches() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        let a = registry.subscribe("t1").unwrap();
        let _b = registry.subscribe("t1").unwrap();
        assert_eq!(registry.subscriber_count("t1"), 2);

        drop(a);
        assert_eq!(registry.subscriber_count("t1"), 1);
        assert_eq!(registry.stats().subscribers, 1);
    }

    #[tokio::test]
    async fn test_keep_alive_when_idle() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();
        let mut sub = registry.subscribe("t1").unwrap();
        let keep_alive = std::time::Duration::from_millis(20);

        assert!(matches!(
            sub.next_event(keep_alive).await,
            Some(crate::processing::SubscriptionEvent::Snapshot(_))
        ));
        assert_eq!(
            sub.next_event(keep_alive).await,
            Some(crate::processing::SubscriptionEvent::KeepAlive)
        );

        registry.update("t1", TaskStatus::Failed, 0, "Task failed: x");
        assert!(matches!(
            sub.next_event(keep_alive).await,
            Some(crate::processing::SubscriptionEvent::Snapshot(s)) if s.status == TaskStatus::Failed
        ));
        assert_eq!(sub.next_event(keep_alive).await, None);
    }

    #[tokio::test]
    async fn test_concurrent_subscribe_and_update_never_misses() {
        let registry = TaskRegistry::new();
        registry.create("t1", "p1").unwrap();

        let writer = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for (status, progress) in [
                    (TaskStatus::Parsing, 15),
                    (TaskStatus::Translating, 45),
                    (TaskStatus::Summarizing, 70),
                    (TaskStatus::Critiquing, 90),
                    (TaskStatus::Done, 100),
                ] {
                    registry.update("t1", status, progress, status.as_str());
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            readers.push(tokio::spawn(async move {
                let mut sub = registry.subscribe("t1").unwrap();
                let mut seen = Vec::new();
                while let Some(snapshot) = sub.recv().await {
                    seen.push(snapshot.progress);
                }
                seen
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            let seen = reader.await.unwrap();
            // Strictly increasing, no duplicates, always ends on done
            assert!(seen.windows(2).all(|w| w[0] < w[1]), "{:?}", seen);
            assert_eq!(seen.last(), Some(&100));
        }
    }

    #[test]
    fn test_stats_and_list() {
        let registry = TaskRegistry::new();
        registry.create("a", "p").unwrap();
        registry.create("b", "p").unwrap();
        registry.create("c", "p").unwrap();
        registry.update("b", TaskStatus::Summarizing, 70, "s");
        registry.update("c", TaskStatus::Failed, 0, "f");

        let stats = registry.stats();
        assert_eq!(stats.total_tasks, 3);
        assert_eq!((stats.queued, stats.running, stats.failed, stats.done), (1, 1, 1, 0));
        assert_eq!(registry.list().len(), 3);
    }
}
