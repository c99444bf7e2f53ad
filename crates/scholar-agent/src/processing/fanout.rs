//! Per-task notification fan-out
//!
//! Every subscriber owns an unbounded queue, so a publish never waits on a
//! slow or vanished reader. Attach and publish both run under the task's
//! registry shard lock, which makes the initial snapshot and later updates
//! one gap-free, duplicate-free sequence per subscriber.

use futures_util::stream::{self, Stream};
use std::time::Duration;
use tokio::sync::mpsc;

use super::registry::TaskRegistry;
use crate::types::TaskSnapshot;

/// One item delivered to a streaming client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// A task state transition
    Snapshot(TaskSnapshot),
    /// Nothing happened within the keep-alive interval
    KeepAlive,
}

/// Delivery queues attached to one task
#[derive(Debug, Default)]
pub(crate) struct SubscriberSet {
    next_id: u64,
    senders: Vec<(u64, mpsc::UnboundedSender<TaskSnapshot>)>,
}

impl SubscriberSet {
    /// Attach a subscriber whose queue starts with `current`.
    ///
    /// A subscriber attached to a finished task only gets the final snapshot
    /// and is not kept in the set.
    pub(crate) fn attach(
        &mut self,
        current: TaskSnapshot,
    ) -> (u64, mpsc::UnboundedReceiver<TaskSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id;
        self.next_id += 1;

        let terminal = current.is_terminal();
        // The receiver is alive, so this send cannot fail
        let _ = tx.send(current);
        if !terminal {
            self.senders.push((id, tx));
        }

        (id, rx)
    }

    /// Deliver to every attached subscriber, dropping the ones that hung up.
    /// Returns the number of subscribers reached.
    pub(crate) fn publish(&mut self, snapshot: &TaskSnapshot) -> usize {
        self.senders
            .retain(|(_, tx)| tx.send(snapshot.clone()).is_ok());
        let delivered = self.senders.len();

        // Nothing follows a terminal snapshot; closing the queues ends each stream
        if snapshot.is_terminal() {
            self.senders.clear();
        }

        delivered
    }

    pub(crate) fn detach(&mut self, id: u64) {
        self.senders.retain(|(sid, _)| *sid != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

/// Live view of one task's updates.
///
/// Yields the snapshot current at subscribe time, then every later
/// transition in order, and ends after a terminal snapshot. Dropping the
/// subscription detaches it from the task.
pub struct Subscription {
    task_id: String,
    subscriber_id: u64,
    receiver: mpsc::UnboundedReceiver<TaskSnapshot>,
    registry: TaskRegistry,
    finished: bool,
}

impl Subscription {
    pub(crate) fn new(
        task_id: String,
        subscriber_id: u64,
        receiver: mpsc::UnboundedReceiver<TaskSnapshot>,
        registry: TaskRegistry,
    ) -> Self {
        Self {
            task_id,
            subscriber_id,
            receiver,
            registry,
            finished: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Next snapshot, or `None` once the sequence has ended
    pub async fn recv(&mut self) -> Option<TaskSnapshot> {
        if self.finished {
            return None;
        }
        match self.receiver.recv().await {
            Some(snapshot) => {
                self.finished = snapshot.is_terminal();
                Some(snapshot)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Next snapshot, or a keep-alive if none arrives within `keep_alive`
    pub async fn next_event(&mut self, keep_alive: Duration) -> Option<SubscriptionEvent> {
        if self.finished {
            return None;
        }
        match tokio::time::timeout(keep_alive, self.recv()).await {
            Ok(Some(snapshot)) => Some(SubscriptionEvent::Snapshot(snapshot)),
            Ok(None) => None,
            Err(_) => Some(SubscriptionEvent::KeepAlive),
        }
    }

    /// Turn the subscription into a stream of events with keep-alives
    pub fn into_stream(self, keep_alive: Duration) -> impl Stream<Item = SubscriptionEvent> + Send {
        stream::unfold(self, move |mut sub| async move {
            sub.next_event(keep_alive).await.map(|event| (event, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.detach(&self.task_id, self.subscriber_id);
        tracing::debug!(
            "Subscriber {} detached from task {}",
            self.subscriber_id,
            self.task_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;

    fn snapshot(status: TaskStatus) -> TaskSnapshot {
        let mut s = TaskSnapshot::queued("t1", "p1");
        s.status = status;
        s
    }

    #[test]
    fn test_attach_queues_current_snapshot() {
        let mut set = SubscriberSet::default();
        let (_, mut rx) = set.attach(snapshot(TaskStatus::Parsing));
        assert_eq!(set.len(), 1);
        assert_eq!(rx.try_recv().unwrap().status, TaskStatus::Parsing);
    }

    #[test]
    fn test_attach_to_terminal_task_is_not_retained() {
        let mut set = SubscriberSet::default();
        let (_, mut rx) = set.attach(snapshot(TaskStatus::Done));
        assert_eq!(set.len(), 0);
        assert_eq!(rx.try_recv().unwrap().status, TaskStatus::Done);
        // Sender dropped: the queue is closed after the final snapshot
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_publish_prunes_closed_receivers() {
        let mut set = SubscriberSet::default();
        let (_, rx_live) = set.attach(snapshot(TaskStatus::Queued));
        let (_, rx_gone) = set.attach(snapshot(TaskStatus::Queued));
        drop(rx_gone);

        assert_eq!(set.publish(&snapshot(TaskStatus::Parsing)), 1);
        assert_eq!(set.len(), 1);
        drop(rx_live);
    }

    #[test]
    fn test_terminal_publish_closes_all_queues() {
        let mut set = SubscriberSet::default();
        let (_, mut rx) = set.attach(snapshot(TaskStatus::Critiquing));
        assert_eq!(set.publish(&snapshot(TaskStatus::Failed)), 1);
        assert_eq!(set.len(), 0);

        assert_eq!(rx.try_recv().unwrap().status, TaskStatus::Critiquing);
        assert_eq!(rx.try_recv().unwrap().status, TaskStatus::Failed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_detach_by_id() {
        let mut set = SubscriberSet::default();
        let (a, _rx_a) = set.attach(snapshot(TaskStatus::Queued));
        let (b, _rx_b) = set.attach(snapshot(TaskStatus::Queued));
        assert_ne!(a, b);
        set.detach(a);
        assert_eq!(set.len(), 1);
        set.detach(a);
        assert_eq!(set.len(), 1);
    }
}
