use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::core::error::QueueError;

/// One scheduled unit of work. `url == None` is the shutdown sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub priority: i64,
    seq: u64,
    pub url: Option<String>,
}

// Min-ordering by (priority, seq): lower priority is more urgent, the
// insertion counter keeps FIFO within equal priority.
impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.seq).cmp(&(self.priority, self.seq))
    }
}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Inner {
    heap: BinaryHeap<WorkItem>,
    seq: u64,
}

/// Bounded, mutex-protected priority queue mirroring the durable frontier.
/// `pop` parks on a notifier; sentinels bypass the bound so shutdown can
/// always get through.
pub struct WorkQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    max_size: usize,
}

impl WorkQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                seq: 0,
            }),
            notify: Notify::new(),
            max_size,
        }
    }

    pub fn push(&self, url: String, priority: i64) -> Result<(), QueueError> {
        {
            let mut inner = self.inner.lock().expect("work queue lock poisoned");
            if inner.heap.len() >= self.max_size {
                return Err(QueueError::Full);
            }
            inner.seq += 1;
            let seq = inner.seq;
            inner.heap.push(WorkItem {
                priority,
                seq,
                url: Some(url),
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Least-urgent sentinel: queued work drains first, and an idle worker
    /// wakes immediately.
    pub fn push_sentinel(&self) {
        {
            let mut inner = self.inner.lock().expect("work queue lock poisoned");
            inner.seq += 1;
            let seq = inner.seq;
            inner.heap.push(WorkItem {
                priority: i64::MAX,
                seq,
                url: None,
            });
        }
        self.notify.notify_one();
    }

    /// Wait for the highest-priority item. Callers bound this with a timeout
    /// so a stopped spider's workers can observe the running flag.
    pub async fn pop(&self) -> WorkItem {
        loop {
            {
                let mut inner = self.inner.lock().expect("work queue lock poisoned");
                if let Some(item) = inner.heap.pop() {
                    return item;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("work queue lock poisoned").heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn pops_by_priority_then_fifo() {
        let q = WorkQueue::new(10);
        q.push("neutral-1".into(), 0).unwrap();
        q.push("urgent".into(), -10).unwrap();
        q.push("neutral-2".into(), 0).unwrap();
        q.push("deferred".into(), 10).unwrap();

        let order: Vec<String> = [
            q.pop().await,
            q.pop().await,
            q.pop().await,
            q.pop().await,
        ]
        .into_iter()
        .map(|i| i.url.unwrap())
        .collect();
        assert_eq!(order, ["urgent", "neutral-1", "neutral-2", "deferred"]);
    }

    #[tokio::test]
    async fn bounded_push_fails_deterministically() {
        let q = WorkQueue::new(2);
        q.push("a".into(), 0).unwrap();
        q.push("b".into(), 0).unwrap();
        assert_eq!(q.push("c".into(), 0), Err(QueueError::Full));
        assert_eq!(q.len(), 2);
    }

    #[tokio::test]
    async fn sentinel_bypasses_bound_and_sorts_last() {
        let q = WorkQueue::new(1);
        q.push("work".into(), 5).unwrap();
        q.push_sentinel();
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().await.url.as_deref(), Some("work"));
        assert_eq!(q.pop().await.url, None);
    }

    #[tokio::test]
    async fn pop_blocks_until_push() {
        let q = std::sync::Arc::new(WorkQueue::new(4));
        let q2 = q.clone();
        let waiter = tokio::spawn(async move { q2.pop().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        q.push("late".into(), 0).unwrap();
        let item = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.url.as_deref(), Some("late"));
    }
}
