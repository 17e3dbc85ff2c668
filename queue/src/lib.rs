mod entry;
mod error;

use agentloop_store::EventStore;
use agentloop_store::Task;
use entry::QueueEntry;
pub use error::QueueError;
pub use error::Result;
use std::collections::BinaryHeap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::Notify;

/// Snapshot of queue occupancy, serialized into the system snapshot's
/// `queue_stats` field by the Supervisor's checkpoint timer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStats {
    pub size: usize,
}

struct Inner {
    heap: Mutex<BinaryHeap<QueueEntry>>,
    notify: Notify,
    sequence: AtomicU64,
}

/// In-memory binary-heap priority queue of pending tasks, backed by the
/// event store for durability across restarts.
///
/// `get()` blocks the calling task (without busy-waiting) until an entry is
/// available, woken by a `Notify` signalled from `put()`.
#[derive(Clone)]
pub struct PriorityQueue {
    inner: Arc<Inner>,
    store: EventStore,
}

impl PriorityQueue {
    pub fn new(store: EventStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                heap: Mutex::new(BinaryHeap::new()),
                notify: Notify::new(),
                sequence: AtomicU64::new(0),
            }),
            store,
        }
    }

    /// Reload every open task recorded in the store into the heap. Called
    /// once at startup so a restart resumes exactly where it left off.
    pub async fn initialize(&self) -> Result<usize> {
        let open_tasks = self.store.load_open_tasks().await?;
        let mut heap = self.inner.heap.lock().await;
        let mut restored = 0;
        for task in open_tasks {
            let sequence = self.inner.sequence.fetch_add(1, AtomicOrdering::SeqCst);
            heap.push(QueueEntry {
                priority: task.priority,
                sequence,
                task,
            });
            restored += 1;
        }
        if restored > 0 {
            self.inner.notify.notify_waiters();
        }
        Ok(restored)
    }

    /// Record a new task and enqueue it.
    pub async fn put(&self, task: Task) -> Result<()> {
        self.store.record_task_created(&task).await?;
        let sequence = self.inner.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        {
            let mut heap = self.inner.heap.lock().await;
            heap.push(QueueEntry {
                priority: task.priority,
                sequence,
                task,
            });
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Requeue a task that failed transiently, after the store's retry
    /// bookkeeping has been updated by the caller.
    pub async fn retry(&self, task: Task) -> Result<()> {
        let sequence = self.inner.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        {
            let mut heap = self.inner.heap.lock().await;
            heap.push(QueueEntry {
                priority: task.priority,
                sequence,
                task,
            });
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Block until a task is available, then remove and return the
    /// highest-priority one.
    pub async fn get(&self) -> Task {
        loop {
            {
                let mut heap = self.inner.heap.lock().await;
                if let Some(entry) = heap.pop() {
                    return entry.task;
                }
            }
            self.inner.notify.notified().await;
        }
    }

    /// Non-blocking variant of [`Self::get`]; `None` if the queue is empty.
    pub async fn try_get(&self) -> Option<Task> {
        let mut heap = self.inner.heap.lock().await;
        heap.pop().map(|entry| entry.task)
    }

    pub async fn size(&self) -> usize {
        self.inner.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.size().await == 0
    }

    pub async fn stats(&self) -> QueueStats {
        QueueStats {
            size: self.size().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_store::Task;

    async fn store() -> EventStore {
        EventStore::open_in_memory().await.expect("open store")
    }

    #[tokio::test]
    async fn get_returns_highest_priority_first() {
        let queue = PriorityQueue::new(store().await);
        queue
            .put(Task::new("low".into(), "low".into(), 1, 3, None))
            .await
            .unwrap();
        queue
            .put(Task::new("high".into(), "high".into(), 10, 3, None))
            .await
            .unwrap();

        let first = queue.get().await;
        assert_eq!(first.id, "high");
        let second = queue.get().await;
        assert_eq!(second.id, "low");
    }

    #[tokio::test]
    async fn equal_priority_preserves_fifo_order() {
        let queue = PriorityQueue::new(store().await);
        queue
            .put(Task::new("a".into(), "a".into(), 5, 3, None))
            .await
            .unwrap();
        queue
            .put(Task::new("b".into(), "b".into(), 5, 3, None))
            .await
            .unwrap();

        assert_eq!(queue.get().await.id, "a");
        assert_eq!(queue.get().await.id, "b");
    }

    #[tokio::test]
    async fn get_blocks_until_a_task_is_put() {
        let queue = PriorityQueue::new(store().await);
        let queue_clone = queue.clone();

        let getter = tokio::spawn(async move { queue_clone.get().await });

        // Give the getter a chance to start waiting before anything is put.
        tokio::task::yield_now().await;
        queue
            .put(Task::new("late".into(), "late".into(), 1, 3, None))
            .await
            .unwrap();

        let task = getter.await.unwrap();
        assert_eq!(task.id, "late");
    }

    #[tokio::test]
    async fn initialize_restores_open_tasks_from_the_store() {
        let store = store().await;
        store
            .record_task_created(&Task::new("restored".into(), "x".into(), 1, 3, None))
            .await
            .unwrap();

        let queue = PriorityQueue::new(store);
        let restored = queue.initialize().await.unwrap();
        assert_eq!(restored, 1);
        assert_eq!(queue.get().await.id, "restored");
    }
}
