use agentloop_store::Task;
use std::cmp::Ordering;

/// One slot in the priority heap. Ordering is priority first (higher wins),
/// then insertion sequence (lower wins) so tasks of equal priority come back
/// out in the order they were put in, matching `EventStore::load_open_tasks`'s
/// `priority DESC, created_at ASC` ordering.
#[derive(Debug)]
pub(crate) struct QueueEntry {
    pub(crate) priority: i64,
    pub(crate) sequence: u64,
    pub(crate) task: Task,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
