//! In-memory FIFO queue of task specs.

use std::collections::VecDeque;

use crate::core::{TaskQueue, TaskSpec};

/// In-memory queue storing task specs in submission order.
/// O(1) enqueue at the back and dequeue at the front.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    tasks: VecDeque<TaskSpec>,
}

impl InMemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskQueue for InMemoryQueue {
    fn enqueue(&mut self, task: TaskSpec) {
        self.tasks.push_back(task);
    }

    fn dequeue(&mut self) -> Option<TaskSpec> {
        self.tasks.pop_front()
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskArgs;
    use serde_json::Value;

    fn make_task(id: u64) -> TaskSpec {
        TaskSpec::new(id, format!("task-{id}"), Box::new(|_| Ok(Value::Null)), TaskArgs::none())
    }

    #[test]
    fn test_fifo_order() {
        let mut q = InMemoryQueue::new();
        for id in [3, 1, 2] {
            q.enqueue(make_task(id));
        }
        assert_eq!(q.len(), 3);
        assert_eq!(q.dequeue().unwrap().id, 3);
        assert_eq!(q.dequeue().unwrap().id, 1);
        assert_eq!(q.dequeue().unwrap().id, 2);
        assert!(q.is_empty());
    }

    #[test]
    fn test_empty_queue() {
        let mut q = InMemoryQueue::new();
        assert!(q.dequeue().is_none());
        assert_eq!(q.len(), 0);
    }
}
