//! Task specifications and the queue abstraction that buffers them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AppResult;

/// Identifier assigned to a task when it is submitted.
pub type TaskId = u64;

/// Body of a submitted task. Receives its arguments and produces a JSON result.
pub type TaskFn = Box<dyn FnOnce(TaskArgs) -> AppResult<Value> + Send + 'static>;

/// Positional and keyword arguments passed to a task or job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskArgs {
    /// Positional arguments in call order.
    pub positional: Vec<Value>,
    /// Keyword arguments.
    pub keyword: Map<String, Value>,
}

impl TaskArgs {
    /// No arguments.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from positional and keyword parts.
    #[must_use]
    pub const fn new(positional: Vec<Value>, keyword: Map<String, Value>) -> Self {
        Self { positional, keyword }
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Positional argument at `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.positional.get(idx)
    }

    /// Keyword argument named `key`.
    #[must_use]
    pub fn get_kw(&self, key: &str) -> Option<&Value> {
        self.keyword.get(key)
    }
}

/// A callable plus its arguments, queued for execution. Consumed exactly once.
pub struct TaskSpec {
    /// Identifier assigned at submission.
    pub id: TaskId,
    /// Human-readable name, used in logs.
    pub name: String,
    /// The body to run.
    pub func: TaskFn,
    /// Arguments handed to `func`.
    pub args: TaskArgs,
}

impl TaskSpec {
    /// Create a spec.
    pub fn new(id: TaskId, name: impl Into<String>, func: TaskFn, args: TaskArgs) -> Self {
        Self {
            id,
            name: name.into(),
            func,
            args,
        }
    }

    /// Run the body, consuming the spec.
    pub fn run(self) -> AppResult<Value> {
        (self.func)(self.args)
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// FIFO buffer of pending task specs.
///
/// Implementations are driven by a single drainer; callers serialize access.
pub trait TaskQueue: Send {
    /// Append a spec at the back.
    fn enqueue(&mut self, task: TaskSpec);
    /// Pop the oldest spec.
    fn dequeue(&mut self) -> Option<TaskSpec>;
    /// Number of buffered specs.
    fn len(&self) -> usize;
    /// Whether nothing is buffered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
