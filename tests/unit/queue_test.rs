//! Tests for the in-memory task queue

use serde_json::{json, Value};
use taskgate::core::{TaskArgs, TaskQueue, TaskSpec};
use taskgate::infra::InMemoryQueue;

fn spec(id: u64) -> TaskSpec {
    TaskSpec::new(
        id,
        format!("job-{id}"),
        Box::new(move |_| Ok(json!(id))),
        TaskArgs::none(),
    )
}

#[test]
fn test_fifo_order() {
    let mut queue = InMemoryQueue::new();
    assert!(queue.is_empty());
    for id in 0..4 {
        queue.enqueue(spec(id));
    }
    assert_eq!(queue.len(), 4);

    let order: Vec<_> = std::iter::from_fn(|| queue.dequeue()).map(|s| s.id).collect();
    assert_eq!(order, [0, 1, 2, 3]);
    assert!(queue.dequeue().is_none());
}

#[test]
fn test_dequeued_spec_runs_with_its_args() {
    let mut queue = InMemoryQueue::new();
    queue.enqueue(TaskSpec::new(
        7,
        "concat",
        Box::new(|args: TaskArgs| {
            let head = args.get(0).and_then(Value::as_str).unwrap_or_default();
            let tail = args.get_kw("tail").and_then(Value::as_str).unwrap_or_default();
            Ok(json!(format!("{head}{tail}")))
        }),
        TaskArgs::none().arg("task").kwarg("tail", "gate"),
    ));

    let spec = queue.dequeue().unwrap();
    assert_eq!(spec.name, "concat");
    assert_eq!(spec.run().unwrap(), json!("taskgate"));
}
