//! Tests for error types

use taskgate::core::TaskError;

#[test]
fn test_submission_error() {
    let err = TaskError::Submission("pool saturated".to_string());
    assert_eq!(format!("{}", err), "submission failed: pool saturated");
}

#[test]
fn test_execution_error() {
    let err = TaskError::Execution("task panicked: boom".to_string());
    assert_eq!(format!("{}", err), "execution failed: task panicked: boom");
}

#[test]
fn test_configuration_error() {
    let err = TaskError::Configuration("interval must be positive, got 0".to_string());
    assert_eq!(
        format!("{}", err),
        "configuration error: interval must be positive, got 0"
    );
}

#[test]
fn test_shutdown_error() {
    let err = TaskError::Shutdown("worker 3 did not stop".to_string());
    assert_eq!(format!("{}", err), "shutdown error: worker 3 did not stop");
}

#[test]
fn test_errors_convert_into_anyhow() {
    fn fails() -> taskgate::core::AppResult<()> {
        Err(TaskError::Execution("bad input".into()))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert_eq!(
        err.downcast_ref::<TaskError>(),
        Some(&TaskError::Execution("bad input".into()))
    );
}
