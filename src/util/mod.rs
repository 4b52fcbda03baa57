//! Shared utilities: clock and logging collaborators.

pub mod clock;
pub mod telemetry;

pub use clock::*;
pub use telemetry::*;
