//! The execution loop and its event stream.

pub mod events;
pub mod run;

pub use events::{EventLog, EventSink, GateReason, NullSink, RuntimeEvent};
pub use run::{ExecutionLoop, RunParams};

/// Advisory external stop flag, polled once per bar.
///
/// Idempotent and lock-free by design: the canonical implementation is a
/// file-existence check.
pub trait KillSwitch {
    fn engaged(&self) -> bool;
}
