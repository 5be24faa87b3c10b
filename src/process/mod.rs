// ============================================================================
// Process Module
// ============================================================================
//
// Typed command pipeline: ordered pure transitions plus one recovery hook,
// bound to a store by a fixed executor contract.
//
// ============================================================================

pub mod command;
pub mod pipeline;

pub use command::{Command, CommandOutput, CommandPayload, Continuation};
pub use pipeline::{Execution, Process, ProcessExecutor, RecoveryHook};
