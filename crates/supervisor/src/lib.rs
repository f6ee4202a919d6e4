//! Process Supervisor - runs one shell command at a time for the console
//!
//! This crate:
//! - Spawns a shell command in the project directory with a captured environment
//! - Streams stdout/stderr lines back to the caller without blocking it
//! - Reports the exit code when the caller polls
//! - Tears down the whole descendant process tree on cancel

pub mod environment;
pub mod invocation;
mod log_buffer;
pub mod process_tree;
mod reader;
pub mod supervisor;

pub use environment::{EnvironmentSource, InheritedEnvironment};
pub use invocation::Invocation;
pub use process_tree::{is_alive, terminate_tree, ProcessTree, TerminationReport};
pub use supervisor::{RunHandle, Supervisor, POLL_INTERVAL};

pub use shared::{OutputLine, RunStatus, StreamKind, SupervisorError};
