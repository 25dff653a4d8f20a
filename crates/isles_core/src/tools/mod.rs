//! External tool invocation.
//!
//! Tool-backed collaborators exchange JSON files with an external program:
//! the driver writes a request, runs the program, then reads an optional
//! response. See [`protocol`] for the file formats and [`runner`] for
//! process handling.

pub mod protocol;
pub mod runner;

pub use protocol::{PartitionIds, ToolRequest, ToolResponse};
pub use runner::{ToolOutput, ToolRunner};
