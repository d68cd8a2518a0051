//! Line-delimited JSON tool server over stdio

pub mod messages;
mod stdio;

pub use messages::{ServerRequest, ServerResponse};
pub use stdio::{ToolServer, spawn_sweeper};
