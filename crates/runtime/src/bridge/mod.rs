//! External tool bridge.
//!
//! Connects to MCP tool servers, translates their tool schemas, and exposes
//! each server's tools as a [`ToolCategory`](crate::tools::ToolCategory).

mod config;
mod pool;
pub mod schema;
mod session;
mod tool;

pub use config::{BridgeConfig, CategoryConfig};
pub use pool::BridgePool;
pub use session::{BridgeSession, EMPTY_RESULT, render_result, side_effect};
pub use tool::BridgeTool;
