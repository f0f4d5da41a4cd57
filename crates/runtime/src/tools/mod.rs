//! Tools, categories, and the per-run catalog.

mod catalog;
mod category;
mod descriptor;
pub mod errors;
mod tool;

pub use catalog::ToolCatalog;
pub use category::ToolCategory;
pub use descriptor::ToolDescriptor;
pub use errors::ToolError;
pub use tool::{SharedTool, Tool};
