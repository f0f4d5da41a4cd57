//! Side-effect policy for tool invocations.
//!
//! Every tool declares what it does to the outside world (read, create,
//! update, delete). A [`Policy`] decides which of those effects a run may
//! perform and which tools are refused outright.

mod effect;
mod error;
mod policy;

pub use effect::{SideEffect, ToolRequest};
pub use error::{Error, Result};
pub use policy::{Decision, Policy};
