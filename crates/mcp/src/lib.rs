//! MCP (Model Context Protocol) client library.
//!
//! A thin layer over the rmcp SDK that connects to tool servers, either
//! spawned locally and spoken to over stdio, or reached over streamable HTTP
//! with bearer authentication. Every request is bounded by the server's
//! timeout.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Client, ServerConfig, TransportConfig};
//! use std::collections::HashMap;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig {
//!     name: "jira".to_string(),
//!     transport: TransportConfig::Stdio {
//!         command: "jira-mcp".to_string(),
//!         args: vec!["--stdio".to_string()],
//!         env: HashMap::new(),
//!     },
//!     timeout_secs: None,
//! };
//!
//! let client = Client::connect(&config).await?;
//!
//! for tool in client.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let result = client
//!     .call_tool("search_issues", serde_json::json!({ "jql": "assignee = currentUser()" }))
//!     .await?;
//! println!("{} content blocks", result.content.len());
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::Client;
pub use config::{DEFAULT_TIMEOUT, ServerConfig, TransportConfig};
pub use error::{Error, Result};
pub use rmcp::model::{CallToolResult, Content, Tool, ToolAnnotations};
