pub mod client;
pub mod error;
pub mod supervisor;

pub use client::{McpServer, ToolInfo};
pub use error::McpError;
pub use supervisor::{close_all, launch_all};
