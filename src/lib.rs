//! toolchat library
//!
//! This library exports the agent, MCP, and TUI modules for testing and
//! potential reuse.

pub mod agent;
pub mod cli;
pub mod config;
pub mod event;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod tui;
