//! MCP tool server that forwards tool calls to a DingTalk or WeCom group robot.

pub mod config;
pub mod server;
pub mod tools;

pub use config::BotConfig;
pub use server::ToolServer;
