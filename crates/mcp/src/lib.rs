// MCP (Model Context Protocol) server exposing the Wayfarer search tools
// and stored-result resources to agent clients

pub mod config;
pub mod protocol;
pub mod providers;
pub mod server;
pub mod tools;

pub use config::ServerConfig;
pub use server::McpServer;
