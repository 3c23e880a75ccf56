//! MCP tools implementation

pub mod comments;
pub mod format;
pub mod publish;
pub mod registry;
pub mod reply;
pub mod upload;

#[cfg(test)]
mod cli_integration_tests;
