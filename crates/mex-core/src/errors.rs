//! Error types for failure handling across the assistant.
//!
//! Tool executors never surface these to the turn driver directly: each
//! executor converts its own failures into a typed `{success: false, error}`
//! result. The variants here cover the paths that genuinely abort a turn
//! (the model unreachable, broken configuration) plus the internal errors
//! that executors catch and fold into failure results.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AssistantError {
    #[error("LLM interaction failed: {0}")]
    LlmError(String),
    #[error("Tool execution failed for '{tool_name}': {message}")]
    ToolError { tool_name: String, message: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Data store query failed: {0}")]
    DataError(String),
    #[error("Image storage operation failed: {0}")]
    StorageError(String),
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::LlmError(err.to_string())
    }
}
