//! Core library for the MEX merchant-analytics chat assistant.
//!
//! This crate provides the orchestration layer between a food-delivery
//! merchant's natural-language questions and the hosted services that answer
//! them: a Gemini-backed language model configured with callable tools, a
//! relational backend holding order/item/transaction rows, and a blob store
//! for generated menu-item images.
//!
//! # Architecture Overview
//!
//! The crate is organized around a small set of subsystems:
//!
//! - **Conversation types**: Gemini-wire-compatible message and part shapes
//! - **Turn driver**: the sequential tool-calling loop from user message to final answer
//! - **Tool set**: a closed enum of analytics and UI tools with exhaustive dispatch
//! - **Suggestion generator**: follow-up prompt generation with total fallbacks
//! - **Client action bridge**: once-per-result delivery of UI mutations
//! - **Collaborators**: traits over the relational backend and image storage

pub mod bridge;
pub mod config;
pub mod context;
pub mod core_types;
pub mod datastore;
pub mod driver;
pub mod errors;
pub mod llm;
pub mod prompts;
pub mod storage;
pub mod suggestions;
pub mod tools;

pub use bridge::{ActionBridge, ClientActionHandler};
pub use config::AssistantConfig;
pub use context::{Language, MerchantContext};
pub use core_types::{ConversationMessage, FunctionCall, FunctionResponse, MessagePart, Role};
pub use driver::{TurnDriver, TurnOutcome};
pub use errors::AssistantError;
pub use llm::LlmClient;
pub use suggestions::SuggestionGenerator;
pub use tools::{ClientAction, ToolName, ToolResult, Toolbox};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
