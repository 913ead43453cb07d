//! Language model provider abstraction.
//!
//! Defines the `LlmClient` trait consumed by the turn driver and suggestion
//! generator, plus the tool declaration shape advertised to the model. The
//! production implementation is the native Gemini REST client in
//! [`gemini`]; tests substitute scripted mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core_types::{ConversationMessage, FunctionCall, MessagePart};
use crate::errors::AssistantError;

pub mod gemini;

pub use gemini::GeminiClient;

/// A named, schema-described capability the model may request be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON-schema-like parameter shape, Gemini `parameters` format.
    pub parameters: Value,
}

/// Sampling and instruction settings for a single `generateContent` call.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub system_instruction: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            system_instruction: None,
            temperature: 0.7,
            max_output_tokens: 4096,
        }
    }
}

/// One model reply: the parts of the first candidate, which may mix text
/// and function-call requests. An empty `parts` list is a valid reply (the
/// provider sometimes returns no candidates at all).
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub parts: Vec<MessagePart>,
}

impl ModelReply {
    /// First function-call request in the reply, if any.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.parts.iter().find_map(|p| p.as_function_call())
    }

    /// Concatenation of all plain-text parts; function-call parts are
    /// excluded from the user-visible answer.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.as_text())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Text plus optional inline image returned by an image-capable model.
#[derive(Debug, Clone, Default)]
pub struct GeneratedMedia {
    pub text: Option<String>,
    /// Base64-encoded PNG data, without any data-URL prefix.
    pub image_base64: Option<String>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        contents: &[ConversationMessage],
        tools: &[ToolDeclaration],
        options: &GenerationOptions,
    ) -> Result<ModelReply, AssistantError>;

    /// Paired text + image generation. Only the Gemini client implements
    /// this; other clients report it as unavailable.
    async fn generate_media(&self, _prompt: &str) -> Result<GeneratedMedia, AssistantError> {
        Err(AssistantError::LlmError(
            "image generation not supported by this client".to_string(),
        ))
    }
}
