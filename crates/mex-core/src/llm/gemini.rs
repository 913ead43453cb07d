//! Google Gemini API client.
//!
//! Talks directly to the `generateContent` REST endpoints. Conversation
//! messages already use the Gemini wire shape, so the request body embeds
//! them without translation. Response parsing is deliberately lenient:
//! the provider occasionally returns no `candidates` or a candidate with
//! empty `parts`, and both map to an empty reply rather than an error.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use async_trait::async_trait;

use crate::core_types::{ConversationMessage, MessagePart, Role};
use crate::errors::AssistantError;
use crate::llm::{GeneratedMedia, GenerationOptions, LlmClient, ModelReply, ToolDeclaration};

pub struct GeminiClient {
    api_key: String,
    model: String,
    image_model: String,
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, image_model: String) -> Self {
        Self {
            api_key,
            model,
            image_model,
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        image_model: String,
        base_url: String,
    ) -> Self {
        Self {
            api_key,
            model,
            image_model,
            client: Client::new(),
            base_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: &'a [ConversationMessage],
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<MessagePart>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseModalities", skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<MessagePart>,
    #[allow(dead_code)]
    role: Option<Role>,
}

/// Image-generation responses carry an extra part kind (`inlineData`) that
/// the chat shapes never produce, so they get their own parsing types.
#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    candidates: Vec<MediaCandidate>,
}

#[derive(Debug, Deserialize)]
struct MediaCandidate {
    #[serde(default)]
    content: Option<MediaContent>,
}

#[derive(Debug, Deserialize)]
struct MediaContent {
    #[serde(default)]
    parts: Vec<MediaPart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MediaPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    #[allow(dead_code)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    code: u16,
    message: String,
}

impl GeminiClient {
    async fn post_generate(&self, model: &str, body: &Value) -> Result<Value, AssistantError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AssistantError::LlmError(format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(gemini_error) = serde_json::from_str::<GeminiError>(&error_text) {
                return Err(AssistantError::LlmError(format!(
                    "Gemini API error {}: {}",
                    gemini_error.error.code, gemini_error.error.message
                )));
            }

            return Err(AssistantError::LlmError(format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AssistantError::ParsingError(format!("Failed to read Gemini response: {}", e))
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        contents: &[ConversationMessage],
        tools: &[ToolDeclaration],
        options: &GenerationOptions,
    ) -> Result<ModelReply, AssistantError> {
        let system_instruction = options.system_instruction.as_ref().map(|text| {
            SystemInstruction {
                parts: vec![MessagePart::Text { text: text.clone() }],
            }
        });

        let gemini_tools = if tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: tools.to_vec(),
            }])
        };

        let request = GeminiRequest {
            contents,
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                response_modalities: Vec::new(),
            },
            system_instruction,
            tools: gemini_tools,
        };

        let body = serde_json::to_value(&request).map_err(|e| {
            AssistantError::ParsingError(format!("Failed to encode Gemini request: {}", e))
        })?;

        let raw = self.post_generate(&self.model, &body).await?;
        let parsed: GeminiResponse = serde_json::from_value(raw).map_err(|e| {
            AssistantError::ParsingError(format!("Failed to parse Gemini response: {}", e))
        })?;

        let parts = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        Ok(ModelReply { parts })
    }

    async fn generate_media(&self, prompt: &str) -> Result<GeneratedMedia, AssistantError> {
        let body = serde_json::json!({
            "contents": [ConversationMessage::user_text(prompt)],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
            },
        });

        let raw = self.post_generate(&self.image_model, &body).await?;
        let parsed: MediaResponse = serde_json::from_value(raw).map_err(|e| {
            AssistantError::ParsingError(format!("Failed to parse image response: {}", e))
        })?;

        let mut media = GeneratedMedia::default();
        let parts = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        for part in parts {
            match part {
                MediaPart::Text { text } => {
                    let combined = match media.text.take() {
                        Some(existing) => format!("{}\n{}", existing, text),
                        None => text,
                    };
                    media.text = Some(combined);
                }
                MediaPart::Inline { inline_data } => {
                    // Keep the first image only; payloads stay base64 until
                    // the storage collaborator decodes them.
                    if media.image_base64.is_none() {
                        media.image_base64 = Some(inline_data.data);
                    }
                }
            }
        }

        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_without_candidates_parses_to_empty_reply() {
        let parsed: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[test]
    fn candidate_with_empty_parts_is_tolerated() {
        let parsed: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": []}}]
        }))
        .unwrap();
        let parts = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();
        assert!(parts.is_empty());
    }

    #[test]
    fn mixed_text_and_function_call_parts_parse() {
        let parsed: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "Let me check."},
                {"functionCall": {"name": "get_weekly_sales", "args": {}}}
            ]}}]
        }))
        .unwrap();
        let reply = ModelReply {
            parts: parsed.candidates.into_iter().next().unwrap().content.unwrap().parts,
        };
        assert_eq!(reply.text(), "Let me check.");
        assert_eq!(reply.function_call().unwrap().name, "get_weekly_sales");
    }

    #[test]
    fn inline_image_part_parses() {
        let parsed: MediaResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"text": "**Description:** A tasty dish"},
                {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
            ]}}]
        }))
        .unwrap();
        let parts = parsed.candidates.into_iter().next().unwrap().content.unwrap().parts;
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn request_embeds_history_without_translation() {
        let contents = vec![ConversationMessage::user_text("hi")];
        let request = GeminiRequest {
            contents: &contents,
            generation_config: GeminiGenerationConfig {
                temperature: 0.7,
                max_output_tokens: 4096,
                response_modalities: Vec::new(),
            },
            system_instruction: None,
            tools: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert!(body.get("tools").is_none());
    }
}
