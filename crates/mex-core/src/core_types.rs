//! Conversation message types in the Gemini wire format.
//!
//! These shapes serialize byte-compatibly with the `contents` array of the
//! Gemini `generateContent` REST API, so a client-supplied history can be
//! deserialized, extended by the turn driver, and sent back out without any
//! translation layer. The conversation is append-only: the driver only ever
//! pushes new messages, never mutates or removes existing ones.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gemini conversation roles. Function responses are attributed to `User`
/// per the API's alternation rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single part of a conversation message: plain text, a function-call
/// request from the model, or the function response fed back to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessagePart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl ConversationMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    /// Model-authored message carrying the function call the driver is about
    /// to execute.
    pub fn model_function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Model,
            parts: vec![MessagePart::FunctionCall {
                function_call: call,
            }],
        }
    }

    /// User-authored message wrapping an executed tool's result.
    pub fn user_function_response(name: impl Into<String>, result: Value) -> Self {
        Self {
            role: Role::User,
            parts: vec![MessagePart::FunctionResponse {
                function_response: FunctionResponse {
                    name: name.into(),
                    response: result,
                },
            }],
        }
    }
}

impl MessagePart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            MessagePart::FunctionCall { function_call } => Some(function_call),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_part_serializes_to_wire_shape() {
        let msg = ConversationMessage::user_text("hello");
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire, json!({"role": "user", "parts": [{"text": "hello"}]}));
    }

    #[test]
    fn function_call_part_serializes_to_wire_shape() {
        let msg = ConversationMessage::model_function_call(FunctionCall {
            name: "get_weekly_sales".to_string(),
            args: json!({}),
        });
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            wire,
            json!({
                "role": "model",
                "parts": [{"functionCall": {"name": "get_weekly_sales", "args": {}}}]
            })
        );
    }

    #[test]
    fn history_round_trip_preserves_order_and_roles() {
        let history = vec![
            ConversationMessage::user_text("top items this week?"),
            ConversationMessage::model_function_call(FunctionCall {
                name: "get_top_selling_items".to_string(),
                args: json!({"time_period": "week"}),
            }),
            ConversationMessage::user_function_response(
                "get_top_selling_items",
                json!({"result": {"success": true, "items": []}}),
            ),
            ConversationMessage::model_text("No sales recorded this week."),
        ];

        let wire = serde_json::to_string(&history).unwrap();
        let back: Vec<ConversationMessage> = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn function_call_without_args_deserializes() {
        // Gemini omits `args` entirely for zero-argument calls.
        let part: MessagePart =
            serde_json::from_value(json!({"functionCall": {"name": "get_best_selling_day"}}))
                .unwrap();
        let call = part.as_function_call().unwrap();
        assert_eq!(call.name, "get_best_selling_day");
        assert!(call.args.is_null());
    }
}
