//! Conversation turn driver: the tool-calling orchestration loop.
//!
//! One turn takes the user's message plus the caller-supplied history, calls
//! the model, executes any tool it requests, feeds the result back, and
//! repeats until the model answers in plain text. The loop is strictly
//! sequential: one outbound call at a time, no retries, no parallel
//! dispatch. Two things end it early:
//!
//! - an unrecognized tool name, which signals a declaration/dispatch skew
//!   and degrades gracefully to whatever text the last reply carried;
//! - the round cap, which bounds the cost of a misbehaving model and marks
//!   the outcome as capped.

use std::sync::Arc;

use serde_json::json;

use crate::context::MerchantContext;
use crate::core_types::ConversationMessage;
use crate::errors::AssistantError;
use crate::llm::{GenerationOptions, LlmClient, ToolDeclaration};
use crate::prompts::SYSTEM_INSTRUCTION;
use crate::tools::{declarations, ToolName, ToolResult, Toolbox};

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Hard cap on tool dispatch rounds within one turn.
    pub max_tool_rounds: usize,
    pub system_instruction: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// Everything a turn produces. `history` is the caller's history extended
/// with this turn's entries; the caller owns it and resends it next turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub tool_results: Vec<ToolResult>,
    pub history: Vec<ConversationMessage>,
    /// True when the round cap cut the loop short; the answer is whatever
    /// text the last reply carried.
    pub capped: bool,
}

pub struct TurnDriver {
    llm: Arc<dyn LlmClient>,
    toolbox: Toolbox,
    config: DriverConfig,
    tool_declarations: Vec<ToolDeclaration>,
}

impl TurnDriver {
    pub fn new(llm: Arc<dyn LlmClient>, toolbox: Toolbox, config: DriverConfig) -> Self {
        Self {
            llm,
            toolbox,
            config,
            tool_declarations: declarations(),
        }
    }

    /// Runs one full turn. Errors only when no model response is obtained at
    /// all; once a first reply exists, degraded outcomes are returned rather
    /// than raised.
    pub async fn run_turn(
        &self,
        user_message: &str,
        history: Vec<ConversationMessage>,
        ctx: &MerchantContext,
    ) -> Result<TurnOutcome, AssistantError> {
        let options = GenerationOptions {
            system_instruction: Some(self.config.system_instruction.clone()),
            ..GenerationOptions::default()
        };

        let mut history = history;
        history.push(ConversationMessage::user_text(user_message));

        log::info!(
            "Turn started for merchant {} ({} prior messages)",
            ctx.merchant_id,
            history.len() - 1
        );

        let mut reply = self
            .llm
            .generate(&history, &self.tool_declarations, &options)
            .await?;

        let mut tool_results: Vec<ToolResult> = Vec::new();
        let mut capped = false;
        let mut rounds = 0;

        while let Some(call) = reply.function_call().cloned() {
            if rounds >= self.config.max_tool_rounds {
                log::warn!(
                    "Tool round cap ({}) reached; returning partial answer",
                    self.config.max_tool_rounds
                );
                capped = true;
                break;
            }
            rounds += 1;

            let tool = match ToolName::parse(&call.name) {
                Some(tool) => tool,
                None => {
                    // Advertised-but-unimplemented names should be impossible
                    // with the closed enum; a model inventing one degrades to
                    // the text we already have.
                    log::error!(
                        "Model requested unknown tool '{}'; stopping the loop",
                        call.name
                    );
                    break;
                }
            };

            log::info!("Dispatching tool {} (round {})", tool.as_str(), rounds);
            let result = self.toolbox.dispatch(tool, call.args.clone(), ctx).await;
            if !result.success {
                log::warn!(
                    "Tool {} reported failure: {}",
                    tool.as_str(),
                    result.error.as_deref().unwrap_or("unspecified")
                );
            }

            // The call and its result extend the history as a paired
            // model/user entry, then the model sees the extended history.
            history.push(ConversationMessage::model_function_call(call.clone()));
            history.push(ConversationMessage::user_function_response(
                &call.name,
                json!({ "result": result }),
            ));
            tool_results.push(result);

            reply = self
                .llm
                .generate(&history, &self.tool_declarations, &options)
                .await?;
        }

        let answer = reply.text();
        history.push(ConversationMessage::model_text(answer.clone()));

        log::info!(
            "Turn finished: {} tool rounds, {} answer chars{}",
            rounds,
            answer.len(),
            if capped { " (capped)" } else { "" }
        );

        Ok(TurnOutcome {
            answer,
            tool_results,
            history,
            capped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{MessagePart, Role};
    use crate::test_utils::{toolbox_with, MemoryData, ScriptedLlm};
    use serde_json::Value;

    fn ctx() -> MerchantContext {
        MerchantContext::new("m1", "Fried Chicken Express")
    }

    fn text_reply(text: &str) -> Vec<MessagePart> {
        vec![MessagePart::Text {
            text: text.to_string(),
        }]
    }

    fn call_reply(name: &str, args: Value) -> Vec<MessagePart> {
        vec![MessagePart::FunctionCall {
            function_call: crate::core_types::FunctionCall {
                name: name.to_string(),
                args,
            },
        }]
    }

    /// Walks a history and asserts every model function-call entry is
    /// immediately followed by a matching user function-response entry.
    fn assert_pairing(history: &[ConversationMessage]) {
        for (index, message) in history.iter().enumerate() {
            let Some(call) = message.parts.iter().find_map(|p| p.as_function_call()) else {
                continue;
            };
            assert_eq!(message.role, Role::Model);
            let next = history.get(index + 1).expect("call must have a response");
            assert_eq!(next.role, Role::User);
            match &next.parts[0] {
                MessagePart::FunctionResponse { function_response } => {
                    assert_eq!(function_response.name, call.name);
                }
                other => panic!("expected function response, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn plain_answer_makes_a_single_call() {
        let llm = ScriptedLlm::new(vec![text_reply("You sold 42 orders today.")]);
        let driver = TurnDriver::new(
            llm.clone(),
            toolbox_with(MemoryData::default(), llm.clone()),
            DriverConfig::default(),
        );

        let outcome = driver.run_turn("how did I do?", Vec::new(), &ctx()).await.unwrap();
        assert_eq!(outcome.answer, "You sold 42 orders today.");
        assert!(outcome.tool_results.is_empty());
        assert!(!outcome.capped);
        assert_eq!(llm.calls(), 1);
        // user message + final model answer
        assert_eq!(outcome.history.len(), 2);
    }

    #[tokio::test]
    async fn tool_round_extends_history_with_paired_entries() {
        let llm = ScriptedLlm::new(vec![
            call_reply("get_best_selling_day", Value::Null),
            text_reply("No sales data yet."),
        ]);
        let driver = TurnDriver::new(
            llm.clone(),
            toolbox_with(MemoryData::default(), llm.clone()),
            DriverConfig::default(),
        );

        let outcome = driver.run_turn("best day?", Vec::new(), &ctx()).await.unwrap();
        assert_eq!(outcome.answer, "No sales data yet.");
        assert_eq!(outcome.tool_results.len(), 1);
        assert!(outcome.tool_results[0].success);
        // user, functionCall, functionResponse, final answer
        assert_eq!(outcome.history.len(), 4);
        assert_pairing(&outcome.history);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_name_stops_gracefully() {
        let llm = ScriptedLlm::new(vec![vec![
            MessagePart::Text {
                text: "Checking the forecast.".to_string(),
            },
            MessagePart::FunctionCall {
                function_call: crate::core_types::FunctionCall {
                    name: "get_weather_forecast".to_string(),
                    args: Value::Null,
                },
            },
        ]]);
        let driver = TurnDriver::new(
            llm.clone(),
            toolbox_with(MemoryData::default(), llm.clone()),
            DriverConfig::default(),
        );

        let outcome = driver.run_turn("weather?", Vec::new(), &ctx()).await.unwrap();
        // Keeps the text from the reply that carried the unknown call.
        assert_eq!(outcome.answer, "Checking the forecast.");
        assert!(outcome.tool_results.is_empty());
        assert!(!outcome.capped);
        assert_eq!(llm.calls(), 1);
        assert_pairing(&outcome.history);
    }

    #[tokio::test]
    async fn round_cap_returns_partial_answer_with_flag() {
        // Model requests the same tool forever.
        let replies: Vec<Vec<MessagePart>> = (0..20)
            .map(|_| call_reply("get_weekly_sales", Value::Null))
            .collect();
        let llm = ScriptedLlm::new(replies);
        let config = DriverConfig {
            max_tool_rounds: 3,
            ..DriverConfig::default()
        };
        let driver = TurnDriver::new(
            llm.clone(),
            toolbox_with(MemoryData::default(), llm.clone()),
            config,
        );

        let outcome = driver.run_turn("weekly report", Vec::new(), &ctx()).await.unwrap();
        assert!(outcome.capped);
        assert_eq!(outcome.tool_results.len(), 3);
        assert_eq!(llm.calls(), 4);
        assert_pairing(&outcome.history);
    }

    #[tokio::test]
    async fn llm_failure_before_first_reply_is_an_error() {
        let llm = ScriptedLlm::new(Vec::new());
        let driver = TurnDriver::new(
            llm.clone(),
            toolbox_with(MemoryData::default(), llm.clone()),
            DriverConfig::default(),
        );

        let result = driver.run_turn("hello", Vec::new(), &ctx()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failing_tool_result_still_reaches_the_model() {
        let llm = ScriptedLlm::new(vec![
            call_reply("switch_language", serde_json::json!({"language_code": "fr"})),
            text_reply("Sorry, French isn't supported yet."),
        ]);
        let driver = TurnDriver::new(
            llm.clone(),
            toolbox_with(MemoryData::default(), llm.clone()),
            DriverConfig::default(),
        );

        let outcome = driver.run_turn("parlez-vous?", Vec::new(), &ctx()).await.unwrap();
        assert_eq!(outcome.tool_results.len(), 1);
        assert!(!outcome.tool_results[0].success);
        assert_eq!(outcome.answer, "Sorry, French isn't supported yet.");
        assert_pairing(&outcome.history);
    }
}
