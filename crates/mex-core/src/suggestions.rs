//! Follow-up prompt generation.
//!
//! A single model call, independent of the tool loop, proposes 3-4 short
//! follow-up questions from the recent conversation tail. The generator is
//! total: any failure path (short history, missing credentials, provider
//! error, unusable output) lands on the static per-language defaults, so
//! the UI always has suggestion chips to show.

use std::sync::Arc;

use regex::Regex;

use crate::context::Language;
use crate::core_types::ConversationMessage;
use crate::llm::{GenerationOptions, LlmClient};
use crate::prompts::{SUGGESTION_PROMPT, SUGGESTION_SYSTEM_INSTRUCTION};

/// Most recent messages considered when generating suggestions; older
/// history is dropped to bound prompt size and keep suggestions topical.
const CONTEXT_TAIL: usize = 6;

const MAX_SUGGESTIONS: usize = 4;
const MAX_SUGGESTION_CHARS: usize = 45;

pub struct SuggestionGenerator {
    llm: Arc<dyn LlmClient>,
}

impl SuggestionGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Proposes follow-up questions for the conversation. Never fails and
    /// never returns an empty list.
    pub async fn generate(
        &self,
        history: &[ConversationMessage],
        language: Language,
    ) -> Vec<String> {
        if history.len() < 2 {
            return default_suggestions(language);
        }

        let tail_start = history.len().saturating_sub(CONTEXT_TAIL);
        let mut contents: Vec<ConversationMessage> = history[tail_start..].to_vec();
        contents.push(ConversationMessage::user_text(SUGGESTION_PROMPT));

        let options = GenerationOptions {
            system_instruction: Some(SUGGESTION_SYSTEM_INSTRUCTION.to_string()),
            temperature: 0.7,
            max_output_tokens: 150,
        };

        let reply = match self.llm.generate(&contents, &[], &options).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Suggestion generation failed, using defaults: {}", e);
                return default_suggestions(language);
            }
        };

        let suggestions = parse_suggestions(&reply.text());
        if suggestions.is_empty() {
            default_suggestions(language)
        } else {
            suggestions
        }
    }
}

/// Cleans raw model output into at most four short suggestion lines.
fn parse_suggestions(raw: &str) -> Vec<String> {
    // Numbered-bullet prefixes are only stripped when the digits are
    // followed by a `.` or `)`, so a suggestion starting with a bare year
    // or count keeps its digits.
    let leading = Regex::new(r#"^(?:[\s"'\-•*]+|\d+[.)]\s*)+"#).expect("leading pattern is valid");
    let trailing = Regex::new(r#"[\s"'\-]+$"#).expect("trailing pattern is valid");

    raw.lines()
        .map(|line| {
            let line = leading.replace(line, "");
            trailing.replace(&line, "").trim().to_string()
        })
        .filter(|line| !line.is_empty() && line.chars().count() <= MAX_SUGGESTION_CHARS)
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Static fallback suggestions, always non-empty.
pub fn default_suggestions(language: Language) -> Vec<String> {
    let lines: [&str; 4] = match language {
        Language::En => [
            "Show me this month's sales trends",
            "What are my best-selling items?",
            "Which day had the highest sales?",
            "Any issues I should address?",
        ],
        Language::Ms => [
            "Tunjukkan tren jualan bulan ini",
            "Apakah item paling laris saya?",
            "Hari mana jualan paling tinggi?",
            "Ada isu yang perlu diselesaikan?",
        ],
        Language::Zh => [
            "显示本月的销售趋势",
            "我最畅销的商品是什么？",
            "哪一天的销售额最高？",
            "有什么问题需要处理吗？",
        ],
        Language::Ta => [
            "இந்த மாத விற்பனை போக்கைக் காட்டு",
            "அதிகம் விற்பனையாகும் உணவுகள் எவை?",
            "எந்த நாளில் விற்பனை அதிகம்?",
            "கவனிக்க வேண்டிய சிக்கல்கள் உள்ளதா?",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

/// Suggestions shown right after a merchant switch, before any conversation
/// exists for the model to work from.
pub fn merchant_suggestions(language: Language) -> Vec<String> {
    default_suggestions(language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::MessagePart;
    use crate::test_utils::ScriptedLlm;

    fn two_message_history() -> Vec<ConversationMessage> {
        vec![
            ConversationMessage::user_text("how are sales?"),
            ConversationMessage::model_text("Sales are up 12% this week."),
        ]
    }

    #[tokio::test]
    async fn short_history_uses_defaults_without_calling_the_model() {
        let llm = ScriptedLlm::new(Vec::new());
        let generator = SuggestionGenerator::new(llm.clone());

        let suggestions = generator.generate(&[], Language::En).await;
        assert_eq!(suggestions, default_suggestions(Language::En));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_language_defaults() {
        let llm = ScriptedLlm::new(Vec::new());
        let generator = SuggestionGenerator::new(llm.clone());

        let suggestions = generator.generate(&two_message_history(), Language::Zh).await;
        assert_eq!(suggestions, default_suggestions(Language::Zh));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn raw_output_is_cleaned_and_capped() {
        let raw = "- \"What are my peak hours?\"\n\
                   • Compare this week to last week\n\
                   1. How can I reduce slow-moving stock right now across every outlet I operate?\n\
                   \n\
                   * Any promo ideas?\n\
                   - Show weekly totals\n\
                   - One more that should be dropped";
        let llm = ScriptedLlm::new(vec![vec![MessagePart::Text {
            text: raw.to_string(),
        }]]);
        let generator = SuggestionGenerator::new(llm.clone());

        let suggestions = generator.generate(&two_message_history(), Language::En).await;
        assert_eq!(suggestions.len(), 4);
        assert_eq!(suggestions[0], "What are my peak hours?");
        assert_eq!(suggestions[1], "Compare this week to last week");
        // The over-length line was discarded entirely.
        assert!(suggestions.iter().all(|s| s.chars().count() <= 45));
    }

    #[test]
    fn leading_digits_survive_bullet_cleanup() {
        let parsed = parse_suggestions("1. 2024 vs 2023 sales?\n2) Top items this month\n- 3 ways to cut waste?");
        assert_eq!(parsed[0], "2024 vs 2023 sales?");
        assert_eq!(parsed[1], "Top items this month");
        assert_eq!(parsed[2], "3 ways to cut waste?");
    }

    #[test]
    fn defaults_exist_for_every_language_within_limits() {
        for language in Language::ALL {
            let suggestions = default_suggestions(language);
            assert!(!suggestions.is_empty());
            assert!(suggestions.len() <= 4);
            for suggestion in suggestions {
                assert!(
                    suggestion.chars().count() <= 45,
                    "'{}' too long for {}",
                    suggestion,
                    language
                );
            }
        }
    }
}
