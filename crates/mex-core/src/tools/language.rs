//! `switch_language` executor.
//!
//! Validates the requested code against the supported set and emits a
//! `SWITCH_LANGUAGE` client action. Applying the action repeatedly is
//! harmless, so the result carries no dedup id.

use serde_json::{json, Value};

use crate::context::Language;
use crate::tools::{ClientAction, ToolResult};

pub fn switch_language(args: &Value) -> ToolResult {
    let code = match args.get("language_code").and_then(|v| v.as_str()) {
        Some(code) => code,
        None => return ToolResult::failure("Missing 'language_code' parameter"),
    };

    let language = match Language::from_code(code) {
        Ok(language) => language,
        Err(e) => return ToolResult::failure(e.to_string()),
    };

    log::info!("Switching display language to {}", language.label());
    ToolResult::success()
        .with_field("language", json!(language.code()))
        .with_field(
            "message",
            json!(format!("Interface language switched to {}", language.label())),
        )
        .with_client_action(ClientAction::new(
            ClientAction::SWITCH_LANGUAGE,
            json!({"language_code": language.code()}),
        ))
}
