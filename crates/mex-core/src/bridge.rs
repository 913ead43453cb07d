//! Client action bridge.
//!
//! Tool results may carry a `clientAction` telling the presentation layer to
//! mutate UI state. Results are re-inspected on every render of the turn
//! that produced them, so the bridge keys each action on a stable identifier
//! and applies it exactly once per key. Language switches are idempotent and
//! exempt from deduplication.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use crate::context::Language;
use crate::tools::{stable_id, ClientAction, ToolResult};

/// Visualization window parameters, as embedded in `ADD_DATA_WINDOW`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DataWindowParams {
    pub visualization_type: VisualizationKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// Inline data sufficient to render without a further round trip.
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationKind {
    Chart,
    Graph,
    Stats,
}

/// Menu-item window parameters, as embedded in `ADD_MENU_ITEM_WINDOW`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemParams {
    pub item_name: String,
    pub cuisine_tag: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Receiver for bridged actions; implemented by whatever owns UI state.
pub trait ClientActionHandler {
    fn open_data_window(&mut self, params: &DataWindowParams);
    fn open_menu_item_window(&mut self, params: &MenuItemParams);
    fn switch_language(&mut self, language: Language);
}

/// Applies client actions at most once per distinct result, surviving
/// repeated inspection of the same turn's results.
#[derive(Default)]
pub struct ActionBridge {
    applied: HashSet<String>,
}

impl ActionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply<H: ClientActionHandler>(&mut self, results: &[ToolResult], handler: &mut H) {
        for result in results {
            let Some(action) = &result.client_action else {
                continue;
            };
            self.apply_one(result, action, handler);
        }
    }

    fn apply_one<H: ClientActionHandler>(
        &mut self,
        result: &ToolResult,
        action: &ClientAction,
        handler: &mut H,
    ) {
        match action.kind.as_str() {
            ClientAction::ADD_DATA_WINDOW => {
                let Some(params) = decode::<DataWindowParams>(action) else {
                    return;
                };
                if self.mark_applied(result, action) {
                    handler.open_data_window(&params);
                }
            }
            ClientAction::ADD_MENU_ITEM_WINDOW => {
                let Some(params) = decode::<MenuItemParams>(action) else {
                    return;
                };
                if self.mark_applied(result, action) {
                    handler.open_menu_item_window(&params);
                }
            }
            ClientAction::SWITCH_LANGUAGE => {
                // Idempotent; reapplying on re-render is harmless.
                let code = action
                    .params
                    .get("language_code")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                match Language::from_code(code) {
                    Ok(language) => handler.switch_language(language),
                    Err(e) => log::warn!("Ignoring language switch: {}", e),
                }
            }
            other => {
                log::warn!("Unknown client action type '{}'; ignoring", other);
            }
        }
    }

    /// Records the action's dedup key; returns false if already applied.
    fn mark_applied(&mut self, result: &ToolResult, action: &ClientAction) -> bool {
        let key = dedup_key(result, action);
        self.applied.insert(key)
    }
}

/// Prefers the result's content-derived id; falls back to hashing the
/// action's type and parameters when absent.
fn dedup_key(result: &ToolResult, action: &ClientAction) -> String {
    if let Some(id) = &result.id {
        return id.clone();
    }
    stable_id(&[&action.kind, &action.params.to_string()])
}

fn decode<T: for<'de> Deserialize<'de>>(action: &ClientAction) -> Option<T> {
    match serde_json::from_value(action.params.clone()) {
        Ok(params) => Some(params),
        Err(e) => {
            log::warn!(
                "Malformed params for client action '{}': {}",
                action.kind,
                e
            );
            None
        }
    }
}
