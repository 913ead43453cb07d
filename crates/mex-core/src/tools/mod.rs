//! Tool set advertised to the model and executed by the turn driver.
//!
//! Tool names form a closed enum dispatched through an exhaustive match, so
//! a tool advertised to the model without a matching executor cannot exist:
//! adding a variant without wiring its declaration and dispatch arm is a
//! compile error. Executors are infallible at the signature level; every
//! failure mode folds into a `{success: false, error}` result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::context::MerchantContext;
use crate::datastore::MerchantData;
use crate::llm::{LlmClient, ToolDeclaration};
use crate::storage::ImageStore;

pub mod analytics;
pub mod display;
pub mod language;
pub mod menu_item;

/// Tagged instruction for the presentation layer, embedded in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Value,
}

impl ClientAction {
    pub const ADD_DATA_WINDOW: &'static str = "ADD_DATA_WINDOW";
    pub const ADD_MENU_ITEM_WINDOW: &'static str = "ADD_MENU_ITEM_WINDOW";
    pub const SWITCH_LANGUAGE: &'static str = "SWITCH_LANGUAGE";

    pub fn new(kind: &str, params: Value) -> Self {
        Self {
            kind: kind.to_string(),
            params,
        }
    }
}

/// The JSON value returned by a tool executor. Tool-specific fields live in
/// the flattened `data` map; the conventional fields are typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "clientAction", skip_serializing_if = "Option::is_none")]
    pub client_action: Option<ClientAction>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResult {
    pub fn success() -> Self {
        Self {
            success: true,
            id: None,
            error: None,
            client_action: None,
            data: Map::new(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(reason.into()),
            client_action: None,
            data: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_client_action(mut self, action: ClientAction) -> Self {
        self.client_action = Some(action);
        self
    }
}

/// Derives a stable identifier from a result's semantic content, so repeated
/// deliveries of the same logical result share a dedup key. Never time-based.
pub fn stable_id(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    hex_prefix(&digest, 16)
}

fn hex_prefix(bytes: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
        if out.len() >= len {
            break;
        }
    }
    out.truncate(len);
    out
}

/// Closed set of tools the assistant exposes to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetTopSellingItems,
    GetBestSellingDay,
    GetWeeklySales,
    GetItemSuggestions,
    DisplayDataWindow,
    SwitchLanguage,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::GetTopSellingItems,
        ToolName::GetBestSellingDay,
        ToolName::GetWeeklySales,
        ToolName::GetItemSuggestions,
        ToolName::DisplayDataWindow,
        ToolName::SwitchLanguage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetTopSellingItems => "get_top_selling_items",
            ToolName::GetBestSellingDay => "get_best_selling_day",
            ToolName::GetWeeklySales => "get_weekly_sales",
            ToolName::GetItemSuggestions => "get_item_suggestions",
            ToolName::DisplayDataWindow => "display_data_window",
            ToolName::SwitchLanguage => "switch_language",
        }
    }

    /// Looks up a name requested by the model. `None` signals registry skew
    /// and makes the driver stop its loop gracefully.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    pub fn declaration(&self) -> ToolDeclaration {
        let (description, parameters) = match self {
            ToolName::GetTopSellingItems => (
                "Returns the top selling items for the merchant during a specific time period",
                json!({
                    "type": "object",
                    "properties": {
                        "time_period": {
                            "type": "string",
                            "enum": ["week", "month"],
                            "description": "The time period to analyze: week (last 7 days) or month (last 30 days)"
                        }
                    },
                    "required": ["time_period"]
                }),
            ),
            ToolName::GetBestSellingDay => (
                "Returns the best selling day for the merchant based on total order value",
                json!({"type": "object", "properties": {}, "required": []}),
            ),
            ToolName::GetWeeklySales => (
                "Returns sales data aggregated by week for the merchant",
                json!({"type": "object", "properties": {}, "required": []}),
            ),
            ToolName::GetItemSuggestions => (
                "Suggests a potential new menu item based on the merchant's cuisine types, with a generated description and photo",
                json!({"type": "object", "properties": {}, "required": []}),
            ),
            ToolName::DisplayDataWindow => (
                "Displays a data visualization window in the interface. Use this when you want to show charts, graphs, or statistics to the user.",
                json!({
                    "type": "object",
                    "properties": {
                        "visualization_type": {
                            "type": "string",
                            "enum": ["chart", "graph", "stats"],
                            "description": "The type of visualization to display"
                        },
                        "title": {
                            "type": "string",
                            "description": "Title for the visualization window (optional)"
                        }
                    },
                    "required": ["visualization_type"]
                }),
            ),
            ToolName::SwitchLanguage => (
                "Automatically switches the user interface language when detecting the user is speaking a different language. Call this function directly without asking for user confirmation.",
                json!({
                    "type": "object",
                    "properties": {
                        "language_code": {
                            "type": "string",
                            "enum": ["en", "ms", "zh", "ta"],
                            "description": "The language code to switch to: en (English), ms (Bahasa Melayu), zh (Chinese), ta (Tamil)"
                        }
                    },
                    "required": ["language_code"]
                }),
            ),
        };

        ToolDeclaration {
            name: self.as_str().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// All declarations, in advertisement order.
pub fn declarations() -> Vec<ToolDeclaration> {
    ToolName::ALL.iter().map(|t| t.declaration()).collect()
}

/// Validates call arguments against the tool's declared parameter schema.
/// Returns a human-readable reason on mismatch.
fn validate_arguments(tool: ToolName, args: &Value) -> Option<String> {
    let schema = tool.declaration().parameters;
    let compiled = match jsonschema::JSONSchema::compile(&schema) {
        Ok(compiled) => compiled,
        Err(e) => {
            // A broken declaration is a programming error, but the executor
            // contract forbids letting it escape as a panic.
            log::error!("Invalid parameter schema for {}: {}", tool.as_str(), e);
            return Some(format!("Internal schema error for {}", tool.as_str()));
        }
    };

    if compiled.is_valid(args) {
        return None;
    }

    let detail = compiled
        .validate(args)
        .err()
        .and_then(|mut errors| errors.next())
        .map(|e| e.to_string())
        .unwrap_or_else(|| "schema violation".to_string());
    Some(format!(
        "Invalid arguments for {}: {}",
        tool.as_str(),
        detail
    ))
}

/// Executes tools against the external collaborators. Held by the turn
/// driver; one instance serves all turns.
pub struct Toolbox {
    data: Arc<dyn MerchantData>,
    images: Arc<dyn ImageStore>,
    llm: Arc<dyn LlmClient>,
}

impl Toolbox {
    pub fn new(
        data: Arc<dyn MerchantData>,
        images: Arc<dyn ImageStore>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self { data, images, llm }
    }

    pub async fn dispatch(
        &self,
        tool: ToolName,
        args: Value,
        ctx: &MerchantContext,
    ) -> ToolResult {
        // Zero-argument calls arrive with `args` absent; normalize so the
        // object schemas accept them.
        let args = if args.is_null() { json!({}) } else { args };

        if let Some(reason) = validate_arguments(tool, &args) {
            log::warn!("Rejected tool call: {}", reason);
            return ToolResult::failure(reason);
        }

        match tool {
            ToolName::GetTopSellingItems => {
                analytics::top_selling_items(self.data.as_ref(), &args, ctx).await
            }
            ToolName::GetBestSellingDay => {
                analytics::best_selling_day(self.data.as_ref(), ctx).await
            }
            ToolName::GetWeeklySales => analytics::weekly_sales(self.data.as_ref(), ctx).await,
            ToolName::GetItemSuggestions => {
                menu_item::item_suggestions(
                    self.data.as_ref(),
                    self.llm.as_ref(),
                    self.images.as_ref(),
                    ctx,
                )
                .await
            }
            ToolName::DisplayDataWindow => display::display_data_window(&args, ctx),
            ToolName::SwitchLanguage => language::switch_language(&args),
        }
    }
}
