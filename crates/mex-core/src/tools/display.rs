//! `display_data_window` executor.
//!
//! Lets the model open a visualization panel directly, without an attached
//! analytics query. The dedup id derives from the window's type and title so
//! re-delivery of the same logical window opens it only once.

use serde_json::{json, Value};

use crate::context::MerchantContext;
use crate::tools::{stable_id, ClientAction, ToolResult};

pub fn display_data_window(args: &Value, ctx: &MerchantContext) -> ToolResult {
    let visualization_type = match args.get("visualization_type").and_then(|v| v.as_str()) {
        Some(kind @ ("chart" | "graph" | "stats")) => kind,
        _ => return ToolResult::failure("Missing or invalid 'visualization_type' parameter"),
    };
    let title = args
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Data Window");

    let id = stable_id(&["data-window", &ctx.merchant_id, visualization_type, title]);

    ToolResult::success()
        .with_field("window_type", json!(visualization_type))
        .with_field("title", json!(title))
        .with_id(id.clone())
        .with_client_action(ClientAction::new(
            ClientAction::ADD_DATA_WINDOW,
            json!({
                "visualization_type": visualization_type,
                "title": title,
                "id": id,
            }),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> MerchantContext {
        MerchantContext::new("m1", "Fried Chicken Express")
    }

    #[test]
    fn opens_window_with_stable_id() {
        let args = json!({"visualization_type": "stats", "title": "Overview"});
        let first = display_data_window(&args, &ctx());
        let second = display_data_window(&args, &ctx());
        assert!(first.success);
        assert_eq!(first.id, second.id);
        assert_eq!(first.data["window_type"], "stats");
    }

    #[test]
    fn rejects_unknown_visualization_type() {
        let result = display_data_window(&json!({"visualization_type": "table"}), &ctx());
        assert!(!result.success);
    }

    #[test]
    fn title_defaults_when_absent() {
        let result = display_data_window(&json!({"visualization_type": "chart"}), &ctx());
        assert!(result.success);
        assert_eq!(result.data["title"], "Data Window");
    }
}
