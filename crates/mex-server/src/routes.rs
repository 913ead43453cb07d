//! HTTP surface of the assistant: the chat endpoint, merchant selection,
//! image upload, and a health probe.
//!
//! The chat endpoint is stateless across turns: the client owns the
//! conversation history and resends it with every message. The merchant
//! selection persists only in cookies; when a request carries no merchant,
//! the cookie and then the configured default fill it in.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{HeaderMap, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mex_core::context::{Language, MerchantContext};
use mex_core::core_types::ConversationMessage;
use mex_core::driver::TurnDriver;
use mex_core::storage::ImageStore;
use mex_core::suggestions::SuggestionGenerator;
use mex_core::tools::ToolResult;

const MERCHANT_ID_COOKIE: &str = "merchant_id";
const MERCHANT_NAME_COOKIE: &str = "merchant_name";
const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// Shown when a turn fails outright; the UI never renders a blank state.
const FALLBACK_MESSAGE: &str = "Sorry, I couldn't process your request. Please try again.";

#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<TurnDriver>,
    pub suggestions: Arc<SuggestionGenerator>,
    pub images: Arc<dyn ImageStore>,
    pub default_merchant: MerchantContext,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<ConversationMessage>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub history: Vec<ConversationMessage>,
    pub function_results: Option<Vec<ToolResult>>,
    pub suggested_prompts: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMerchantRequest {
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub merchant_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreImageRequest {
    #[serde(default)]
    pub image_data: Option<String>,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Reads a value from the request's `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get("cookie")?.to_str().ok()?;
    for pair in raw.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key == name {
            return urlencoding::decode(value).ok().map(|v| v.into_owned());
        }
    }
    None
}

fn set_cookie(name: &str, value: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}",
        name,
        urlencoding::encode(value),
        COOKIE_MAX_AGE_SECS
    )
}

/// Resolves the merchant scope for a request: explicit body value first,
/// then the selection cookies, then the configured default.
///
/// A display name is only paired with an id it actually belongs to. When
/// the body names a merchant the cookies don't, the id doubles as the name
/// rather than borrowing another merchant's label.
fn resolve_merchant(
    default: &MerchantContext,
    headers: &HeaderMap,
    merchant_id: Option<String>,
) -> MerchantContext {
    let cookie_id = cookie_value(headers, MERCHANT_ID_COOKIE);

    if let Some(id) = merchant_id.filter(|id| !id.is_empty()) {
        let name = if cookie_id.as_deref() == Some(id.as_str()) {
            cookie_value(headers, MERCHANT_NAME_COOKIE)
        } else if id == default.merchant_id {
            Some(default.merchant_name.clone())
        } else {
            None
        };
        let name = name.unwrap_or_else(|| id.clone());
        return MerchantContext::new(id, name);
    }

    match cookie_id {
        Some(id) => {
            let name = cookie_value(headers, MERCHANT_NAME_COOKIE).unwrap_or_else(|| id.clone());
            MerchantContext::new(id, name)
        }
        None => default.clone(),
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<serde_json::Value>)> {
    let ctx = resolve_merchant(&state.default_merchant, &headers, request.merchant_id.clone());
    let language = request
        .language
        .as_deref()
        .and_then(|code| Language::from_code(code).ok())
        .unwrap_or(Language::En);
    let history = request.history.unwrap_or_default();

    log::info!(
        "Chat request for merchant {} ({} history messages)",
        ctx.merchant_id,
        history.len()
    );

    let outcome = match state.driver.run_turn(&request.message, history, &ctx).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Turn failed for merchant {}: {}", ctx.merchant_id, e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": FALLBACK_MESSAGE,
                    "timestamp": chrono::Utc::now(),
                })),
            ));
        }
    };

    let suggested_prompts = state.suggestions.generate(&outcome.history, language).await;

    let function_results = if outcome.tool_results.is_empty() {
        None
    } else {
        Some(outcome.tool_results)
    };

    Ok(Json(ChatResponse {
        message: outcome.answer,
        history: outcome.history,
        function_results,
        suggested_prompts,
        timestamp: chrono::Utc::now(),
    }))
}

async fn set_merchant_handler(
    Json(request): Json<SetMerchantRequest>,
) -> impl IntoResponse {
    let (Some(merchant_id), Some(merchant_name)) = (request.merchant_id, request.merchant_name)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Missing merchantId or merchantName",
            })),
        )
            .into_response();
    };

    log::info!("Merchant selection changed to {}", merchant_id);
    (
        AppendHeaders([
            (SET_COOKIE, set_cookie(MERCHANT_ID_COOKIE, &merchant_id)),
            (SET_COOKIE, set_cookie(MERCHANT_NAME_COOKIE, &merchant_name)),
        ]),
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn store_image_handler(
    State(state): State<AppState>,
    Json(request): Json<StoreImageRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let Some(image_data) = request.image_data.filter(|d| !d.is_empty()) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "No image data provided"})),
        ));
    };

    match state.images.store_image(&image_data).await {
        Ok(stored) => Ok(Json(json!({"success": true, "url": stored.url}))),
        Err(e) => {
            log::error!("Image upload failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": e.to_string()})),
            ))
        }
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Builds the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/set-merchant", post(set_merchant_handler))
        .route("/api/images", post(store_image_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use mex_core::core_types::MessagePart;
    use mex_core::driver::{DriverConfig, TurnDriver};
    use mex_core::test_utils::{toolbox_with, MemoryData, MemoryImages, ScriptedLlm};

    fn state_with(llm: Arc<ScriptedLlm>) -> AppState {
        let driver = TurnDriver::new(
            llm.clone(),
            toolbox_with(MemoryData::default(), llm.clone()),
            DriverConfig::default(),
        );
        AppState {
            driver: Arc::new(driver),
            suggestions: Arc::new(SuggestionGenerator::new(llm)),
            images: Arc::new(MemoryImages),
            default_merchant: MerchantContext::new("0c2d7", "Fried Chicken Express"),
        }
    }

    fn chat_request(message: &str, merchant_id: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            merchant_id: merchant_id.map(|id| id.to_string()),
            language: None,
            history: None,
        }
    }

    fn selection_cookies() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("merchant_id=0c2d7; merchant_name=Fried%20Chicken%20Express"),
        );
        headers
    }

    #[tokio::test]
    async fn chat_returns_answer_and_suggestions() {
        let llm = ScriptedLlm::new(vec![vec![MessagePart::Text {
            text: "Sales look healthy this week.".to_string(),
        }]]);
        let state = state_with(llm);

        let Json(response) = chat_handler(
            State(state),
            HeaderMap::new(),
            Json(chat_request("how are sales?", None)),
        )
        .await
        .unwrap();

        assert_eq!(response.message, "Sales look healthy this week.");
        assert_eq!(response.history.len(), 2);
        assert!(response.function_results.is_none());
        // The suggestion model is exhausted, so the defaults fill in.
        assert!(!response.suggested_prompts.is_empty());
    }

    #[tokio::test]
    async fn chat_failure_returns_apology_with_timestamp() {
        let state = state_with(ScriptedLlm::new(Vec::new()));

        let (status, Json(body)) = chat_handler(
            State(state),
            HeaderMap::new(),
            Json(chat_request("how are sales?", None)),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], FALLBACK_MESSAGE);
        assert!(body.get("timestamp").is_some());
    }

    #[test]
    fn body_merchant_does_not_borrow_cookie_name() {
        let default = MerchantContext::new("0c2d7", "Fried Chicken Express");
        let ctx = resolve_merchant(&default, &selection_cookies(), Some("m42".to_string()));
        assert_eq!(ctx.merchant_id, "m42");
        assert_eq!(ctx.merchant_name, "m42");
    }

    #[test]
    fn cookie_name_applies_when_ids_agree() {
        let default = MerchantContext::new("fallback", "Fallback Kitchen");
        let ctx = resolve_merchant(&default, &selection_cookies(), Some("0c2d7".to_string()));
        assert_eq!(ctx.merchant_id, "0c2d7");
        assert_eq!(ctx.merchant_name, "Fried Chicken Express");

        let from_cookie = resolve_merchant(&default, &selection_cookies(), None);
        assert_eq!(from_cookie.merchant_id, "0c2d7");
        assert_eq!(from_cookie.merchant_name, "Fried Chicken Express");
    }

    #[test]
    fn missing_merchant_falls_back_to_default() {
        let default = MerchantContext::new("0c2d7", "Fried Chicken Express");
        let ctx = resolve_merchant(&default, &HeaderMap::new(), None);
        assert_eq!(ctx, default);

        let by_id = resolve_merchant(&default, &HeaderMap::new(), Some("0c2d7".to_string()));
        assert_eq!(by_id.merchant_name, "Fried Chicken Express");
    }

    #[test]
    fn chat_request_accepts_camel_case_body() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"message": "hi", "merchantId": "m9", "language": "ms", "history": []}"#,
        )
        .unwrap();
        assert_eq!(request.merchant_id.as_deref(), Some("m9"));
        assert_eq!(request.language.as_deref(), Some("ms"));
        assert_eq!(request.history.unwrap().len(), 0);
    }

    #[test]
    fn chat_response_uses_camel_case_fields() {
        let response = ChatResponse {
            message: "done".to_string(),
            history: Vec::new(),
            function_results: None,
            suggested_prompts: vec!["Show weekly totals".to_string()],
            timestamp: chrono::Utc::now(),
        };
        let wire = serde_json::to_value(&response).unwrap();
        assert!(wire.get("suggestedPrompts").is_some());
        assert!(wire.get("functionResults").is_some());
    }

    #[test]
    fn cookie_values_round_trip_with_encoding() {
        let header = set_cookie(MERCHANT_NAME_COOKIE, "Fried Chicken Express");
        assert!(header.starts_with("merchant_name=Fried%20Chicken%20Express"));
        assert!(header.contains("Max-Age=604800"));

        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("merchant_id=0c2d7; merchant_name=Fried%20Chicken%20Express"),
        );
        assert_eq!(
            cookie_value(&headers, MERCHANT_ID_COOKIE).as_deref(),
            Some("0c2d7")
        );
        assert_eq!(
            cookie_value(&headers, MERCHANT_NAME_COOKIE).as_deref(),
            Some("Fried Chicken Express")
        );
        assert!(cookie_value(&headers, "missing").is_none());
    }
}
