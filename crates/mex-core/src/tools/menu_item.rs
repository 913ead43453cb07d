//! `get_item_suggestions` executor.
//!
//! Generates a candidate menu item for the merchant: a name and description
//! from the image-capable model plus a generated photo, uploaded to blob
//! storage so the result carries a URL rather than image bytes. The model
//! likes to prefix its text with markers such as `**Description:**`, which
//! are stripped before the text reaches the user.

use regex::Regex;
use serde_json::{json, Value};

use crate::context::MerchantContext;
use crate::datastore::MerchantData;
use crate::llm::LlmClient;
use crate::storage::ImageStore;
use crate::tools::{stable_id, ClientAction, ToolResult};

const FALLBACK_ITEM_NAME: &str = "Chef's Special";

pub async fn item_suggestions(
    data: &dyn MerchantData,
    llm: &dyn LlmClient,
    images: &dyn ImageStore,
    ctx: &MerchantContext,
) -> ToolResult {
    let cuisines = match data.merchant_cuisines(&ctx.merchant_id).await {
        Ok(cuisines) => cuisines,
        Err(e) => return ToolResult::failure(e.to_string()),
    };
    let cuisine = cuisines
        .first()
        .cloned()
        .unwrap_or_else(|| "local".to_string());

    let prompt = format!(
        "Suggest one new menu item for '{}', a {} food-delivery restaurant. \
         Reply with the item name on the first line, then a short appetizing \
         description (2-3 sentences), and generate a photo of the dish.",
        ctx.merchant_name, cuisine
    );

    let media = match llm.generate_media(&prompt).await {
        Ok(media) => media,
        Err(e) => return ToolResult::failure(e.to_string()),
    };

    let (item_name, description) = parse_generated_text(media.text.as_deref().unwrap_or(""));

    let image_url = match media.image_base64 {
        Some(encoded) => match images.store_image(&encoded).await {
            Ok(stored) => Some(stored.url),
            Err(e) => return ToolResult::failure(e.to_string()),
        },
        None => {
            log::warn!("Image model returned no inline image for '{}'", item_name);
            None
        }
    };

    let id = stable_id(&["menu-item", &ctx.merchant_id, &cuisine, &item_name]);

    ToolResult::success()
        .with_field("item_name", json!(item_name))
        .with_field("cuisine_tag", json!(cuisine))
        .with_field("description", json!(description))
        .with_field(
            "image_url",
            image_url.as_ref().map(|u| json!(u)).unwrap_or(Value::Null),
        )
        .with_id(id.clone())
        .with_client_action(ClientAction::new(
            ClientAction::ADD_MENU_ITEM_WINDOW,
            json!({
                "itemName": item_name,
                "cuisineTag": cuisine,
                "description": description,
                "imageUrl": image_url,
                "id": id,
            }),
        ))
}

/// Splits generated text into an item name (first non-empty line) and a
/// description (the rest), stripping `**Name:**` / `**Description:**` style
/// markers the model tends to prepend.
fn parse_generated_text(text: &str) -> (String, String) {
    let marker = Regex::new(r"(?i)^[\s*#]*(?:item\s+name|name|description)\s*:?[\s*]*")
        .expect("marker pattern is valid");

    let mut lines = text
        .lines()
        .map(|line| marker.replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty());

    let name = lines.next().unwrap_or_else(|| FALLBACK_ITEM_NAME.to_string());
    let description = lines.collect::<Vec<_>>().join("\n");
    (name, description)
}
