//! Shared fakes for unit tests: a scripted model, an in-memory datastore,
//! and a no-op image store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core_types::{ConversationMessage, MessagePart};
use crate::datastore::{ItemRow, ItemSaleRow, MerchantData, OrderRow};
use crate::errors::AssistantError;
use crate::llm::{GeneratedMedia, GenerationOptions, LlmClient, ModelReply, ToolDeclaration};
use crate::storage::{ImageStore, StoredImage};
use crate::tools::Toolbox;

/// Replays a fixed sequence of model replies; errors once exhausted.
pub struct ScriptedLlm {
    replies: Mutex<Vec<Vec<MessagePart>>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Vec<MessagePart>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(
        &self,
        _contents: &[ConversationMessage],
        _tools: &[ToolDeclaration],
        _options: &GenerationOptions,
    ) -> Result<ModelReply, AssistantError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(AssistantError::LlmError("script exhausted".to_string()));
        }
        Ok(ModelReply {
            parts: replies.remove(0),
        })
    }
}

/// Fixed text/image media generator for the menu-item tool.
pub struct MediaLlm {
    text: Option<String>,
    image: Option<String>,
    fail: Option<String>,
}

impl MediaLlm {
    pub fn new(text: &str, image_base64: Option<&str>) -> Self {
        Self {
            text: Some(text.to_string()),
            image: image_base64.map(|s| s.to_string()),
            fail: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            text: None,
            image: None,
            fail: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl LlmClient for MediaLlm {
    async fn generate(
        &self,
        _contents: &[ConversationMessage],
        _tools: &[ToolDeclaration],
        _options: &GenerationOptions,
    ) -> Result<ModelReply, AssistantError> {
        Err(AssistantError::LlmError(
            "MediaLlm only generates media".to_string(),
        ))
    }

    async fn generate_media(&self, _prompt: &str) -> Result<GeneratedMedia, AssistantError> {
        if let Some(message) = &self.fail {
            return Err(AssistantError::LlmError(message.clone()));
        }
        Ok(GeneratedMedia {
            text: self.text.clone(),
            image_base64: self.image.clone(),
        })
    }
}

/// In-memory rows standing in for the Supabase tables.
#[derive(Default)]
pub struct MemoryData {
    pub orders: Vec<OrderRow>,
    /// `(order_id, item_id)` pairs, one per sold item.
    pub sales: Vec<(String, i64)>,
    /// `(item_id, item_name, cuisine_tag)` catalogue rows.
    pub catalogue: Vec<(i64, String, Option<String>)>,
    pub fail: Option<String>,
}

impl MemoryData {
    pub fn failing(message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), AssistantError> {
        match &self.fail {
            Some(message) => Err(AssistantError::DataError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MerchantData for MemoryData {
    async fn orders_in_window(
        &self,
        _merchant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<OrderRow>, AssistantError> {
        self.check()?;
        Ok(self
            .orders
            .iter()
            .filter(|o| o.order_time >= start && o.order_time <= end)
            .cloned()
            .collect())
    }

    async fn items_for_orders(
        &self,
        _merchant_id: &str,
        order_ids: &[String],
    ) -> Result<Vec<ItemSaleRow>, AssistantError> {
        self.check()?;
        Ok(self
            .sales
            .iter()
            .filter(|(order_id, _)| order_ids.contains(order_id))
            .map(|(order_id, item_id)| ItemSaleRow {
                order_id: order_id.clone(),
                item_id: *item_id,
            })
            .collect())
    }

    async fn item_names(&self, item_ids: &[i64]) -> Result<Vec<ItemRow>, AssistantError> {
        self.check()?;
        Ok(self
            .catalogue
            .iter()
            .filter(|(item_id, _, _)| item_ids.contains(item_id))
            .map(|(item_id, item_name, cuisine_tag)| ItemRow {
                item_id: *item_id,
                item_name: item_name.clone(),
                cuisine_tag: cuisine_tag.clone(),
            })
            .collect())
    }

    async fn merchant_cuisines(&self, _merchant_id: &str) -> Result<Vec<String>, AssistantError> {
        self.check()?;
        let mut cuisines = Vec::new();
        for (_, _, tag) in &self.catalogue {
            if let Some(tag) = tag {
                if !cuisines.contains(tag) {
                    cuisines.push(tag.clone());
                }
            }
        }
        Ok(cuisines)
    }
}

/// Accepts any upload and hands back a deterministic URL.
#[derive(Default)]
pub struct MemoryImages;

#[async_trait]
impl ImageStore for MemoryImages {
    async fn store_image(&self, _image_data: &str) -> Result<StoredImage, AssistantError> {
        Ok(StoredImage {
            url: "https://storage.test/generated-food-items/fake.png".to_string(),
        })
    }
}

/// Toolbox wired with in-memory fakes, for driver tests.
pub fn toolbox_with(data: MemoryData, llm: Arc<dyn LlmClient>) -> Toolbox {
    Toolbox::new(Arc::new(data), Arc::new(MemoryImages), llm)
}
