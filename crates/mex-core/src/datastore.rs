//! Relational data collaborator.
//!
//! The assistant treats every query as a black-box row fetch over the
//! `transaction_data`, `transaction_items`, and `items` tables, scoped by
//! merchant and date range. All counting, grouping, and top-N selection
//! happens in the tool executors over the fetched rows. The production
//! implementation speaks PostgREST (Supabase) over HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::errors::AssistantError;

/// One row of `transaction_data`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRow {
    pub order_id: String,
    pub order_time: DateTime<Utc>,
    #[serde(default)]
    pub order_value: f64,
}

/// One row of `transaction_items`, linking an order to a sold item.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSaleRow {
    pub order_id: String,
    pub item_id: i64,
}

/// One row of `items`.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRow {
    pub item_id: i64,
    pub item_name: String,
    #[serde(default)]
    pub cuisine_tag: Option<String>,
}

#[async_trait]
pub trait MerchantData: Send + Sync {
    /// Orders placed by the merchant inside the closed window `[start, end]`.
    async fn orders_in_window(
        &self,
        merchant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<OrderRow>, AssistantError>;

    /// Item-sale rows for the given orders, scoped to the merchant.
    async fn items_for_orders(
        &self,
        merchant_id: &str,
        order_ids: &[String],
    ) -> Result<Vec<ItemSaleRow>, AssistantError>;

    /// Item catalogue rows for the given item ids.
    async fn item_names(&self, item_ids: &[i64]) -> Result<Vec<ItemRow>, AssistantError>;

    /// Distinct cuisine tags on the merchant's menu, for item suggestions.
    async fn merchant_cuisines(&self, merchant_id: &str) -> Result<Vec<String>, AssistantError>;
}

/// PostgREST-backed implementation against a Supabase project.
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SupabaseStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, AssistantError> {
        let url = format!("{}/rest/v1/{}?{}", self.base_url, table, query);
        log::debug!("Supabase query: {} ({})", table, query);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| AssistantError::DataError(format!("Query to '{}' failed: {}", table, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::DataError(format!(
                "Query to '{}' failed with status {}: {}",
                table, status, body
            )));
        }

        response.json().await.map_err(|e| {
            AssistantError::DataError(format!("Failed to parse rows from '{}': {}", table, e))
        })
    }
}

/// Builds a PostgREST `in.(...)` filter value from raw keys.
fn in_filter<T: ToString>(keys: &[T]) -> String {
    let joined = keys
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", joined)
}

#[async_trait]
impl MerchantData for SupabaseStore {
    async fn orders_in_window(
        &self,
        merchant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<OrderRow>, AssistantError> {
        let query = format!(
            "select=order_id,order_time,order_value&merchant_id=eq.{}&order_time=gte.{}&order_time=lte.{}",
            urlencoding::encode(merchant_id),
            start.to_rfc3339(),
            end.to_rfc3339(),
        );
        self.fetch("transaction_data", &query).await
    }

    async fn items_for_orders(
        &self,
        merchant_id: &str,
        order_ids: &[String],
    ) -> Result<Vec<ItemSaleRow>, AssistantError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "select=order_id,item_id&merchant_id=eq.{}&order_id={}",
            urlencoding::encode(merchant_id),
            in_filter(order_ids),
        );
        self.fetch("transaction_items", &query).await
    }

    async fn item_names(&self, item_ids: &[i64]) -> Result<Vec<ItemRow>, AssistantError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "select=item_id,item_name,cuisine_tag&item_id={}",
            in_filter(item_ids)
        );
        self.fetch("items", &query).await
    }

    async fn merchant_cuisines(&self, merchant_id: &str) -> Result<Vec<String>, AssistantError> {
        #[derive(Debug, Deserialize)]
        struct CuisineRow {
            cuisine_tag: Option<String>,
        }

        let query = format!(
            "select=cuisine_tag&merchant_id=eq.{}",
            urlencoding::encode(merchant_id)
        );
        let rows: Vec<CuisineRow> = self.fetch("items", &query).await?;

        let mut cuisines: Vec<String> = Vec::new();
        for row in rows {
            if let Some(tag) = row.cuisine_tag {
                if !tag.is_empty() && !cuisines.contains(&tag) {
                    cuisines.push(tag);
                }
            }
        }
        Ok(cuisines)
    }
}
