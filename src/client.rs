use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::items::ItemNames;
use crate::normalize::Normalizer;
use crate::records::{CurrentData, HistoryData};
use crate::{ItemId, ItemQuality, Language, Selector};

pub const BASE_API_URL: &str = "https://universalis.app/api/v2";

/// The API rejects bulk queries with more ids than this.
pub const MAX_BULK_ITEMS: usize = 100;

pub const SINGLE_ITEM_FIELDS: &str = "&fields=itemID%2Clistings.quantity%2Clistings.worldName%2Clistings.pricePerUnit%2Clistings.hq%2Clistings.total%2Clistings.tax%2Clistings.retainerName%2Clistings.creatorName%2Clistings.lastReviewTime%2ClastUploadTime";
pub const MULTI_ITEM_FIELDS: &str = "&fields=items.itemID%2Citems.listings.quantity%2Citems.listings.worldName%2Citems.listings.pricePerUnit%2Citems.listings.hq%2Citems.listings.total%2Citems.listings.tax%2Citems.listings.retainerName%2Citems.listings.creatorName%2Citems.listings.lastReviewTime%2Citems.lastUploadTime";

/// Parameters of a current-data query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentQuery {
    pub selector: Selector,
    pub listings: u32,
    pub entries: u32,
    pub quality: ItemQuality,
    /// Ask the API to only return the fields most callers look at.
    pub trim_fields: bool,
}

impl Default for CurrentQuery {
    fn default() -> Self {
        Self {
            selector: Selector::default(),
            listings: 10,
            entries: 10,
            quality: ItemQuality::NQ,
            trim_fields: false,
        }
    }
}

/// Parameters of a sale-history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub selector: Selector,
    pub entries: u32,
    pub min_price: u64,
    pub max_price: u64,
    /// How far back the stats reach, in milliseconds.
    pub stats_within_ms: u64,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            selector: Selector::default(),
            entries: 10,
            min_price: 0,
            max_price: 2_147_483_647,
            stats_within_ms: 604_800_000,
        }
    }
}

/// Typed access to the marketboard API.
///
/// Every request goes through the shared [`Gateway`], so clients built on the same
/// gateway share its rate limit.
#[derive(Debug)]
pub struct Client {
    gateway: Arc<Gateway>,
    base_url: String,
    normalizer: Normalizer,
    items: ItemNames,
    single_item_fields: String,
    multi_item_fields: String,
}

impl Client {
    pub fn new(gateway: Arc<Gateway>, items: ItemNames) -> Self {
        Self {
            gateway,
            base_url: BASE_API_URL.to_string(),
            normalizer: Normalizer::default(),
            items,
            single_item_fields: SINGLE_ITEM_FIELDS.to_string(),
            multi_item_fields: MULTI_ITEM_FIELDS.to_string(),
        }
    }

    /// Loads the item names from `config.items_path`, failing if the file is missing.
    pub fn from_config(config: &Config, gateway: Arc<Gateway>) -> Result<Self> {
        let items = ItemNames::load(&config.items_path)?;

        let mut client = Self::new(gateway, items).with_base_url(&config.base_url);
        if let Some(fields) = &config.single_item_fields {
            client.single_item_fields = fields.clone();
        }
        if let Some(fields) = &config.multi_item_fields {
            client.multi_item_fields = fields.clone();
        }
        Ok(client)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn set_single_item_fields(&mut self, fields: impl Into<String>) {
        self.single_item_fields = fields.into();
    }

    pub fn set_multi_item_fields(&mut self, fields: impl Into<String>) {
        self.multi_item_fields = fields.into();
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn item_name(&self, item: ItemId, language: Language) -> Option<&str> {
        self.items.get(item, language)
    }

    /// `{base}/{selector}/{ids}?listings=..&entries=..&hq=..`, plus the trim suffix
    /// matching the number of ids.
    pub fn current_url(&self, items: &[ItemId], query: &CurrentQuery) -> String {
        let ids = items
            .iter()
            .map(ItemId::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut url = format!(
            "{}/{}/{}?listings={}&entries={}&hq={}",
            self.base_url,
            query.selector,
            ids,
            query.listings,
            query.entries,
            query.quality.query_value()
        );
        if query.trim_fields {
            url.push_str(if items.len() > 1 {
                &self.multi_item_fields
            } else {
                &self.single_item_fields
            });
        }
        url
    }

    pub fn history_url(&self, item: ItemId, query: &HistoryQuery) -> String {
        format!(
            "{}/history/{}/{}?entriesToReturn={}&statsWithin={}&minSalePrice={}&maxSalePrice={}",
            self.base_url,
            query.selector,
            item,
            query.entries,
            query.stats_within_ms,
            query.min_price,
            query.max_price
        )
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_current(&self, item: ItemId, query: &CurrentQuery) -> Result<CurrentData> {
        let url = self.current_url(&[item], query);
        let body = self.gateway.fetch(&url).await?;
        tracing::debug!(selector = %query.selector, %item, "Loaded current data");

        CurrentData::from_value(body, &self.normalizer)
    }

    /// Current data for many items, [`MAX_BULK_ITEMS`] per request.
    ///
    /// Items the API could not resolve are left out of the result.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn get_bulk_current(&self, items: &[ItemId], query: &CurrentQuery) -> Result<Vec<CurrentData>> {
        let mut results = Vec::with_capacity(items.len());

        for batch in items.chunks(MAX_BULK_ITEMS) {
            let url = self.current_url(batch, query);
            let body = match self.gateway.fetch(&url).await {
                Ok(body) => body,
                // a lone unknown id is a 404 instead of an `unresolvedItems` entry
                Err(Error::Request { status: 404, .. }) if batch.len() == 1 => {
                    tracing::warn!(item = %batch[0], "Item could not be resolved");
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracing::debug!(selector = %query.selector, batch = batch.len(), "Loaded bulk current data");

            self.collect_bulk(body, batch.len(), &mut results)?;
        }

        Ok(results)
    }

    fn collect_bulk(&self, body: Value, batch_len: usize, results: &mut Vec<CurrentData>) -> Result<()> {
        let mut object = match body {
            Value::Object(object) => object,
            other => {
                return Err(Error::UnexpectedShape(format!(
                    "bulk response must be an object, got {other}"
                )))
            }
        };

        // a batch of one id gets the single item response
        let Some(items) = object.remove("items") else {
            if batch_len != 1 {
                return Err(Error::UnexpectedShape(format!(
                    "bulk response for {batch_len} items has no `items`"
                )));
            }
            results.push(CurrentData::from_value(Value::Object(object), &self.normalizer)?);
            return Ok(());
        };

        let items = match items {
            Value::Object(items) => items,
            other => {
                return Err(Error::UnexpectedShape(format!(
                    "bulk `items` must be an object, got {other}"
                )))
            }
        };

        if let Some(unresolved) = object.get("unresolvedItems").and_then(Value::as_array) {
            if !unresolved.is_empty() {
                tracing::warn!(?unresolved, "Items could not be resolved");
            }
        }

        for (key, value) in items {
            if !value.is_object() {
                tracing::warn!(item = %key, "Dropping malformed bulk entry");
                continue;
            }
            results.push(CurrentData::from_value(value, &self.normalizer)?);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_history(&self, item: ItemId, query: &HistoryQuery) -> Result<HistoryData> {
        let url = self.history_url(item, query);
        let body = self.gateway.fetch(&url).await?;
        tracing::debug!(selector = %query.selector, %item, "Loaded history data");

        HistoryData::from_value(body, &self.normalizer)
    }
}
