use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{by_effective_time, Fields, Flag, HistoryEntry, ListingEntry, QualitySplit, StackHistogram, Timestamp};
use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use crate::World;

/// The current marketboard state of one item.
///
/// `listings` and `recent_history` are sorted by time, oldest first, when the record is built.
/// Datacenter queries additionally fill `dc_name` and the world fields of every entry.
#[derive(Debug, Clone)]
pub struct CurrentData {
    pub item_id: Option<i64>,
    pub world_id: Option<i64>,
    pub world_name: Option<String>,
    pub dc_name: Option<String>,
    pub last_upload_time: Option<Timestamp>,
    listings: Vec<ListingEntry>,
    recent_history: Vec<HistoryEntry>,
    pub current_average_price: QualitySplit<f64>,
    pub average_price: QualitySplit<f64>,
    pub min_price: QualitySplit<i64>,
    pub max_price: QualitySplit<i64>,
    pub sale_velocity: QualitySplit<f64>,
    pub stack_size_histogram: QualitySplit<StackHistogram>,
    /// World id to the unix milliseconds of its last upload.
    pub world_upload_times: Option<BTreeMap<String, i64>>,
    pub listings_count: Option<i64>,
    pub recent_history_count: Option<i64>,
    pub units_for_sale: Option<i64>,
    pub units_sold: Option<i64>,
    pub has_data: Option<Flag>,
    pub extra: BTreeMap<String, Value>,
}

impl CurrentData {
    pub fn from_value(value: Value, normalizer: &Normalizer) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(Error::UnexpectedShape(format!(
                    "current data must be an object, got {other}"
                )))
            }
        };
        let mut fields = Fields::from_object(object, normalizer);

        let mut listings: Vec<_> = fields
            .take_objects("listings")
            .unwrap_or_default()
            .into_iter()
            .map(|object| ListingEntry::from_object(object, normalizer))
            .collect();
        listings.sort_by(|a, b| by_effective_time(a.last_review_time.as_ref(), b.last_review_time.as_ref()));

        let mut recent_history: Vec<_> = fields
            .take_objects("recent_history")
            .unwrap_or_default()
            .into_iter()
            .map(|object| HistoryEntry::from_object(object, normalizer))
            .collect();
        recent_history.sort_by(|a, b| by_effective_time(a.timestamp.as_ref(), b.timestamp.as_ref()));

        let sale_velocity = QualitySplit {
            all: fields.take_f64("regular_sale_velocity"),
            nq: fields.take_f64("nq_sale_velocity"),
            hq: fields.take_f64("hq_sale_velocity"),
        };

        Ok(Self {
            item_id: fields.take_i64("item_id"),
            world_id: fields.take_i64("world_id"),
            world_name: fields.take_string("world_name"),
            dc_name: fields.take_string("dc_name"),
            last_upload_time: fields.take_timestamp("last_upload_time"),
            listings,
            recent_history,
            current_average_price: QualitySplit::take(&mut fields, "current_average_price", Fields::take_f64),
            average_price: QualitySplit::take(&mut fields, "average_price", Fields::take_f64),
            min_price: QualitySplit::take(&mut fields, "min_price", Fields::take_i64),
            max_price: QualitySplit::take(&mut fields, "max_price", Fields::take_i64),
            sale_velocity,
            stack_size_histogram: QualitySplit::take(&mut fields, "stack_size_histogram", StackHistogram::take),
            world_upload_times: fields.take_int_map("world_upload_times", Value::as_i64),
            listings_count: fields.take_i64("listings_count"),
            recent_history_count: fields.take_i64("recent_history_count"),
            units_for_sale: fields.take_i64("units_for_sale"),
            units_sold: fields.take_i64("units_sold"),
            has_data: fields.take_flag("has_data"),
            extra: fields.into_extra(),
        })
    }

    /// Current listings, oldest review first.
    pub fn listings(&self) -> &[ListingEntry] {
        &self.listings
    }

    /// Recent sales, oldest first.
    pub fn recent_history(&self) -> &[HistoryEntry] {
        &self.recent_history
    }

    pub fn has_data(&self) -> bool {
        self.has_data.as_ref().is_some_and(Flag::is_set)
    }

    /// Listings ordered by unit price, cheapest first unless `reverse`.
    ///
    /// With a `world` only listings carrying that world's name are kept, which means a
    /// world query (whose listings have no world name) yields nothing.
    pub fn sort_listings(&self, world: Option<World>, reverse: bool) -> Vec<&ListingEntry> {
        let mut sorted: Vec<_> = self
            .listings
            .iter()
            .filter(|entry| match world {
                Some(world) => entry.world_name.as_deref() == Some(world.name()),
                None => true,
            })
            .collect();

        sorted.sort_by_key(|entry| entry.price_per_unit.unwrap_or(i64::MAX));
        if reverse {
            sorted.reverse();
        }
        sorted
    }

    pub fn world_upload_time(&self, world_id: i64) -> Option<DateTime<Utc>> {
        let millis = *self.world_upload_times.as_ref()?.get(&world_id.to_string())?;
        DateTime::<Utc>::from_timestamp_millis(millis)
    }

    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
