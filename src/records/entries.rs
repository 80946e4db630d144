use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{strictly_earlier, Fields, Flag, Timestamp};
use crate::normalize::Normalizer;

/// A materia melded into a listed item.
#[derive(Debug, Clone, PartialEq)]
pub struct Materia {
    pub slot_id: Option<i64>,
    pub materia_id: Option<i64>,
}

/// One current sell order on the marketboard.
///
/// `world_id` and `world_name` are only present when the listing came from a
/// datacenter query.
#[derive(Debug, Clone)]
pub struct ListingEntry {
    pub listing_id: Option<String>,
    pub price_per_unit: Option<i64>,
    pub quantity: Option<i64>,
    pub total: Option<i64>,
    pub tax: Option<i64>,
    pub hq: Option<Flag>,
    pub is_crafted: Option<Flag>,
    pub on_mannequin: Option<Flag>,
    pub stain_id: Option<i64>,
    pub materia: Vec<Materia>,
    pub retainer_id: Option<String>,
    pub retainer_name: Option<String>,
    pub retainer_city: Option<i64>,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
    pub seller_id: Option<String>,
    pub last_review_time: Option<Timestamp>,
    pub world_id: Option<i64>,
    pub world_name: Option<String>,
    pub extra: BTreeMap<String, Value>,
}

impl ListingEntry {
    pub fn from_object(object: Map<String, Value>, normalizer: &Normalizer) -> Self {
        let mut fields = Fields::from_object(object, normalizer);

        let materia = fields
            .take_objects("materia")
            .unwrap_or_default()
            .into_iter()
            .map(|object| {
                let mut fields = Fields::from_object(object, normalizer);
                Materia {
                    slot_id: fields.take_i64("slot_id"),
                    materia_id: fields.take_i64("materia_id"),
                }
            })
            .collect();

        Self {
            listing_id: fields.take_id("listing_id"),
            price_per_unit: fields.take_i64("price_per_unit"),
            quantity: fields.take_i64("quantity"),
            total: fields.take_i64("total"),
            tax: fields.take_i64("tax"),
            hq: fields.take_flag("hq"),
            is_crafted: fields.take_flag("is_crafted"),
            on_mannequin: fields.take_flag("on_mannequin"),
            stain_id: fields.take_i64("stain_id"),
            materia,
            retainer_id: fields.take_id("retainer_id"),
            retainer_name: fields.take_string("retainer_name"),
            retainer_city: fields.take_i64("retainer_city"),
            creator_id: fields.take_id("creator_id"),
            creator_name: fields.take_string("creator_name"),
            seller_id: fields.take_id("seller_id"),
            last_review_time: fields.take_timestamp("last_review_time"),
            world_id: fields.take_i64("world_id"),
            world_name: fields.take_string("world_name"),
            extra: fields.into_extra(),
        }
    }

    pub fn is_hq(&self) -> bool {
        self.hq.as_ref().is_some_and(Flag::is_set)
    }

    /// Same quality and reviewed strictly before `other`.
    pub fn precedes(&self, other: &Self) -> bool {
        self.hq == other.hq
            && strictly_earlier(self.last_review_time.as_ref(), other.last_review_time.as_ref())
    }

    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

/// Listings compare equal when their quality matches.
impl PartialEq for ListingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.hq == other.hq
    }
}

/// One completed sale.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub hq: Option<Flag>,
    pub price_per_unit: Option<i64>,
    pub quantity: Option<i64>,
    pub buyer_name: Option<String>,
    pub on_mannequin: Option<Flag>,
    pub timestamp: Option<Timestamp>,
    pub world_id: Option<i64>,
    pub world_name: Option<String>,
    pub extra: BTreeMap<String, Value>,
}

impl HistoryEntry {
    pub fn from_object(object: Map<String, Value>, normalizer: &Normalizer) -> Self {
        let mut fields = Fields::from_object(object, normalizer);

        Self {
            hq: fields.take_flag("hq"),
            price_per_unit: fields.take_i64("price_per_unit"),
            quantity: fields.take_i64("quantity"),
            buyer_name: fields.take_string("buyer_name"),
            on_mannequin: fields.take_flag("on_mannequin"),
            timestamp: fields.take_timestamp("timestamp"),
            world_id: fields.take_i64("world_id"),
            world_name: fields.take_string("world_name"),
            extra: fields.into_extra(),
        }
    }

    pub fn is_hq(&self) -> bool {
        self.hq.as_ref().is_some_and(Flag::is_set)
    }

    /// Same quality and sold strictly before `other`.
    pub fn precedes(&self, other: &Self) -> bool {
        self.hq == other.hq && strictly_earlier(self.timestamp.as_ref(), other.timestamp.as_ref())
    }

    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

/// Sales compare equal when quality and unit price match.
impl PartialEq for HistoryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.hq == other.hq && self.price_per_unit == other.price_per_unit
    }
}
