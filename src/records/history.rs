use std::collections::BTreeMap;

use serde_json::Value;

use super::{by_effective_time, Fields, HistoryEntry, QualitySplit, StackHistogram, Timestamp};
use crate::error::{Error, Result};
use crate::normalize::Normalizer;

/// Sale history of one item within the requested stats window.
#[derive(Debug, Clone)]
pub struct HistoryData {
    pub item_id: Option<i64>,
    pub world_id: Option<i64>,
    pub world_name: Option<String>,
    pub dc_name: Option<String>,
    pub last_upload_time: Option<Timestamp>,
    entries: Vec<HistoryEntry>,
    pub stack_size_histogram: QualitySplit<StackHistogram>,
    pub sale_velocity: QualitySplit<f64>,
    pub extra: BTreeMap<String, Value>,
}

impl HistoryData {
    pub fn from_value(value: Value, normalizer: &Normalizer) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(Error::UnexpectedShape(format!(
                    "history data must be an object, got {other}"
                )))
            }
        };
        let mut fields = Fields::from_object(object, normalizer);

        let mut entries: Vec<_> = fields
            .take_objects("entries")
            .unwrap_or_default()
            .into_iter()
            .map(|object| HistoryEntry::from_object(object, normalizer))
            .collect();
        entries.sort_by(|a, b| by_effective_time(a.timestamp.as_ref(), b.timestamp.as_ref()));

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
            entries,
            stack_size_histogram: QualitySplit::take(&mut fields, "stack_size_histogram", StackHistogram::take),
            sale_velocity,
            extra: fields.into_extra(),
        })
    }

    /// Sales, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
