use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::normalize::Normalizer;

/// How the value of a normalized field is converted while a record is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Integers become `value != 0`.
    Flag,
    UnixSeconds,
    UnixMillis,
}

/// Every field that is converted before landing in a record.
pub const COERCIONS: &[(&str, Coercion)] = &[
    ("hq", Coercion::Flag),
    ("is_crafted", Coercion::Flag),
    ("on_mannequin", Coercion::Flag),
    ("has_data", Coercion::Flag),
    ("last_review_time", Coercion::UnixSeconds),
    ("timestamp", Coercion::UnixSeconds),
    ("last_upload_time", Coercion::UnixMillis),
];

pub fn coercion_for(field: &str) -> Option<Coercion> {
    COERCIONS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, coercion)| *coercion)
}

/// A value that was converted to `T`, or the raw JSON when the conversion was not possible.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    Typed(T),
    Raw(Value),
}

pub type Flag = Coerced<bool>;
pub type Timestamp = Coerced<DateTime<Utc>>;

impl<T> Coerced<T> {
    pub fn typed(&self) -> Option<&T> {
        match self {
            Self::Typed(t) => Some(t),
            Self::Raw(_) => None,
        }
    }

    pub fn raw(&self) -> Option<&Value> {
        match self {
            Self::Typed(_) => None,
            Self::Raw(v) => Some(v),
        }
    }
}

impl Coerced<bool> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Typed(true))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Flag(bool),
    Time(DateTime<Utc>),
}

#[derive(Debug, Clone)]
struct Attr {
    raw: Value,
    coerced: Option<Scalar>,
}

fn coerce(field: &str, raw: &Value) -> Option<Scalar> {
    let coercion = coercion_for(field)?;
    match (coercion, raw) {
        (Coercion::Flag, Value::Bool(b)) => Some(Scalar::Flag(*b)),
        (Coercion::Flag, Value::Number(n)) => n
            .as_i64()
            .map(|v| v != 0)
            .or_else(|| n.as_u64().map(|v| v != 0))
            .map(Scalar::Flag),
        (Coercion::UnixSeconds, Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(Scalar::Time),
        (Coercion::UnixMillis, Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(Scalar::Time),
        _ => None,
    }
}

/// The normalized key/value pairs of one JSON object, with the coercion table already applied.
///
/// Records `take_*` the fields they know; whatever is left ends up in their `extra` map.
#[derive(Debug)]
pub(crate) struct Fields {
    attrs: HashMap<String, Attr>,
}

impl Fields {
    pub fn from_object(object: Map<String, Value>, normalizer: &Normalizer) -> Self {
        let attrs = object
            .into_iter()
            .map(|(key, raw)| {
                let key = normalizer.normalize(&key);
                let coerced = coerce(&key, &raw);
                (key, Attr { raw, coerced })
            })
            .collect();

        Self { attrs }
    }

    fn take_with<T>(&mut self, key: &str, convert: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        let value = convert(&self.attrs.get(key)?.raw)?;
        self.attrs.remove(key);
        Some(value)
    }

    pub fn take_flag(&mut self, key: &str) -> Option<Flag> {
        let attr = self.attrs.remove(key)?;
        Some(match attr.coerced {
            Some(Scalar::Flag(b)) => Coerced::Typed(b),
            _ => Coerced::Raw(attr.raw),
        })
    }

    pub fn take_timestamp(&mut self, key: &str) -> Option<Timestamp> {
        let attr = self.attrs.remove(key)?;
        Some(match attr.coerced {
            Some(Scalar::Time(t)) => Coerced::Typed(t),
            _ => Coerced::Raw(attr.raw),
        })
    }

    pub fn take_i64(&mut self, key: &str) -> Option<i64> {
        self.take_with(key, Value::as_i64)
    }

    pub fn take_f64(&mut self, key: &str) -> Option<f64> {
        self.take_with(key, Value::as_f64)
    }

    pub fn take_string(&mut self, key: &str) -> Option<String> {
        self.take_with(key, |v| v.as_str().map(str::to_string))
    }

    /// Identifiers show up both as strings and as numbers depending on the endpoint.
    pub fn take_id(&mut self, key: &str) -> Option<String> {
        self.take_with(key, |v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Takes an array of objects. Elements that are not objects are dropped.
    pub fn take_objects(&mut self, key: &str) -> Option<Vec<Map<String, Value>>> {
        if !self.attrs.get(key)?.raw.is_array() {
            return None;
        }
        let Value::Array(elements) = self.attrs.remove(key)?.raw else {
            return None;
        };

        let total = elements.len();
        let objects: Vec<_> = elements
            .into_iter()
            .filter_map(|element| match element {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();

        if objects.len() != total {
            tracing::warn!(
                field = key,
                dropped = total - objects.len(),
                "Dropping malformed list elements"
            );
        }

        Some(objects)
    }

    /// Takes an object whose values are all integers.
    pub fn take_int_map<T>(&mut self, key: &str, convert: impl Fn(&Value) -> Option<T>) -> Option<BTreeMap<String, T>> {
        self.take_with(key, |v| {
            v.as_object()?
                .iter()
                .map(|(label, count)| Some((label.clone(), convert(count)?)))
                .collect()
        })
    }

    pub fn into_extra(self) -> BTreeMap<String, Value> {
        self.attrs
            .into_iter()
            .map(|(key, attr)| (key, attr.raw))
            .collect()
    }
}
