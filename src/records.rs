use std::cmp::Ordering;
use std::collections::BTreeMap;

mod coerce;
mod current;
mod entries;
mod history;

pub use coerce::{coercion_for, Coerced, Coercion, Flag, Timestamp, COERCIONS};
pub use current::CurrentData;
pub use entries::{HistoryEntry, ListingEntry, Materia};
pub use history::HistoryData;

pub(crate) use coerce::Fields;

/// A statistic reported for all listings, NQ only and HQ only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualitySplit<T> {
    pub all: Option<T>,
    pub nq: Option<T>,
    pub hq: Option<T>,
}

impl<T> QualitySplit<T> {
    /// Takes `key`, `key_nq` and `key_hq`.
    pub(crate) fn take(fields: &mut Fields, key: &str, take: impl Fn(&mut Fields, &str) -> Option<T>) -> Self {
        Self {
            all: take(fields, key),
            nq: take(fields, &format!("{key}_nq")),
            hq: take(fields, &format!("{key}_hq")),
        }
    }

    pub fn get(&self, quality: crate::ItemQuality) -> Option<&T> {
        match quality {
            crate::ItemQuality::NQ => self.nq.as_ref(),
            crate::ItemQuality::HQ => self.hq.as_ref(),
        }
    }
}

/// Stack size label to the number of sales seen with that stack size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackHistogram(pub BTreeMap<String, u64>);

impl StackHistogram {
    pub(crate) fn take(fields: &mut Fields, key: &str) -> Option<Self> {
        fields.take_int_map(key, serde_json::Value::as_u64).map(Self)
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.0.get(label).copied()
    }

    /// The label with the most sales. Ties go to the smallest label.
    pub fn most_common(&self) -> Option<(&str, u64)> {
        self.0
            .iter()
            .fold(None, |best: Option<(&str, u64)>, (label, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((label.as_str(), *count)),
            })
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

/// Orders by timestamp, placing values that are not timestamps after every real timestamp.
pub(crate) fn by_effective_time(a: Option<&Timestamp>, b: Option<&Timestamp>) -> Ordering {
    match (a.and_then(Coerced::typed), b.and_then(Coerced::typed)) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Strictly earlier, only defined when both sides are timestamps.
pub(crate) fn strictly_earlier(a: Option<&Timestamp>, b: Option<&Timestamp>) -> bool {
    match (a.and_then(Coerced::typed), b.and_then(Coerced::typed)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(pairs: &[(&str, u64)]) -> StackHistogram {
        StackHistogram(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn most_common_stack_size() {
        let h = histogram(&[("1", 4), ("99", 10), ("20", 10), ("5", 2)]);
        assert_eq!(h.most_common(), Some(("20", 10)));
        assert_eq!(h.total(), 26);
        assert_eq!(StackHistogram::default().most_common(), None);
    }

    #[test]
    fn raw_times_sort_last() {
        let t = |secs| Some(Coerced::Typed(chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0).unwrap()));
        let raw = Some(Coerced::Raw(serde_json::json!("bad")));

        assert_eq!(by_effective_time(t(1).as_ref(), t(2).as_ref()), Ordering::Less);
        assert_eq!(by_effective_time(raw.as_ref(), t(2).as_ref()), Ordering::Greater);
        assert_eq!(by_effective_time(None, raw.as_ref()), Ordering::Equal);
        assert!(!strictly_earlier(raw.as_ref(), t(2).as_ref()));
        assert!(!strictly_earlier(t(2).as_ref(), t(2).as_ref()));
        assert!(strictly_earlier(t(1).as_ref(), t(2).as_ref()));
    }
}
