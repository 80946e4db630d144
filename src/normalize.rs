//! Maps the camelCase keys used by the marketboard API onto snake_case field names.

/// Substrings replaced before the generic case folding, in table order.
pub const PRE_FORMATTED_KEYS: &[(&str, &str)] = &[("HQ", "_hq"), ("ID", "_id"), ("NQ", "_nq")];

/// Keys that are returned untouched.
pub const IGNORED_KEYS: &[&str] = &[];

#[derive(Debug, Clone)]
pub struct Normalizer {
    ignored: Vec<String>,
    pre_formatted: Vec<(String, String)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            ignored: IGNORED_KEYS.iter().map(|k| k.to_string()).collect(),
            pre_formatted: PRE_FORMATTED_KEYS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Normalizer {
    pub fn new(
        ignored: impl IntoIterator<Item = String>,
        pre_formatted: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            ignored: ignored.into_iter().collect(),
            pre_formatted: pre_formatted.into_iter().collect(),
        }
    }

    /// Resolve a raw key to its canonical name.
    ///
    /// Every uppercase letter left after the substitutions gets its own underscore,
    /// so `"ABC"` becomes `"a_b_c"`. The API's keys rely on this.
    pub fn normalize(&self, key: &str) -> String {
        if self.ignored.iter().any(|ignored| ignored == key) {
            return key.to_string();
        }

        let mut key = key.to_string();
        for (pattern, replacement) in &self.pre_formatted {
            if key.contains(pattern.as_str()) {
                key = key.replace(pattern.as_str(), replacement);
            }
        }

        let mut chars = key.chars();
        let mut result = String::with_capacity(key.len() + 4);
        if let Some(first) = chars.next() {
            result.extend(first.to_lowercase());
        }
        for c in chars {
            if c.is_uppercase() {
                result.push('_');
                result.extend(c.to_lowercase());
            } else {
                result.push(c);
            }
        }

        result
    }
}
