use serde_json::Value;

use crate::engine::PageHost;
use crate::models::ViewState;

/// Query keys of the persisted camera pose, in write order.
pub const POSE_KEYS: [&str; 5] = ["latitude", "longitude", "zoom", "bearing", "pitch"];

/// Flat, insertion-ordered key/value view state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlState {
    entries: Vec<(String, Value)>,
}

impl UrlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_view_state(pose: &ViewState) -> Self {
        let mut state = Self::new();
        state.insert("latitude", pose.latitude);
        state.insert("longitude", pose.longitude);
        state.insert("zoom", pose.zoom);
        state.insert("bearing", pose.bearing);
        state.insert("pitch", pose.pitch);
        state
    }

    /// Insert or replace `key`, keeping the position of an existing entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Numeric value of `key`, if present and numeric.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean reading of `key`, if present.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|value| match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
            Value::String(s) => !(s.is_empty() || s == "false"),
            Value::Null => false,
            Value::Array(_) | Value::Object(_) => true,
        })
    }

    /// The full pose, when all five pose keys are numeric.
    pub fn view_state(&self) -> Option<ViewState> {
        Some(ViewState::new(
            self.number("longitude")?,
            self.number("latitude")?,
            self.number("zoom")?,
            self.number("bearing")?,
            self.number("pitch")?,
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and writes [`UrlState`] against one page's base URL.
///
/// Owns the page counter that numbers pushed history entries.
#[derive(Debug, Clone)]
pub struct UrlStateCodec {
    base_url: String,
    page_counter: u64,
}

impl UrlStateCodec {
    /// `base_url` is origin plus path, without any query.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            page_counter: 0,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_counter(&self) -> u64 {
        self.page_counter
    }

    /// Parse the query of `url`. Never fails: undecodable keys are skipped,
    /// undecodable or non-JSON values fall back to their raw text.
    pub fn decode(&self, url: &str) -> UrlState {
        let mut state = UrlState::new();
        let url = url.split('#').next().unwrap_or_default();
        let query = match url.split_once('?') {
            Some((_, query)) => query,
            None if url.contains("://") => return state,
            None => url,
        };

        // A key equal to our own base URL plus `?` comes from an earlier
        // double-encoded write; it never carries view state.
        let self_key = format!("{}?", self.base_url);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let spaced_key = raw_key.replace('+', " ");
            let Ok(key) = urlencoding::decode(&spaced_key) else {
                tracing::debug!(key = raw_key, "skipping undecodable url key");
                continue;
            };
            if key.is_empty() || key == self_key {
                continue;
            }
            let spaced = raw_value.replace('+', " ");
            let text = match urlencoding::decode(&spaced) {
                Ok(text) => text.into_owned(),
                Err(_) => spaced,
            };
            let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
            state.insert(key.into_owned(), value);
        }
        state
    }

    /// Full URL for `state`: `<base>?&key=value&key=value...`.
    pub fn to_url(&self, state: &UrlState) -> String {
        let mut url = format!("{}?", self.base_url);
        for (key, value) in state.iter() {
            url.push('&');
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(&format_value(value)));
        }
        url
    }

    /// Write `state` into the page URL as a new history entry (no reload).
    pub fn encode<P: PageHost + ?Sized>(&mut self, state: &UrlState, page: &mut P) -> String {
        self.page_counter += 1;
        let url = self.to_url(state);
        page.push_history(&url, self.page_counter);
        url
    }
}

/// Text form of a value as it appears in the query string.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => n.as_f64().map(format_number).unwrap_or_default(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Format a float the way a browser prints numbers: integral values carry
/// no fractional part.
pub fn format_number(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}
