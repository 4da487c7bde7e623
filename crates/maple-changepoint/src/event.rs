//! Event records, field selectors and output appending.
//!
//! An `Event` is an insertion-ordered JSON object. A `FieldSelector` names one
//! field inside it using `::`-separated segments:
//!
//! ```text
//!   "s0::temperature"        → event["temperature"]
//!   "s0::sensor::reading"    → event["sensor"]["reading"]
//!   "temperature"            → event["temperature"]
//! ```
//!
//! A leading stream prefix (`s0`, `s1`, ...) is dropped when more segments follow.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cusum::CusumOutput;
use crate::error::{ChangePointError, ChangePointResult};

// ── Field Selector ──────────────────────────────────────────────────────

/// Parsed path to a field inside an event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldSelector {
    raw: String,
    path: Vec<String>,
}

impl FieldSelector {
    /// Parse a `::`-separated selector.
    pub fn parse(selector: &str) -> ChangePointResult<Self> {
        let segments: Vec<&str> = selector.split("::").collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(ChangePointError::InvalidSelector(selector.to_string()));
        }

        let skip = usize::from(segments.len() > 1 && is_stream_prefix(segments[0]));
        Ok(Self {
            raw: selector.to_string(),
            path: segments[skip..].iter().map(|s| s.to_string()).collect(),
        })
    }

    /// The selector as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Path segments after the stream prefix.
    pub fn path(&self) -> &[String] {
        &self.path
    }
}

impl std::fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn is_stream_prefix(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('s')
        && segment[1..].bytes().all(|b| b.is_ascii_digit())
}

// ── Event ───────────────────────────────────────────────────────────────

/// One input or output record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Resolve a selector to the value it names.
    pub fn get(&self, selector: &FieldSelector) -> Option<&Value> {
        let (first, rest) = selector.path().split_first()?;
        rest.iter()
            .try_fold(self.0.get(first)?, |value, segment| value.as_object()?.get(segment))
    }

    /// Extract the selected field as a finite real number.
    pub fn number(&self, selector: &FieldSelector) -> ChangePointResult<f64> {
        let value = self.get(selector).ok_or_else(|| ChangePointError::FieldNotFound {
            selector: selector.to_string(),
        })?;

        match value {
            Value::Number(n) => n.as_f64().ok_or_else(|| ChangePointError::FieldNotNumeric {
                selector: selector.to_string(),
                found: format!("number {}", n),
            }),
            other => Err(ChangePointError::FieldNotNumeric {
                selector: selector.to_string(),
                found: value_kind(other).to_string(),
            }),
        }
    }

    /// Copy of this event with the four output fields appended in order.
    ///
    /// Input fields that collide with an output name are dropped, so the
    /// outputs always trail the record.
    pub fn with_output(&self, output: &CusumOutput) -> Self {
        let mut fields: Map<String, Value> = self
            .0
            .iter()
            .filter(|(key, _)| !CusumOutput::FIELD_NAMES.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let [low, high, flag_low, flag_high] = CusumOutput::FIELD_NAMES;
        fields.insert(low.into(), Value::from(output.cum_sum_low));
        fields.insert(high.into(), Value::from(output.cum_sum_high));
        fields.insert(flag_low.into(), Value::Bool(output.change_detected_low));
        fields.insert(flag_high.into(), Value::Bool(output.change_detected_high));
        Self(fields)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        Value::Object(event.0)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> Event {
        Event::from_value(value).unwrap()
    }

    fn selector(s: &str) -> FieldSelector {
        FieldSelector::parse(s).unwrap()
    }

    #[test]
    fn selector_drops_stream_prefix() {
        assert_eq!(selector("s0::temperature").path(), ["temperature"]);
        assert_eq!(selector("s12::a::b").path(), ["a", "b"]);
        assert_eq!(selector("temperature").path(), ["temperature"]);
        // A lone segment is a field name even if it looks like a prefix.
        assert_eq!(selector("s0").path(), ["s0"]);
        assert_eq!(selector("sensor::value").path(), ["sensor", "value"]);
    }

    #[test]
    fn selector_rejects_empty_segments() {
        for bad in ["", "s0::", "::value", "a::::b", "  "] {
            assert!(
                matches!(FieldSelector::parse(bad), Err(ChangePointError::InvalidSelector(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn number_from_flat_and_nested_fields() {
        let e = event(json!({"temperature": 21.5, "sensor": {"reading": 7}}));
        assert_eq!(e.number(&selector("s0::temperature")).unwrap(), 21.5);
        assert_eq!(e.number(&selector("s0::sensor::reading")).unwrap(), 7.0);
    }

    #[test]
    fn every_json_number_extracts_as_f64() {
        let e = event(json!({"big": u64::MAX, "negative": i64::MIN, "tiny": 1e-300}));
        assert_eq!(e.number(&selector("big")).unwrap(), u64::MAX as f64);
        assert_eq!(e.number(&selector("negative")).unwrap(), i64::MIN as f64);
        assert_eq!(e.number(&selector("tiny")).unwrap(), 1e-300);
    }

    #[test]
    fn missing_field_reported() {
        let e = event(json!({"temperature": 21.5}));
        let err = e.number(&selector("s0::pressure")).unwrap_err();
        assert!(matches!(err, ChangePointError::FieldNotFound { .. }));

        let err = e.number(&selector("s0::temperature::inner")).unwrap_err();
        assert!(matches!(err, ChangePointError::FieldNotFound { .. }));
    }

    #[test]
    fn non_numeric_field_reported_with_kind() {
        let e = event(json!({"label": "hot", "flag": true, "nothing": null}));
        for (field, kind) in [("label", "string"), ("flag", "boolean"), ("nothing", "null")] {
            match e.number(&selector(field)).unwrap_err() {
                ChangePointError::FieldNotNumeric { found, .. } => assert_eq!(found, kind),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn output_fields_appended_in_order() {
        let e = event(json!({"timestamp": 1, "temperature": 21.5}));
        let out = e.with_output(&CusumOutput {
            cum_sum_low: -0.5,
            cum_sum_high: 2.0,
            change_detected_low: false,
            change_detected_high: true,
        });

        let keys: Vec<&str> = out.fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "timestamp",
                "temperature",
                "cumSumLow",
                "cumSumHigh",
                "changeDetectedLow",
                "changeDetectionHigh"
            ]
        );
        assert_eq!(out.fields()["cumSumLow"], json!(-0.5));
        assert_eq!(out.fields()["changeDetectionHigh"], json!(true));
        // Input untouched.
        assert_eq!(e.fields().len(), 2);
    }

    #[test]
    fn colliding_output_fields_move_to_the_end() {
        let e = event(json!({"cumSumHigh": 99.0, "temperature": 21.5}));
        let out = e.with_output(&CusumOutput::default());
        let keys: Vec<&str> = out.fields().keys().map(String::as_str).collect();
        assert_eq!(keys[0], "temperature");
        assert_eq!(&keys[1..], CusumOutput::FIELD_NAMES);
        assert_eq!(out.fields()["cumSumHigh"], json!(0.0));
    }

    #[test]
    fn event_serializes_transparently() {
        let e = event(json!({"a": 1}));
        assert_eq!(serde_json::to_string(&e).unwrap(), r#"{"a":1}"#);
        assert!(Event::from_value(json!([1, 2])).is_none());
    }
}
