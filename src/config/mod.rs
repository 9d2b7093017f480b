//! Configuration and Python-side input deserialization
//!
//! Python callers hand over plain dicts (or objects with matching
//! attributes). The helpers here turn them into client settings and rule
//! builder state.

mod client;

pub use client::*;

use crate::error::SegmentError;
use crate::rule::{Comparator, LeafCondition, LeafId, LeafValue, LogicalOperator};
use pyo3::types::{PyAnyMethods, PyDict, PyDictMethods};
use pyo3::{Bound, PyErr};

/// Helper to get optional attribute from either dict or object
fn get_attr_opt<'py>(obj: &Bound<'py, pyo3::PyAny>, name: &str) -> Option<Bound<'py, pyo3::PyAny>> {
    let value = if let Ok(dict) = obj.downcast::<PyDict>() {
        dict.get_item(name).ok().flatten()
    } else {
        obj.getattr(name).ok()
    };
    value.filter(|v| !v.is_none())
}

/// First present attribute among `names`
fn get_first<'py>(obj: &Bound<'py, pyo3::PyAny>, names: &[&str]) -> Option<Bound<'py, pyo3::PyAny>> {
    names.iter().find_map(|name| get_attr_opt(obj, name))
}

/// Value as the user typed it; numbers are rendered back to text
fn extract_text(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<String> {
    if let Ok(text) = obj.extract::<String>() {
        return Ok(text);
    }
    if let Ok(int) = obj.extract::<i64>() {
        return Ok(int.to_string());
    }
    let float: f64 = obj.extract()?;
    Ok(float.to_string())
}

/// Deserialize client settings from a Python config dict
/// Missing keys take their defaults; both snake_case and camelCase are accepted
pub fn deserialize_client_config(config: &Bound<'_, PyDict>) -> pyo3::PyResult<ClientConfig> {
    let config = config.as_any();
    let defaults = ClientConfig::default();

    let api_url = match get_first(config, &["api_url", "apiUrl"]) {
        Some(v) => v.extract()?,
        None => defaults.api_url,
    };
    let timeout_secs = match get_first(config, &["timeout_secs", "timeoutSecs"]) {
        Some(v) => v.extract()?,
        None => defaults.timeout_secs,
    };
    let client_version = match get_first(config, &["client_version", "clientVersion"]) {
        Some(v) => v.extract()?,
        None => defaults.client_version,
    };
    let count_path = match get_first(config, &["count_path", "countPath"]) {
        Some(v) => v.extract()?,
        None => defaults.count_path,
    };
    let save_path = match get_first(config, &["save_path", "savePath"]) {
        Some(v) => v.extract()?,
        None => defaults.save_path,
    };
    let segments_path = match get_first(config, &["segments_path", "segmentsPath"]) {
        Some(v) => v.extract()?,
        None => defaults.segments_path,
    };

    let client = ClientConfig {
        api_url,
        timeout_secs,
        client_version,
        count_path,
        save_path,
        segments_path,
    };
    client.validate()?;
    Ok(client)
}

/// Extract one leaf condition from a dict such as
/// `{"condition": "visits", "comparator": "lt", "value": "3"}`
///
/// The key may also be given as `field` and the comparator as `operator`.
/// Range conditions take `min`/`max`, a two-item `values` list, or a
/// `"30, 90"` style `value`.
pub fn extract_leaf(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<LeafCondition> {
    let id = match get_attr_opt(obj, "id") {
        Some(v) => v
            .extract::<String>()
            .ok()
            .and_then(|text| text.parse::<LeafId>().ok())
            .unwrap_or_else(LeafId::generate),
        None => LeafId::generate(),
    };

    let condition_key = match get_first(obj, &["condition", "field", "condition_key"]) {
        Some(v) => v.extract()?,
        None => String::new(),
    };

    let comparator = match get_first(obj, &["comparator", "operator"]) {
        Some(v) => {
            let text: String = v.extract()?;
            if text.trim().is_empty() {
                None
            } else {
                Some(
                    text.parse::<Comparator>()
                        .map_err(SegmentError::Deserialization)?,
                )
            }
        }
        None => None,
    };

    let value = if comparator.is_some_and(Comparator::is_range) {
        extract_range(obj, None)?
    } else {
        match get_attr_opt(obj, "value") {
            Some(v) => LeafValue::Scalar(extract_text(&v)?),
            None => LeafValue::default(),
        }
    };

    Ok(LeafCondition {
        id,
        condition_key,
        comparator,
        value,
    })
}

/// Read a range from `min`/`max`, a `values` list, or `"30, 90"` text
///
/// Bounds not present in `obj` keep their value from `current`.
fn extract_range(obj: &Bound<'_, pyo3::PyAny>, current: Option<&LeafValue>) -> pyo3::PyResult<LeafValue> {
    let (mut min, mut max) = match current {
        Some(LeafValue::Range { min, max }) => (min.clone(), max.clone()),
        _ => (String::new(), String::new()),
    };

    if let Some(values) = get_attr_opt(obj, "values") {
        let values: Vec<Bound<'_, pyo3::PyAny>> = values.extract()?;
        if !values.is_empty() {
            let min = extract_text(&values[0])?;
            let max = match values.get(1) {
                Some(v) => extract_text(v)?,
                None => String::new(),
            };
            return Ok(LeafValue::Range { min, max });
        }
    }

    let lower = get_attr_opt(obj, "min");
    let upper = get_attr_opt(obj, "max");
    if lower.is_some() || upper.is_some() {
        if let Some(v) = lower {
            min = extract_text(&v)?;
        }
        if let Some(v) = upper {
            max = extract_text(&v)?;
        }
        return Ok(LeafValue::Range { min, max });
    }

    match get_attr_opt(obj, "value") {
        Some(v) => Ok(LeafValue::range_from_input(&extract_text(&v)?)),
        None => Ok(LeafValue::Range { min, max }),
    }
}

/// Extract leaf conditions from a sequence of dicts
pub fn extract_leaves(items: &[Bound<'_, pyo3::PyAny>]) -> pyo3::PyResult<Vec<LeafCondition>> {
    items.iter().map(extract_leaf).collect()
}

/// Parse "AND"/"OR" tokens, case-insensitive
pub fn parse_operators(tokens: &[String]) -> pyo3::PyResult<Vec<LogicalOperator>> {
    tokens
        .iter()
        .map(|token| {
            token
                .parse::<LogicalOperator>()
                .map_err(|e| PyErr::from(SegmentError::Deserialization(e)))
        })
        .collect()
}

/// Apply the fields present in `update` to an existing leaf
///
/// A new key resets comparator and value before the rest of the update is
/// applied, mirroring a fresh selection in the builder.
pub fn apply_leaf_update(leaf: &mut LeafCondition, update: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<()> {
    if let Some(key) = get_first(update, &["condition", "field", "condition_key"]) {
        leaf.set_condition_key(key.extract::<String>()?);
    }

    if let Some(comparator) = get_first(update, &["comparator", "operator"]) {
        let text: String = comparator.extract()?;
        let comparator = text
            .parse::<Comparator>()
            .map_err(SegmentError::Deserialization)?;
        leaf.set_comparator(comparator);
    }

    if leaf.comparator.is_some_and(Comparator::is_range) {
        leaf.value = extract_range(update, Some(&leaf.value))?;
    } else if let Some(value) = get_attr_opt(update, "value") {
        leaf.value = LeafValue::Scalar(extract_text(&value)?);
    }
    Ok(())
}
