//! Segment Rules Core - Customer segmentation rule engine
//!
//! This crate turns rule-builder conditions into the expression tree consumed
//! by the audience-evaluation backend, renders matching summaries, and talks
//! to the backend for previews, saves and saved-segment listings. Python
//! bindings via PyO3.

use pyo3::prelude::*;

pub mod audience;
pub mod config;
pub mod error;
pub mod registry;
pub mod rule;

use crate::audience::{AudienceClient, PreviewHandle, SegmentHandle, SegmentSavePayload};
use crate::registry::ConditionDefinition;
use crate::rule::{DraftSession, RuleDraft};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use pyo3::types::{PyDict, PyList};
use std::sync::Arc;

// ============================================================================
// Cached Configuration
// ============================================================================

/// Global cached audience client
static CACHED_CLIENT: OnceCell<Arc<RwLock<AudienceClient>>> = OnceCell::new();

// ============================================================================
// Helper Functions
// ============================================================================

/// Clone the cached client out of its lock
fn cached_client() -> PyResult<AudienceClient> {
    let client = CACHED_CLIENT.get().ok_or_else(|| {
        PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(
            "Config not initialized. Call init_config() first.",
        )
    })?;
    Ok(client.read().clone())
}

fn definition_to_dict<'py>(py: Python<'py>, definition: &ConditionDefinition) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("key", definition.key)?;
    dict.set_item("label", definition.label)?;
    dict.set_item("type", definition.value_type.as_str())?;
    dict.set_item("unit", definition.unit)?;
    dict.set_item("description", definition.description)?;
    Ok(dict)
}

/// Rebuild a draft from Python condition dicts and operator tokens
fn draft_from_py(conditions: &[Bound<'_, PyAny>], operators: &[String]) -> PyResult<RuleDraft> {
    let leaves = config::extract_leaves(conditions)?;
    let operators = config::parse_operators(operators)?;
    Ok(RuleDraft::from_parts(leaves, operators)?)
}

// ============================================================================
// Python Functions
// ============================================================================

/// Initialize the backend client (call once at startup)
///
/// # Arguments
/// * `config` - Optional dict with `api_url`, `timeout_secs`, `client_version`,
///   `count_path`, `save_path` and `segments_path`; missing keys take their defaults
#[pyfunction]
#[pyo3(signature = (config=None))]
fn init_config(config: Option<&Bound<'_, PyDict>>) -> PyResult<()> {
    let client_config = match config {
        Some(dict) => config::deserialize_client_config(dict)?,
        None => config::ClientConfig::default(),
    };
    let client = AudienceClient::new(client_config)?;
    log::debug!("Audience client configured for {}", client.config().api_url);

    // If already initialized, replace the client
    if let Some(existing) = CACHED_CLIENT.get() {
        let mut guard = existing.write();
        *guard = client;
    } else {
        let _ = CACHED_CLIENT.set(Arc::new(RwLock::new(client)));
    }

    Ok(())
}

/// Check if config is initialized
#[pyfunction]
fn is_config_initialized() -> bool {
    CACHED_CLIENT.get().is_some()
}

/// All selectable conditions in display order
#[pyfunction]
fn list_conditions(py: Python<'_>) -> PyResult<Py<PyAny>> {
    let list = PyList::empty(py);
    for definition in registry::conditions() {
        list.append(definition_to_dict(py, definition)?)?;
    }
    Ok(list.into_any().unbind())
}

/// Definition for `key` (legacy aliases included), or None
#[pyfunction]
fn lookup_condition(py: Python<'_>, key: &str) -> PyResult<Py<PyAny>> {
    match registry::lookup(key) {
        Some(definition) => Ok(definition_to_dict(py, definition)?.into_any().unbind()),
        None => Ok(py.None()),
    }
}

/// Assemble conditions joined by operators into the wire JSON tree
///
/// # Raises
/// ValueError for an empty list, a wrong operator count, or an incomplete condition
#[pyfunction]
fn assemble_rules(conditions: Vec<Bound<'_, PyAny>>, operators: Vec<String>) -> PyResult<String> {
    let leaves = config::extract_leaves(&conditions)?;
    let operators = config::parse_operators(&operators)?;
    let tree = rule::assemble(&leaves, &operators)?;
    Ok(serde_json::to_string(&tree).map_err(error::SegmentError::from)?)
}

/// Human-readable summary; never fails on incomplete conditions
#[pyfunction]
#[pyo3(signature = (conditions, operators=None))]
fn render_summary(conditions: Vec<Bound<'_, PyAny>>, operators: Option<Vec<String>>) -> PyResult<String> {
    let leaves = config::extract_leaves(&conditions)?;
    let operators = config::parse_operators(&operators.unwrap_or_default())?;
    Ok(rule::render(&leaves, &operators))
}

/// Summary of a stored wire JSON tree, read left to right
///
/// # Raises
/// ValueError when the JSON is not a valid rule tree
#[pyfunction]
fn render_rules_json(rules_json: &str) -> PyResult<String> {
    let tree = rule::ExpressionNode::from_json(rules_json)?;
    Ok(rule::render_tree(&tree))
}

/// Preview the audience matching the conditions
///
/// The tree is assembled before any request is made, so rule errors raise
/// immediately rather than from the awaitable.
///
/// # Returns
/// A Python awaitable that resolves to an AudiencePreview
///
/// # Raises
/// RuntimeError if `init_config` was not called first
#[pyfunction]
fn preview_segment_async<'py>(
    py: Python<'py>,
    conditions: Vec<Bound<'py, PyAny>>,
    operators: Vec<String>,
) -> PyResult<Bound<'py, PyAny>> {
    let client = cached_client()?;
    let tree = draft_from_py(&conditions, &operators)?.assemble()?;

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let preview = client.count(&tree).await?;
        Ok(PreviewHandle::new(preview))
    })
}

/// Save a previewed segment
///
/// # Returns
/// A Python awaitable that resolves to the saved segment id, or None when the
/// backend does not echo one
#[pyfunction]
#[pyo3(signature = (name, conditions, operators, preview, created_by=String::new()))]
fn save_segment_async<'py>(
    py: Python<'py>,
    name: &str,
    conditions: Vec<Bound<'py, PyAny>>,
    operators: Vec<String>,
    preview: PyRef<'py, PreviewHandle>,
    created_by: String,
) -> PyResult<Bound<'py, PyAny>> {
    let client = cached_client()?;
    let draft = draft_from_py(&conditions, &operators)?;
    let payload = SegmentSavePayload::from_draft(name, &draft, preview.preview(), &created_by)?;

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let saved = client.save(&payload).await?;
        Ok(saved.id)
    })
}

/// List the segments saved by `created_by`
///
/// # Returns
/// A Python awaitable that resolves to a list of SavedSegment objects; each
/// one's `summary` falls back to rendering its rules when no condition string
/// was stored
#[pyfunction]
fn list_segments_async<'py>(py: Python<'py>, created_by: String) -> PyResult<Bound<'py, PyAny>> {
    let client = cached_client()?;

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let segments = client.list_segments(&created_by).await?;
        Ok(segments.into_iter().map(SegmentHandle::new).collect::<Vec<_>>())
    })
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn segment_rules_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_config, m)?)?;
    m.add_function(wrap_pyfunction!(is_config_initialized, m)?)?;
    m.add_function(wrap_pyfunction!(list_conditions, m)?)?;
    m.add_function(wrap_pyfunction!(lookup_condition, m)?)?;
    m.add_function(wrap_pyfunction!(assemble_rules, m)?)?;
    m.add_function(wrap_pyfunction!(render_summary, m)?)?;
    m.add_function(wrap_pyfunction!(render_rules_json, m)?)?;
    m.add_function(wrap_pyfunction!(preview_segment_async, m)?)?;
    m.add_function(wrap_pyfunction!(save_segment_async, m)?)?;
    m.add_function(wrap_pyfunction!(list_segments_async, m)?)?;
    m.add_class::<DraftSession>()?;
    m.add_class::<PreviewHandle>()?;
    m.add_class::<SegmentHandle>()?;
    Ok(())
}
