//! RuleDraft - Stateful rule builder for the Python-Rust boundary
//!
//! Python holds a handle to a draft living in Rust memory and edits it in
//! place; assembly and summaries are computed on demand from the current
//! state.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::config::{apply_leaf_update, extract_leaf};
use crate::error::SegmentError;

use super::{LeafCondition, LeafId, LeafValue, LogicalOperator, RuleDraft};

// ============================================================================
// DraftSession PyClass
// ============================================================================

/// Editable rule state exposed to Python as `RuleDraft`
#[pyclass(name = "RuleDraft")]
#[derive(Debug, Default)]
pub struct DraftSession {
    draft: RuleDraft,
}

impl DraftSession {
    pub fn from_draft(draft: RuleDraft) -> Self {
        Self { draft }
    }

    pub fn draft(&self) -> &RuleDraft {
        &self.draft
    }

    fn parse_id(id: &str) -> PyResult<LeafId> {
        Ok(id.parse::<LeafId>()?)
    }

    fn parse_operator(token: &str) -> PyResult<LogicalOperator> {
        token
            .parse::<LogicalOperator>()
            .map_err(|e| PyErr::from(SegmentError::Deserialization(e)))
    }
}

#[pymethods]
impl DraftSession {
    #[new]
    fn py_new() -> Self {
        Self::default()
    }

    /// Append a condition dict and return its id
    ///
    /// `operator` joins it to the previous condition and defaults to AND.
    #[pyo3(signature = (condition=None, operator=None))]
    fn add_condition(&mut self, condition: Option<&Bound<'_, PyAny>>, operator: Option<&str>) -> PyResult<String> {
        let leaf = match condition {
            Some(condition) => extract_leaf(condition)?,
            None => LeafCondition::default(),
        };
        let operator = match operator {
            Some(token) => Self::parse_operator(token)?,
            None => LogicalOperator::default(),
        };
        Ok(self.draft.push_with(operator, leaf).to_string())
    }

    /// Remove a condition by id; returns false when the id is unknown or malformed
    fn remove_condition(&mut self, id: &str) -> bool {
        match id.parse::<LeafId>() {
            Ok(id) => self.draft.remove(id).is_some(),
            Err(_) => false,
        }
    }

    /// Move the condition at `from_index` to `to_index`
    fn move_condition(&mut self, from_index: usize, to_index: usize) -> PyResult<()> {
        Ok(self.draft.move_leaf(from_index, to_index)?)
    }

    /// Apply the fields present in `update` to the condition `id`
    fn update_condition(&mut self, id: &str, update: &Bound<'_, PyAny>) -> PyResult<()> {
        let leaf_id = Self::parse_id(id)?;
        let leaf = self
            .draft
            .leaf_mut(leaf_id)
            .ok_or_else(|| SegmentError::InvalidEdit(format!("Unknown condition id: {}", id)))?;
        apply_leaf_update(leaf, update)
    }

    fn set_operator(&mut self, index: usize, operator: &str) -> PyResult<()> {
        let operator = Self::parse_operator(operator)?;
        Ok(self.draft.set_operator(index, operator)?)
    }

    /// Flip AND/OR at `index` and return the new token
    fn toggle_operator(&mut self, index: usize) -> PyResult<&'static str> {
        Ok(self.draft.toggle_operator(index)?.as_str())
    }

    fn clear(&mut self) {
        self.draft.clear();
    }

    /// Wire JSON of the assembled tree
    fn assemble_json(&self) -> PyResult<String> {
        let tree = self.draft.assemble()?;
        Ok(serde_json::to_string(&tree).map_err(SegmentError::from)?)
    }

    fn summary(&self) -> String {
        self.draft.summary()
    }

    /// Number of conditions complete enough to be assembled
    fn active_count(&self) -> usize {
        self.draft.active_count()
    }

    /// Current conditions as a list of dicts
    fn conditions(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for leaf in self.draft.leaves() {
            list.append(self.leaf_to_dict(py, leaf)?)?;
        }
        Ok(list.into_any().unbind())
    }

    /// Current operators as "AND"/"OR" tokens
    fn operators(&self) -> Vec<&'static str> {
        self.draft.operators().iter().map(|op| op.as_str()).collect()
    }

    fn __len__(&self) -> usize {
        self.draft.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "RuleDraft(conditions={}, active={})",
            self.draft.len(),
            self.draft.active_count()
        )
    }
}

// ============================================================================
// Private Helper Methods
// ============================================================================

impl DraftSession {
    fn leaf_to_dict<'py>(&self, py: Python<'py>, leaf: &LeafCondition) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        dict.set_item("id", leaf.id.to_string())?;
        dict.set_item("condition", &leaf.condition_key)?;
        dict.set_item("comparator", leaf.comparator.map(|c| c.as_str()))?;
        match &leaf.value {
            LeafValue::Scalar(text) => dict.set_item("value", text)?,
            LeafValue::Range { min, max } => {
                dict.set_item("min", min)?;
                dict.set_item("max", max)?;
            }
        }
        dict.set_item("complete", leaf.is_complete())?;
        Ok(dict)
    }
}
