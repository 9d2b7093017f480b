//! AudiencePreview / SavedSegment - backend results held in Rust memory
//!
//! Python reads fields through getters; customer samples and rule trees are
//! only serialized when asked for.

use pyo3::prelude::*;

use crate::error::SegmentError;

use super::types::{AudiencePreview, SavedSegment};

/// Handle to a preview returned by `preview_segment_async`
#[pyclass(name = "AudiencePreview")]
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    preview: AudiencePreview,
}

impl PreviewHandle {
    pub fn new(preview: AudiencePreview) -> Self {
        Self { preview }
    }

    pub fn preview(&self) -> &AudiencePreview {
        &self.preview
    }
}

#[pymethods]
impl PreviewHandle {
    /// Number of matching customers
    #[getter]
    fn total_count(&self) -> u64 {
        self.preview.total_count
    }

    #[getter]
    fn average_spend(&self) -> f64 {
        self.preview.details.average_spend
    }

    #[getter]
    fn average_orders(&self) -> f64 {
        self.preview.details.average_orders
    }

    #[getter]
    fn total_spend(&self) -> f64 {
        self.preview.details.total_spend
    }

    /// Ids of the sampled customers, in server order
    #[getter]
    fn customer_ids(&self) -> Vec<String> {
        self.preview.customer_ids()
    }

    /// Customer sample as a JSON array
    fn audience_json(&self) -> PyResult<String> {
        Ok(serde_json::to_string(&self.preview.audience).map_err(SegmentError::from)?)
    }

    fn __len__(&self) -> usize {
        self.preview.audience.len()
    }

    fn __repr__(&self) -> String {
        format!("AudiencePreview(total_count={})", self.preview.total_count)
    }
}

/// Handle to one saved segment returned by `list_segments_async`
#[pyclass(name = "SavedSegment")]
#[derive(Debug, Clone)]
pub struct SegmentHandle {
    segment: SavedSegment,
}

impl SegmentHandle {
    pub fn new(segment: SavedSegment) -> Self {
        Self { segment }
    }
}

#[pymethods]
impl SegmentHandle {
    #[getter]
    fn id(&self) -> &str {
        &self.segment.id
    }

    #[getter]
    fn name(&self) -> &str {
        &self.segment.name
    }

    /// Stored condition string, or one rendered from the rules
    #[getter]
    fn summary(&self) -> String {
        self.segment.display_summary()
    }

    #[getter]
    fn audience_size(&self) -> u64 {
        self.segment.size()
    }

    #[getter]
    fn customer_ids(&self) -> Vec<String> {
        self.segment.customer_ids.clone()
    }

    #[getter]
    fn created_by(&self) -> Option<String> {
        self.segment.created_by.clone()
    }

    #[getter]
    fn created_at(&self) -> Option<String> {
        self.segment.created_at.clone()
    }

    /// Rule tree as wire JSON, or None when the segment has no rules
    fn rules_json(&self) -> PyResult<Option<String>> {
        match &self.segment.rules {
            Some(rules) => Ok(Some(serde_json::to_string(rules).map_err(SegmentError::from)?)),
            None => Ok(None),
        }
    }

    fn __repr__(&self) -> String {
        format!("SavedSegment(id={:?}, name={:?})", self.segment.id, self.segment.name)
    }
}
