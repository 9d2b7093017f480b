//! Request and response shapes of the segmentation backend

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SegmentError};
use crate::rule::{render_tree, ExpressionNode, RuleDraft};

/// Body of the audience count call
#[derive(Debug, Clone, Serialize)]
pub struct CountRequest<'a> {
    pub rules: &'a ExpressionNode,
    pub options: Map<String, Value>,
}

impl<'a> CountRequest<'a> {
    pub fn new(rules: &'a ExpressionNode) -> Self {
        Self {
            rules,
            options: Map::new(),
        }
    }
}

/// Envelope returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One matching customer; attributes beyond the id are kept as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Aggregates over the matched audience
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudienceDetails {
    pub average_spend: f64,
    pub average_orders: f64,
    pub total_spend: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudienceData {
    pub total_count: u64,
    pub audience: Vec<Customer>,
    pub details: Option<AudienceDetails>,
}

/// Result of previewing a rule against the backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudiencePreview {
    pub total_count: u64,
    pub audience: Vec<Customer>,
    pub details: AudienceDetails,
}

impl From<AudienceData> for AudiencePreview {
    fn from(data: AudienceData) -> Self {
        Self {
            total_count: data.total_count,
            audience: data.audience,
            details: data.details.unwrap_or_default(),
        }
    }
}

impl AudiencePreview {
    pub fn customer_ids(&self) -> Vec<String> {
        self.audience.iter().map(|c| c.id.clone()).collect()
    }

    /// Whether there is anything to save
    pub fn is_empty(&self) -> bool {
        self.total_count == 0 || self.audience.is_empty()
    }
}

/// Body of the save call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSavePayload {
    pub name: String,
    pub rules: ExpressionNode,
    pub condition_string: String,
    pub customer_ids: Vec<String>,
    pub audience_size: u64,
    pub created_by: String,
}

impl SegmentSavePayload {
    /// Build a save payload from a draft and the preview taken of it
    pub fn from_draft(
        name: &str,
        draft: &RuleDraft,
        preview: &AudiencePreview,
        created_by: &str,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SegmentError::InvalidEdit("Segment name is required".to_string()));
        }
        if preview.is_empty() {
            return Err(SegmentError::InvalidEdit(
                "Please preview the segment first".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            rules: draft.assemble()?,
            condition_string: draft.summary(),
            customer_ids: preview.customer_ids(),
            audience_size: preview.total_count,
            created_by: created_by.to_string(),
        })
    }
}

/// Stored segment as echoed back by the save call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavedSegmentData {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
}

/// Outcome of a successful save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReceipt {
    pub id: Option<String>,
    pub message: Option<String>,
}

/// A segment as listed back from the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSegment {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Option<ExpressionNode>,
    #[serde(default)]
    pub condition_string: Option<String>,
    #[serde(default)]
    pub customer_ids: Vec<String>,
    #[serde(default)]
    pub audience_size: u64,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl SavedSegment {
    /// Stored summary, or one rendered from the rule tree when none was saved
    pub fn display_summary(&self) -> String {
        match self.condition_string.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => self.rules.as_ref().map(render_tree).unwrap_or_default(),
        }
    }

    /// Stored audience size, falling back to the number of saved customer ids
    pub fn size(&self) -> u64 {
        if self.audience_size > 0 {
            self.audience_size
        } else {
            self.customer_ids.len() as u64
        }
    }
}

/// Payload of the segment listing call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentList {
    #[serde(default)]
    pub segments: Vec<SavedSegment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Comparator, LeafCondition};
    use serde_json::json;

    fn customer(id: &str) -> Customer {
        Customer {
            id: id.to_string(),
            name: None,
            email: None,
            attributes: Map::new(),
        }
    }

    fn draft() -> RuleDraft {
        let mut draft = RuleDraft::new();
        draft.push(LeafCondition::new("total_spend", Comparator::Gt, "10000"));
        draft.push(LeafCondition::new("visits", Comparator::Lt, "3"));
        draft
    }

    #[test]
    fn test_count_request_shape() {
        let tree = draft().assemble().unwrap();
        let body = serde_json::to_value(CountRequest::new(&tree)).unwrap();
        assert_eq!(body["options"], json!({}));
        assert_eq!(body["rules"]["type"], "and");
    }

    #[test]
    fn test_count_response_defaults() {
        let envelope: ApiEnvelope<AudienceData> = serde_json::from_value(json!({
            "status": "success",
            "data": {
                "totalCount": 2,
                "audience": [
                    {"_id": "c1", "name": "Asha", "totalSpend": 12000},
                    {"_id": "c2"}
                ]
            }
        }))
        .unwrap();
        let preview = AudiencePreview::from(envelope.data.unwrap());
        assert_eq!(preview.total_count, 2);
        assert_eq!(preview.customer_ids(), vec!["c1", "c2"]);
        assert_eq!(preview.audience[0].name.as_deref(), Some("Asha"));
        assert_eq!(preview.audience[0].attributes["totalSpend"], json!(12000));
        assert_eq!(preview.details, AudienceDetails::default());
    }

    #[test]
    fn test_details_partial() {
        let data: AudienceData = serde_json::from_value(json!({
            "totalCount": 1,
            "audience": [{"_id": "c1"}],
            "details": {"averageSpend": 250.5}
        }))
        .unwrap();
        let details = data.details.unwrap();
        assert_eq!(details.average_spend, 250.5);
        assert_eq!(details.average_orders, 0.0);
    }

    #[test]
    fn test_save_payload_from_draft() {
        let preview = AudiencePreview {
            total_count: 2,
            audience: vec![customer("c1"), customer("c2")],
            details: AudienceDetails::default(),
        };
        let payload = SegmentSavePayload::from_draft("  High value ", &draft(), &preview, "ops@example.com").unwrap();
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["name"], "High value");
        assert_eq!(
            body["conditionString"],
            "Total Spend > 10000 INR AND Number of Visits < 3"
        );
        assert_eq!(body["customerIds"], json!(["c1", "c2"]));
        assert_eq!(body["audienceSize"], 2);
        assert_eq!(body["createdBy"], "ops@example.com");
        assert_eq!(body["rules"]["conditions"][0]["value"], 10000);
    }

    #[test]
    fn test_save_payload_requires_preview() {
        let err = SegmentSavePayload::from_draft("Lapsed", &draft(), &AudiencePreview::default(), "")
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid edit: Please preview the segment first");
    }

    #[test]
    fn test_save_payload_requires_name() {
        let preview = AudiencePreview {
            total_count: 1,
            audience: vec![customer("c1")],
            details: AudienceDetails::default(),
        };
        assert!(SegmentSavePayload::from_draft("   ", &draft(), &preview, "").is_err());
    }

    #[test]
    fn test_saved_segment_prefers_stored_summary() {
        let segment: SavedSegment = serde_json::from_value(json!({
            "_id": "seg-1",
            "name": "High value",
            "rules": {"type": "simple", "field": "total_spend", "comparator": "gt", "value": 10000},
            "conditionString": "Big spenders",
            "customerIds": ["c1", "c2"],
            "createdAt": "2024-03-01T10:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(segment.display_summary(), "Big spenders");
        assert_eq!(segment.size(), 2);
        assert_eq!(segment.created_at.as_deref(), Some("2024-03-01T10:00:00.000Z"));
    }

    #[test]
    fn test_saved_segment_renders_rules_without_summary() {
        let segment: SavedSegment = serde_json::from_value(json!({
            "_id": "seg-2",
            "name": "Lapsed",
            "rules": {
                "type": "or",
                "conditions": [
                    {"type": "simple", "field": "last_order_date", "comparator": "gte", "value": 90},
                    {"type": "simple", "field": "visits", "comparator": "lt", "value": 2}
                ]
            },
            "conditionString": "  ",
            "audienceSize": 40
        }))
        .unwrap();
        assert_eq!(
            segment.display_summary(),
            "Days Since Last Active ≥ 90 days OR Number of Visits < 2"
        );
        assert_eq!(segment.size(), 40);
    }

    #[test]
    fn test_saved_segment_without_rules_or_summary() {
        let segment: SavedSegment = serde_json::from_value(json!({"_id": "seg-3"})).unwrap();
        assert_eq!(segment.display_summary(), "");
        assert_eq!(segment.size(), 0);
    }

    #[test]
    fn test_saved_segment_rejects_malformed_rules() {
        let result = serde_json::from_value::<SavedSegment>(json!({
            "_id": "seg-4",
            "rules": {"type": "and", "conditions": []}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_payload_propagates_rule_errors() {
        let preview = AudiencePreview {
            total_count: 1,
            audience: vec![customer("c1")],
            details: AudienceDetails::default(),
        };
        let err = SegmentSavePayload::from_draft("Empty", &RuleDraft::new(), &preview, "").unwrap_err();
        assert!(matches!(err, SegmentError::EmptyRuleSet));
    }
}
