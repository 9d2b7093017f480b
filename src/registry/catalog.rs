//! Segmentable customer attributes

use serde::Serialize;

/// Value type of a segmentable attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Number => "number",
        }
    }
}

/// Static definition of one customer attribute the rule builder can segment on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionDefinition {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub unit: Option<&'static str>,
    pub description: &'static str,
}

/// The condition catalog, in display order
pub static CONDITIONS: [ConditionDefinition; 5] = [
    ConditionDefinition {
        key: "total_spend",
        label: "Total Spend",
        value_type: ValueType::Number,
        unit: Some("INR"),
        description: "Total amount spent by the customer",
    },
    ConditionDefinition {
        key: "visits",
        label: "Number of Visits",
        value_type: ValueType::Number,
        unit: None,
        description: "Total number of times the customer has visited",
    },
    ConditionDefinition {
        key: "last_order_date",
        label: "Days Since Last Active",
        value_type: ValueType::Number,
        unit: Some("days"),
        description: "Number of days since the customer last interacted",
    },
    ConditionDefinition {
        key: "avg_order_value",
        label: "Average Order Value",
        value_type: ValueType::Number,
        unit: Some("INR"),
        description: "Average amount spent per order",
    },
    ConditionDefinition {
        key: "total_orders",
        label: "Total Orders",
        value_type: ValueType::Number,
        unit: None,
        description: "Total number of orders placed",
    },
];

/// Keys written by older builders, mapped to their catalog key
pub static LEGACY_ALIASES: [(&str, &str); 1] = [("spend", "total_spend")];
