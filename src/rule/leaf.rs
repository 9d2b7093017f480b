//! User-authored leaf conditions
//!
//! A leaf keeps its value exactly as typed so that a half-edited rule can
//! still be rendered. Parsing into a [`Predicate`] happens at assembly time.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::error::{MissingField, Result, SegmentError};
use crate::registry;
use crate::rule::ast::{Comparator, Predicate, PredicateValue};

/// Plain decimal literal with optional sign, fraction and exponent
static NUMERIC_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?\s*$")
        .expect("numeric input pattern is valid")
});

/// Parse user input into a finite number
///
/// Rejects empty input, `inf`/`NaN` spellings and anything that overflows.
pub fn parse_number(text: &str) -> Option<f64> {
    if !NUMERIC_INPUT.is_match(text) {
        return None;
    }
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Opaque identifier of a leaf condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(u64);

impl LeafId {
    pub fn generate() -> Self {
        LeafId(rand::random())
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule-{:016x}", self.0)
    }
}

impl FromStr for LeafId {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("rule-")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .map(LeafId)
            .ok_or_else(|| SegmentError::InvalidEdit(format!("Invalid condition id: {}", s)))
    }
}

/// Value of a leaf as entered, shaped by its comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafValue {
    Scalar(String),
    Range { min: String, max: String },
}

impl Default for LeafValue {
    fn default() -> Self {
        LeafValue::Scalar(String::new())
    }
}

impl LeafValue {
    /// Split "30, 90" style input into a range
    pub fn range_from_input(text: &str) -> Self {
        let (min, max) = match text.split_once(',') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (text.trim(), ""),
        };
        LeafValue::Range {
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Empty value of the shape a comparator expects
    pub fn empty_for(comparator: Option<Comparator>) -> Self {
        match comparator {
            Some(c) if c.is_range() => LeafValue::Range {
                min: String::new(),
                max: String::new(),
            },
            _ => LeafValue::default(),
        }
    }

    /// Text shown in summaries
    pub fn display_text(&self) -> String {
        match self {
            LeafValue::Scalar(text) => text.clone(),
            LeafValue::Range { min, max } if min.is_empty() && max.is_empty() => String::new(),
            LeafValue::Range { min, max } => format!("{} and {}", min, max),
        }
    }

    fn is_range(&self) -> bool {
        matches!(self, LeafValue::Range { .. })
    }
}

/// A single attribute/comparator/value predicate authored by a user
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCondition {
    pub id: LeafId,
    pub condition_key: String,
    pub comparator: Option<Comparator>,
    pub value: LeafValue,
}

impl Default for LeafCondition {
    fn default() -> Self {
        Self {
            id: LeafId::generate(),
            condition_key: String::new(),
            comparator: None,
            value: LeafValue::default(),
        }
    }
}

impl LeafCondition {
    /// Scalar condition such as `visits lt 3`
    pub fn new(
        condition_key: impl Into<String>,
        comparator: Comparator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: LeafId::generate(),
            condition_key: condition_key.into(),
            comparator: Some(comparator),
            value: LeafValue::Scalar(value.into()),
        }
    }

    /// Range condition, `between min and max`
    pub fn between(
        condition_key: impl Into<String>,
        min: impl Into<String>,
        max: impl Into<String>,
    ) -> Self {
        Self {
            id: LeafId::generate(),
            condition_key: condition_key.into(),
            comparator: Some(Comparator::Between),
            value: LeafValue::Range {
                min: min.into(),
                max: max.into(),
            },
        }
    }

    /// Switch the attribute; comparator and value no longer apply
    pub fn set_condition_key(&mut self, key: impl Into<String>) {
        self.condition_key = key.into();
        self.comparator = None;
        self.value = LeafValue::default();
    }

    /// Switch the comparator, clearing the value when its shape changes
    pub fn set_comparator(&mut self, comparator: Comparator) {
        if self.value.is_range() != comparator.is_range() {
            self.value = LeafValue::empty_for(Some(comparator));
        }
        self.comparator = Some(comparator);
    }

    /// Whether the leaf can take part in assembly
    pub fn is_complete(&self) -> bool {
        self.to_predicate(0).is_ok()
    }

    /// Validate and convert into a wire predicate; `index` names the leaf in errors
    pub fn to_predicate(&self, index: usize) -> Result<Predicate> {
        let incomplete = |missing| SegmentError::IncompleteCondition { index, missing };

        if self.condition_key.trim().is_empty() {
            return Err(incomplete(MissingField::Key));
        }
        let comparator = self
            .comparator
            .ok_or_else(|| incomplete(MissingField::Comparator))?;

        let value = match (&self.value, comparator.is_range()) {
            (LeafValue::Scalar(text), false) => {
                PredicateValue::Number(parse_number(text).ok_or_else(|| incomplete(MissingField::Value))?)
            }
            (LeafValue::Range { min, max }, true) => {
                let min = parse_number(min).ok_or_else(|| incomplete(MissingField::Value))?;
                let max = parse_number(max).ok_or_else(|| incomplete(MissingField::Value))?;
                if min > max {
                    return Err(SegmentError::InvalidRange { index });
                }
                PredicateValue::Range { min, max }
            }
            _ => return Err(SegmentError::PayloadMismatch { index, comparator }),
        };

        Ok(Predicate {
            field: registry::canonical_key(&self.condition_key).to_string(),
            comparator,
            value,
        })
    }
}
