//! Expression tree for segmentation rules
//!
//! The tree is what the audience-evaluation endpoint consumes. On the wire a
//! node is an object tagged by `type`: `"simple"` nodes carry
//! `field`/`comparator`/`value`, `"and"`/`"or"` nodes carry `conditions`.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::SegmentError;

/// Largest integer a JSON consumer can hold exactly in a double
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    /// Greater than (>)
    Gt,
    /// Less than (<)
    Lt,
    /// Greater than or equal (≥)
    Gte,
    /// Less than or equal (≤)
    Lte,
    /// Equal (=)
    Eq,
    /// Inclusive range, takes a min/max pair
    Between,
}

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Comparator::Gt,
        Comparator::Lt,
        Comparator::Eq,
        Comparator::Gte,
        Comparator::Lte,
        Comparator::Between,
    ];

    /// Wire name, e.g. "gte"
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Gt => "gt",
            Comparator::Lt => "lt",
            Comparator::Gte => "gte",
            Comparator::Lte => "lte",
            Comparator::Eq => "eq",
            Comparator::Between => "between",
        }
    }

    /// Display symbol used in rule summaries
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Gte => "≥",
            Comparator::Lte => "≤",
            Comparator::Eq => "=",
            Comparator::Between => "between",
        }
    }

    /// Whether this comparator takes a min/max pair instead of one value
    #[inline]
    pub fn is_range(self) -> bool {
        matches!(self, Comparator::Between)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = String;

    /// Accepts wire names and display symbols
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gt" | ">" => Ok(Comparator::Gt),
            "lt" | "<" => Ok(Comparator::Lt),
            "gte" | ">=" | "≥" => Ok(Comparator::Gte),
            "lte" | "<=" | "≤" => Ok(Comparator::Lte),
            "eq" | "=" | "==" => Ok(Comparator::Eq),
            "between" => Ok(Comparator::Between),
            other => Err(format!("Unknown comparator: {}", other)),
        }
    }
}

/// Binary operator joining two consecutive conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// Token shown between conditions, "AND" or "OR"
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }

    /// Node type on the wire, "and" or "or"
    pub fn wire_name(self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            LogicalOperator::And => LogicalOperator::Or,
            LogicalOperator::Or => LogicalOperator::And,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("and") {
            Ok(LogicalOperator::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(LogicalOperator::Or)
        } else {
            Err(format!("Unknown operator: {}", s))
        }
    }
}

/// Numeric payload of a leaf predicate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredicateValue {
    Number(f64),
    Range { min: f64, max: f64 },
}

impl PredicateValue {
    /// Whether the payload shape fits the comparator
    pub fn fits(&self, comparator: Comparator) -> bool {
        matches!(self, PredicateValue::Range { .. }) == comparator.is_range()
    }
}

/// A number as the wire expects it: whole values go out as integers
struct WireNumber(f64);

impl Serialize for WireNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl Serialize for PredicateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            PredicateValue::Number(value) => WireNumber(value).serialize(serializer),
            PredicateValue::Range { min, max } => {
                let mut range = serializer.serialize_struct("Range", 2)?;
                range.serialize_field("min", &WireNumber(min))?;
                range.serialize_field("max", &WireNumber(max))?;
                range.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for PredicateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Range { min: f64, max: f64 },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(PredicateValue::Number(value)),
            Raw::Range { min, max } => Ok(PredicateValue::Range { min, max }),
        }
    }
}

/// Leaf predicate: one attribute compared against a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub comparator: Comparator,
    pub value: PredicateValue,
}

/// AND/OR combination of two or more child nodes
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundNode {
    pub operator: LogicalOperator,
    pub conditions: Vec<ExpressionNode>,
}

/// Node of an assembled rule tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireNode")]
pub enum ExpressionNode {
    Simple(Predicate),
    Compound(CompoundNode),
}

impl ExpressionNode {
    /// Parse a tree from its wire JSON
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|e| SegmentError::Deserialization(e.to_string()))
    }

    #[inline]
    pub fn is_simple(&self) -> bool {
        matches!(self, ExpressionNode::Simple(_))
    }

    /// Operator of a compound node, `None` for a leaf
    pub fn operator(&self) -> Option<LogicalOperator> {
        match self {
            ExpressionNode::Simple(_) => None,
            ExpressionNode::Compound(compound) => Some(compound.operator),
        }
    }

    /// Direct children; empty for a leaf
    pub fn children(&self) -> &[ExpressionNode] {
        match self {
            ExpressionNode::Simple(_) => &[],
            ExpressionNode::Compound(compound) => &compound.conditions,
        }
    }

    /// Leaf predicates in left-to-right order
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_predicates(&mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            ExpressionNode::Simple(predicate) => out.push(predicate),
            ExpressionNode::Compound(compound) => {
                for child in &compound.conditions {
                    child.collect_predicates(out);
                }
            }
        }
    }

    /// Nesting depth; a leaf has depth 1
    pub fn depth(&self) -> usize {
        match self {
            ExpressionNode::Simple(_) => 1,
            ExpressionNode::Compound(compound) => {
                1 + compound
                    .conditions
                    .iter()
                    .map(ExpressionNode::depth)
                    .max()
                    .unwrap_or(0)
            }
        }
    }
}

impl Serialize for ExpressionNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExpressionNode::Simple(predicate) => {
                let mut node = serializer.serialize_struct("ExpressionNode", 4)?;
                node.serialize_field("type", "simple")?;
                node.serialize_field("field", &predicate.field)?;
                node.serialize_field("comparator", &predicate.comparator)?;
                node.serialize_field("value", &predicate.value)?;
                node.end()
            }
            ExpressionNode::Compound(compound) => {
                let mut node = serializer.serialize_struct("ExpressionNode", 2)?;
                node.serialize_field("type", compound.operator.wire_name())?;
                node.serialize_field("conditions", &compound.conditions)?;
                node.end()
            }
        }
    }
}

/// Tagged shape used when reading trees back, e.g. from a saved segment
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireNode {
    Simple(Predicate),
    And { conditions: Vec<ExpressionNode> },
    Or { conditions: Vec<ExpressionNode> },
}

impl TryFrom<WireNode> for ExpressionNode {
    type Error = String;

    fn try_from(node: WireNode) -> Result<Self, Self::Error> {
        let (operator, conditions) = match node {
            WireNode::Simple(predicate) => {
                if !predicate.value.fits(predicate.comparator) {
                    return Err(format!(
                        "value of '{}' does not fit comparator '{}'",
                        predicate.field, predicate.comparator
                    ));
                }
                return Ok(ExpressionNode::Simple(predicate));
            }
            WireNode::And { conditions } => (LogicalOperator::And, conditions),
            WireNode::Or { conditions } => (LogicalOperator::Or, conditions),
        };

        if conditions.len() < 2 {
            return Err(format!(
                "'{}' node needs at least two conditions, got {}",
                operator.wire_name(),
                conditions.len()
            ));
        }

        Ok(ExpressionNode::Compound(CompoundNode {
            operator,
            conditions,
        }))
    }
}
