//! Human-readable rule summaries
//!
//! Summaries are rendered from the leaf list rather than from an assembled
//! tree, so they always reflect the current edit state, including leaves the
//! user has not finished filling in.

use crate::registry;
use crate::rule::ast::{ExpressionNode, Predicate, PredicateValue};
use crate::rule::leaf::LeafCondition;
use crate::rule::LogicalOperator;

/// Render `leaves` joined by `operators`, e.g. "Total Spend > 10000 INR AND Number of Visits < 3"
///
/// Never fails. A missing operator between two leaves renders as a single
/// space and operators past the last leaf are ignored.
pub fn render(leaves: &[LeafCondition], operators: &[LogicalOperator]) -> String {
    let mut out = String::new();
    for (i, leaf) in leaves.iter().enumerate() {
        if i > 0 {
            push_separator(&mut out, operators.get(i - 1).copied());
        }
        let symbol = leaf.comparator.map(|c| c.symbol()).unwrap_or("");
        push_condition(&mut out, &leaf.condition_key, symbol, &leaf.value.display_text());
    }
    out
}

/// Render a single leaf
pub fn render_leaf(leaf: &LeafCondition) -> String {
    render(std::slice::from_ref(leaf), &[])
}

/// Render a stored tree in reading order, without grouping
///
/// Used for saved segments that carry no persisted summary. For a tree built
/// by the assembler this reads the same as [`render`] on its input.
pub fn render_tree(node: &ExpressionNode) -> String {
    let mut out = String::new();
    push_node(&mut out, node);
    out
}

fn push_node(out: &mut String, node: &ExpressionNode) {
    match node {
        ExpressionNode::Simple(predicate) => push_predicate(out, predicate),
        ExpressionNode::Compound(compound) => {
            for (i, child) in compound.conditions.iter().enumerate() {
                if i > 0 {
                    push_separator(out, Some(compound.operator));
                }
                push_node(out, child);
            }
        }
    }
}

fn push_predicate(out: &mut String, predicate: &Predicate) {
    let value = match predicate.value {
        PredicateValue::Number(value) => value.to_string(),
        PredicateValue::Range { min, max } => format!("{} and {}", min, max),
    };
    push_condition(out, &predicate.field, predicate.comparator.symbol(), &value);
}

#[inline]
fn push_separator(out: &mut String, operator: Option<LogicalOperator>) {
    match operator {
        Some(operator) => {
            out.push(' ');
            out.push_str(operator.as_str());
            out.push(' ');
        }
        None => out.push(' '),
    }
}

/// "<label> <symbol> <value>[ <unit>]", falling back to the raw key as label
fn push_condition(out: &mut String, key: &str, symbol: &str, value: &str) {
    let definition = registry::lookup(key);
    out.push_str(definition.map(|d| d.label).unwrap_or(key));
    out.push(' ');
    out.push_str(symbol);
    out.push(' ');
    out.push_str(value);
    if let Some(unit) = definition.and_then(|d| d.unit) {
        out.push(' ');
        out.push_str(unit);
    }
}
