//! Rule tree assembler
//!
//! Turns the flat list of leaf conditions and the operators between them into
//! one expression tree. Grouping is strictly left to right with no operator
//! precedence: `A OR B AND C` becomes `(A OR B) AND C`. Runs of the same
//! operator collapse into a single node, so `A AND B AND C` is one AND node
//! with three children.

use smallvec::SmallVec;

use crate::error::{Result, SegmentError};
use crate::rule::ast::{CompoundNode, ExpressionNode, LogicalOperator, Predicate};
use crate::rule::leaf::LeafCondition;

/// Build the expression tree for `leaves` joined by `operators`
///
/// `operators[i]` sits between `leaves[i]` and `leaves[i + 1]`, so there must
/// be exactly one fewer operator than leaves. The whole call fails on the
/// first problem found; no partial tree is ever returned.
pub fn assemble(leaves: &[LeafCondition], operators: &[LogicalOperator]) -> Result<ExpressionNode> {
    if leaves.is_empty() {
        return Err(SegmentError::EmptyRuleSet);
    }

    if operators.len() != leaves.len() - 1 {
        log::warn!(
            "Rejecting rule set with {} conditions and {} operators",
            leaves.len(),
            operators.len()
        );
        return Err(SegmentError::MalformedOperatorSequence {
            conditions: leaves.len(),
            operators: operators.len(),
        });
    }

    let mut predicates: SmallVec<[Predicate; 8]> = SmallVec::with_capacity(leaves.len());
    for (index, leaf) in leaves.iter().enumerate() {
        predicates.push(leaf.to_predicate(index)?);
    }

    let mut nodes = predicates.into_iter().map(ExpressionNode::Simple);
    let Some(first) = nodes.next() else {
        return Err(SegmentError::EmptyRuleSet);
    };

    Ok(operators
        .iter()
        .copied()
        .zip(nodes)
        .fold(first, |root, (operator, node)| combine(root, operator, node)))
}

/// Join `node` onto the running tree
///
/// Extends the root when it already uses `operator`, otherwise wraps it.
#[inline]
fn combine(root: ExpressionNode, operator: LogicalOperator, node: ExpressionNode) -> ExpressionNode {
    match root {
        ExpressionNode::Compound(mut compound) if compound.operator == operator => {
            compound.conditions.push(node);
            ExpressionNode::Compound(compound)
        }
        root => ExpressionNode::Compound(CompoundNode {
            operator,
            conditions: vec![root, node],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MissingField;
    use crate::rule::ast::{Comparator, PredicateValue};
    use serde_json::json;

    use LogicalOperator::{And, Or};

    fn leaf(key: &str, value: &str) -> LeafCondition {
        LeafCondition::new(key, Comparator::Gt, value)
    }

    fn simple(key: &str, value: f64) -> ExpressionNode {
        ExpressionNode::Simple(Predicate {
            field: key.to_string(),
            comparator: Comparator::Gt,
            value: PredicateValue::Number(value),
        })
    }

    fn compound(operator: LogicalOperator, conditions: Vec<ExpressionNode>) -> ExpressionNode {
        ExpressionNode::Compound(CompoundNode {
            operator,
            conditions,
        })
    }

    #[test]
    fn test_empty_rule_set() {
        assert!(matches!(assemble(&[], &[]), Err(SegmentError::EmptyRuleSet)));
    }

    #[test]
    fn test_single_leaf_is_simple_node() {
        let node = assemble(&[LeafCondition::new("visits", Comparator::Lt, "3")], &[]).unwrap();
        assert_eq!(
            node,
            ExpressionNode::Simple(Predicate {
                field: "visits".to_string(),
                comparator: Comparator::Lt,
                value: PredicateValue::Number(3.0),
            })
        );
    }

    #[test]
    fn test_single_leaf_rejects_operators() {
        let result = assemble(&[leaf("visits", "3")], &[And]);
        assert!(matches!(
            result,
            Err(SegmentError::MalformedOperatorSequence { conditions: 1, operators: 1 })
        ));
    }

    #[test]
    fn test_two_leaves() {
        let node = assemble(&[leaf("a", "1"), leaf("b", "2")], &[Or]).unwrap();
        assert_eq!(node, compound(Or, vec![simple("a", 1.0), simple("b", 2.0)]));
    }

    #[test]
    fn test_same_operator_flattens() {
        let node = assemble(&[leaf("a", "1"), leaf("b", "2"), leaf("c", "3")], &[And, And]).unwrap();
        assert_eq!(
            node,
            compound(And, vec![simple("a", 1.0), simple("b", 2.0), simple("c", 3.0)])
        );
    }

    #[test]
    fn test_mixed_operators_group_left() {
        let node = assemble(&[leaf("a", "1"), leaf("b", "2"), leaf("c", "3")], &[Or, And]).unwrap();
        assert_eq!(
            node,
            compound(
                And,
                vec![compound(Or, vec![simple("a", 1.0), simple("b", 2.0)]), simple("c", 3.0)]
            )
        );
    }

    #[test]
    fn test_alternating_operators_nest_on_the_left() {
        let leaves = [leaf("a", "1"), leaf("b", "2"), leaf("c", "3"), leaf("d", "4"), leaf("e", "5")];
        let node = assemble(&leaves, &[And, Or, Or, And]).unwrap();
        assert_eq!(
            node,
            compound(
                And,
                vec![
                    compound(
                        Or,
                        vec![
                            compound(And, vec![simple("a", 1.0), simple("b", 2.0)]),
                            simple("c", 3.0),
                            simple("d", 4.0),
                        ]
                    ),
                    simple("e", 5.0),
                ]
            )
        );
    }

    #[test]
    fn test_operator_count_mismatch() {
        let result = assemble(&[leaf("a", "1"), leaf("b", "2")], &[And, Or]);
        assert!(matches!(
            result,
            Err(SegmentError::MalformedOperatorSequence { conditions: 2, operators: 2 })
        ));

        let result = assemble(&[leaf("a", "1"), leaf("b", "2"), leaf("c", "3")], &[And]);
        assert!(matches!(result, Err(SegmentError::MalformedOperatorSequence { .. })));
    }

    #[test]
    fn test_incomplete_leaf_reports_position() {
        let leaves = [leaf("a", "1"), leaf("b", "2"), leaf("c", "")];
        let result = assemble(&leaves, &[And, And]);
        assert!(matches!(
            result,
            Err(SegmentError::IncompleteCondition { index: 2, missing: MissingField::Value })
        ));
    }

    #[test]
    fn test_operator_check_precedes_leaf_check() {
        let leaves = [LeafCondition::default(), leaf("b", "2")];
        assert!(matches!(
            assemble(&leaves, &[]),
            Err(SegmentError::MalformedOperatorSequence { .. })
        ));
    }

    #[test]
    fn test_end_to_end_wire_shape() {
        let leaves = [
            LeafCondition::new("total_spend", Comparator::Gt, "10000"),
            LeafCondition::new("visits", Comparator::Lt, "3"),
        ];
        let node = assemble(&leaves, &[And]).unwrap();
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "type": "and",
                "conditions": [
                    {"type": "simple", "field": "total_spend", "comparator": "gt", "value": 10000},
                    {"type": "simple", "field": "visits", "comparator": "lt", "value": 3}
                ]
            })
        );
    }

    #[test]
    fn test_deterministic() {
        let leaves = [leaf("a", "1"), leaf("b", "2"), leaf("c", "3")];
        let first = assemble(&leaves, &[Or, And]).unwrap();
        let second = assemble(&leaves, &[Or, And]).unwrap();
        assert_eq!(first, second);
    }
}
