//! Editable rule state owned by the caller
//!
//! Holds the leaf list and the operators between leaves, and keeps
//! `operators.len() == leaves.len() - 1` true across every edit.

use crate::error::{Result, SegmentError};
use crate::rule::assembler::assemble;
use crate::rule::ast::{ExpressionNode, LogicalOperator};
use crate::rule::leaf::{LeafCondition, LeafId};
use crate::rule::summary::render;

#[derive(Debug, Clone, Default)]
pub struct RuleDraft {
    leaves: Vec<LeafCondition>,
    operators: Vec<LogicalOperator>,
}

impl RuleDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a draft from existing lists, checking the operator count
    pub fn from_parts(leaves: Vec<LeafCondition>, operators: Vec<LogicalOperator>) -> Result<Self> {
        if operators.len() != leaves.len().saturating_sub(1) {
            return Err(SegmentError::MalformedOperatorSequence {
                conditions: leaves.len(),
                operators: operators.len(),
            });
        }
        Ok(Self { leaves, operators })
    }

    #[inline]
    pub fn leaves(&self) -> &[LeafCondition] {
        &self.leaves
    }

    #[inline]
    pub fn operators(&self) -> &[LogicalOperator] {
        &self.operators
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Append a leaf joined by the default AND
    pub fn push(&mut self, leaf: LeafCondition) -> LeafId {
        self.push_with(LogicalOperator::default(), leaf)
    }

    /// Append a leaf; `operator` is ignored for the first leaf
    pub fn push_with(&mut self, operator: LogicalOperator, leaf: LeafCondition) -> LeafId {
        if !self.leaves.is_empty() {
            self.operators.push(operator);
        }
        let id = leaf.id;
        self.leaves.push(leaf);
        id
    }

    pub fn position(&self, id: LeafId) -> Option<usize> {
        self.leaves.iter().position(|leaf| leaf.id == id)
    }

    pub fn leaf_mut(&mut self, id: LeafId) -> Option<&mut LeafCondition> {
        self.leaves.iter_mut().find(|leaf| leaf.id == id)
    }

    /// Remove a leaf together with the operator that joined it
    ///
    /// The first leaf takes the operator after it; any other leaf takes the
    /// operator before it.
    pub fn remove(&mut self, id: LeafId) -> Option<LeafCondition> {
        let index = self.position(id)?;
        let leaf = self.leaves.remove(index);
        if !self.operators.is_empty() {
            self.operators.remove(index.saturating_sub(1));
        }
        Some(leaf)
    }

    /// Move the leaf at `from` to `to`; operators keep their positions
    pub fn move_leaf(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.leaves.len();
        if from >= len || to >= len {
            return Err(SegmentError::InvalidEdit(format!(
                "Cannot move condition {} to {} in a rule of {} conditions",
                from, to, len
            )));
        }
        let leaf = self.leaves.remove(from);
        self.leaves.insert(to, leaf);
        Ok(())
    }

    pub fn set_operator(&mut self, index: usize, operator: LogicalOperator) -> Result<()> {
        let slot = self.operator_slot(index)?;
        *slot = operator;
        Ok(())
    }

    /// Flip AND/OR at `index`, returning the new operator
    pub fn toggle_operator(&mut self, index: usize) -> Result<LogicalOperator> {
        let slot = self.operator_slot(index)?;
        *slot = slot.toggled();
        Ok(*slot)
    }

    fn operator_slot(&mut self, index: usize) -> Result<&mut LogicalOperator> {
        let len = self.operators.len();
        self.operators.get_mut(index).ok_or_else(|| {
            SegmentError::InvalidEdit(format!(
                "Operator index {} out of range for {} operators",
                index, len
            ))
        })
    }

    /// Number of leaves complete enough to take part in assembly
    pub fn active_count(&self) -> usize {
        self.leaves.iter().filter(|leaf| leaf.is_complete()).count()
    }

    pub fn clear(&mut self) {
        self.leaves.clear();
        self.operators.clear();
    }

    /// Assemble the current state into a fresh tree
    pub fn assemble(&self) -> Result<ExpressionNode> {
        assemble(&self.leaves, &self.operators)
    }

    /// Summary of the current state
    pub fn summary(&self) -> String {
        render(&self.leaves, &self.operators)
    }
}
