use std::vec::IntoIter;

use itertools::Itertools;

use crate::planner::{GroupExprId, GroupId, Memo};
use crate::rules::{OptExpression, Pattern};

/// Enumerates all bindings of a pattern rooted at one group expression.
///
/// A binding is an [`OptExpression`] whose matched nodes are expression
/// handles and whose unmatched frontier is group handles. Where a child
/// group holds several matching members, one binding is produced per
/// combination, so a rule sees every alternative exactly once.
pub(crate) struct Binding<'a, 'b> {
    root: GroupExprId,
    pattern: &'b Pattern,
    memo: &'a Memo,
}

impl<'a, 'b> Binding<'a, 'b> {
    pub(crate) fn new(root: GroupExprId, pattern: &'b Pattern, memo: &'a Memo) -> Self {
        Self {
            root,
            pattern,
            memo,
        }
    }

    fn bind_expr(&self, expr_id: GroupExprId, pattern: &Pattern) -> Vec<OptExpression> {
        let expr = &self.memo[expr_id];
        if !expr.matches_without_children(pattern) {
            return vec![];
        }

        match &pattern.children {
            None => {
                // Unmatched frontier: expose inputs as group handles.
                let inputs = expr
                    .inputs()
                    .iter()
                    .map(|group_id| OptExpression::with_group_handle(*group_id))
                    .collect::<Vec<_>>();
                vec![OptExpression::with_expr_handle(expr_id, inputs)]
            }
            Some(children_patterns) => {
                let children_bindings = children_patterns
                    .iter()
                    .zip(expr.inputs().iter())
                    .map(|(child_pattern, group_id)| {
                        self.bind_group(*group_id, child_pattern)
                    })
                    .multi_cartesian_product();

                children_bindings
                    .map(|inputs| OptExpression::with_expr_handle(expr_id, inputs))
                    .collect()
            }
        }
    }

    fn bind_group(&self, group_id: GroupId, pattern: &Pattern) -> Vec<OptExpression> {
        self.memo[group_id]
            .expr_ids()
            .into_iter()
            .flat_map(|expr_id| self.bind_expr(expr_id, pattern))
            .collect()
    }
}

impl<'a, 'b> IntoIterator for Binding<'a, 'b> {
    type Item = OptExpression;
    type IntoIter = IntoIter<OptExpression>;

    fn into_iter(self) -> Self::IntoIter {
        self.bind_expr(self.root, self.pattern).into_iter()
    }
}
