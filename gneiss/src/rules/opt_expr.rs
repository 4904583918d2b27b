use std::fmt::{Debug, Formatter};
use std::ops::Index;

use arrow_schema::SchemaRef;

use crate::error::{OptError, OptResult};
use crate::operator::{Operator, OperatorTrait};
use crate::rules::OptExprNode::{ExprHandleNode, GroupHandleNode, OperatorNode};
use crate::rules::RuleContext;
use crate::planner::{GroupExprId, GroupId};
use crate::traits::TraitSet;
use crate::utils::RootBuilder;

pub type OptExprVec = Vec<OptExpression>;

/// One node in [`OptExpression`].
#[derive(Clone, PartialEq)]
pub enum OptExprNode {
    /// A node created by a rule. `traits` is the trait set the new
    /// expression should carry; `None` means "abstract", i.e. the default
    /// set of the session's trait registry.
    OperatorNode {
        operator: Operator,
        traits: Option<TraitSet>,
    },
    /// An existing memo expression, reused unchanged.
    ExprHandleNode(GroupExprId),
    /// A whole equivalence group, when any alternative will do.
    GroupHandleNode(GroupId),
}

impl Debug for OptExprNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorNode { operator, traits } => match traits {
                Some(traits) => write!(f, "OperatorNode: {:?} [{}]", operator, traits),
                None => write!(f, "OperatorNode: {:?}", operator),
            },
            ExprHandleNode(handle) => write!(f, "ExprHandleNode: {:?}", handle),
            GroupHandleNode(handle) => write!(f, "GroupHandleNode: {:?}", handle),
        }
    }
}

impl From<Operator> for OptExprNode {
    fn from(operator: Operator) -> Self {
        OperatorNode {
            operator,
            traits: None,
        }
    }
}

/// Optimizer expression tree matching a rule pattern. Used as input and
/// output of optimizer rules.
///
/// When used as input, the root is always an [`OptExprNode::ExprHandleNode`]
/// bound by the engine. When used as output, nodes created by the rule are
/// [`OptExprNode::OperatorNode`]s, while untouched subtrees are handles back
/// into the memo.
pub struct OptExpression {
    node: OptExprNode,
    inputs: OptExprVec,
}

impl Clone for OptExpression {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            inputs: self.inputs.clone(),
        }
    }
}

impl PartialEq for OptExpression {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.inputs == other.inputs
    }
}

impl OptExpression {
    pub fn new_builder<N: Into<OptExprNode>>(
        node: N,
    ) -> RootBuilder<Self, OptExprNode> {
        RootBuilder::new(node.into())
    }

    pub fn with_operator<I>(operator: Operator, inputs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self {
            node: OperatorNode {
                operator,
                traits: None,
            },
            inputs: inputs.into_iter().collect(),
        }
    }

    /// Creates an operator node carrying an explicit trait set, e.g. the
    /// target convention of a converter rule.
    pub fn with_operator_traits<I>(
        operator: Operator,
        traits: TraitSet,
        inputs: I,
    ) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self {
            node: OperatorNode {
                operator,
                traits: Some(traits),
            },
            inputs: inputs.into_iter().collect(),
        }
    }

    pub fn with_expr_handle<I>(handle: GroupExprId, inputs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self {
            node: ExprHandleNode(handle),
            inputs: inputs.into_iter().collect(),
        }
    }

    /// Creates an opt expression with group handle.
    ///
    /// Note that a group handle can only be a leaf node, so it never has
    /// inputs.
    pub fn with_group_handle(handle: GroupId) -> Self {
        Self {
            node: GroupHandleNode(handle),
            inputs: vec![],
        }
    }

    /// New abstract operator node reusing this expression's inputs.
    pub fn clone_with_inputs(&self, operator: Operator) -> Self {
        Self {
            node: OperatorNode {
                operator,
                traits: None,
            },
            inputs: self.inputs.clone(),
        }
    }

    pub fn inputs(&self) -> &[Self] {
        &self.inputs
    }

    pub fn node(&self) -> &OptExprNode {
        &self.node
    }

    pub fn get_operator<'a>(&'a self, ctx: &'a RuleContext) -> OptResult<&'a Operator> {
        match &self.node {
            ExprHandleNode(handle) => Ok(ctx.expr_at(*handle).operator()),
            OperatorNode { operator, .. } => Ok(operator),
            GroupHandleNode(_) => Err(OptError::internal(
                "can't get operator from group handle",
            )),
        }
    }

    /// Row type of this expression tree.
    ///
    /// Handles resolve to their group's fixed row type; operator nodes
    /// derive it from their inputs.
    pub fn row_type(&self, ctx: &RuleContext) -> OptResult<SchemaRef> {
        match &self.node {
            ExprHandleNode(handle) => Ok(ctx.group_at(handle.group_id()).row_type()),
            GroupHandleNode(handle) => Ok(ctx.group_at(*handle).row_type()),
            OperatorNode { operator, .. } => {
                let input_types = self
                    .inputs
                    .iter()
                    .map(|input| input.row_type(ctx))
                    .collect::<OptResult<Vec<SchemaRef>>>()?;
                operator.derive_row_type(&input_types)
            }
        }
    }
}

impl Debug for OptExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.format(f, 0)
    }
}

/// Creates a leaf opt expression from an operator.
impl From<Operator> for OptExpression {
    fn from(op: Operator) -> Self {
        OptExpression::with_operator(op, vec![])
    }
}

impl From<(OptExprNode, Vec<OptExpression>)> for OptExpression {
    fn from(t: (OptExprNode, Vec<OptExpression>)) -> Self {
        OptExpression {
            node: t.0,
            inputs: t.1,
        }
    }
}

impl OptExpression {
    fn format(&self, f: &mut Formatter<'_>, level: usize) -> std::fmt::Result {
        let prefix = if level > 0 {
            let mut buffer = String::with_capacity(2 * level);
            for _ in 0..(level - 1) {
                buffer.push_str("  ");
            }
            buffer.push_str("--");
            buffer
        } else {
            "".to_string()
        };

        writeln!(f, "{}{:?}", prefix, self.node)?;
        for input in &self.inputs {
            input.format(f, level + 1)?;
        }

        Ok(())
    }
}

/// Index of inputs.
impl Index<usize> for OptExpression {
    type Output = OptExpression;

    fn index(&self, index: usize) -> &Self::Output {
        &self.inputs[index]
    }
}
