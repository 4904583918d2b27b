use crate::operator::Operator;
use crate::traits::Convention;
use crate::utils::RootBuilder;

pub type OperatorMatcher = fn(&Operator) -> bool;

pub fn any(_: &Operator) -> bool {
    true
}

/// Matcher plus optional convention pin of one pattern node.
#[derive(Clone, Copy)]
pub struct PatternNode {
    pub predict: OperatorMatcher,
    /// Convention the matched expression must currently carry, if pinned.
    pub convention: Option<Convention>,
}

impl From<OperatorMatcher> for PatternNode {
    fn from(predict: OperatorMatcher) -> Self {
        PatternNode {
            predict,
            convention: None,
        }
    }
}

/// Pattern node matching an abstract (convention `NONE`) operator.
pub fn abstract_node(predict: OperatorMatcher) -> PatternNode {
    PatternNode {
        predict,
        convention: Some(Convention::NONE),
    }
}

/// Pattern node matching any operator currently in `convention`.
pub fn in_convention(convention: Convention) -> PatternNode {
    PatternNode {
        predict: any,
        convention: Some(convention),
    }
}

/// A pattern defines the shape of sub plans a rule operates on.
///
/// If we want to match `Join(Filter, Scan)`, the pattern tree is built like:
/// ```
/// use gneiss::operator::Operator;
/// use gneiss::rules::{abstract_node, any, Pattern};
/// use gneiss::utils::TreeBuilder;
///
/// Pattern::new_builder(abstract_node(|op| matches!(op, Operator::Join(_))))
///     .begin(abstract_node(|op| matches!(op, Operator::Filter(_))))
///         .leaf(any as gneiss::rules::OperatorMatcher)
///     .end()
///     .leaf(abstract_node(|op| matches!(op, Operator::Scan(_))))
/// .end();
/// ```
///
/// The root node matches the `Join` operator, the first child matches
/// `Filter`, and the last matches `Scan`. A node without children matches
/// regardless of what is below it.
pub struct Pattern {
    pub predict: OperatorMatcher,
    pub convention: Option<Convention>,
    /// `None` for leaf node.
    pub children: Option<Vec<Pattern>>,
}

impl Pattern {
    pub fn new_leaf<N: Into<PatternNode>>(node: N) -> Pattern {
        let node = node.into();
        Pattern {
            predict: node.predict,
            convention: node.convention,
            children: None,
        }
    }

    pub fn new<N, I>(node: N, children: I) -> Pattern
    where
        N: Into<PatternNode>,
        I: IntoIterator<Item = Pattern>,
    {
        let node = node.into();
        let children = children.into_iter().collect::<Vec<Pattern>>();
        let children = if !children.is_empty() {
            Some(children)
        } else {
            None
        };

        Pattern {
            predict: node.predict,
            convention: node.convention,
            children,
        }
    }

    /// Pattern of a converter rule: any expression currently in `convention`.
    pub fn converting(convention: Convention) -> Pattern {
        Pattern::new_leaf(in_convention(convention))
    }

    pub fn new_builder<N: Into<PatternNode>>(node: N) -> RootBuilder<Pattern, PatternNode> {
        RootBuilder::new(node.into())
    }
}

impl From<(PatternNode, Vec<Pattern>)> for Pattern {
    fn from(t: (PatternNode, Vec<Pattern>)) -> Self {
        Pattern::new(t.0, t.1)
    }
}

#[cfg(test)]
mod tests {
    use crate::operator::Operator;
    use crate::rules::{abstract_node, any, OperatorMatcher, Pattern};
    use crate::traits::Convention;
    use crate::utils::TreeBuilder;

    #[test]
    fn test_build_pattern() {
        let pattern = Pattern::new_builder(abstract_node(|op| {
            matches!(op, Operator::Join(_))
        }))
        .begin(abstract_node(|op| matches!(op, Operator::Filter(_))))
            .leaf(any as OperatorMatcher)
        .end()
        .leaf(abstract_node(|op| matches!(op, Operator::Scan(_))))
        .end();

        let children = pattern.children.as_ref().unwrap();
        assert_eq!(2, children.len());
        assert_eq!(Some(Convention::NONE), pattern.convention);
        assert!(children[0].children.is_some());
        assert!(children[1].children.is_none());
    }

    #[test]
    fn test_converting_pattern() {
        let pattern = Pattern::converting(Convention::new("ROW"));
        assert_eq!(Some(Convention::new("ROW")), pattern.convention);
        assert!(pattern.children.is_none());
    }
}
