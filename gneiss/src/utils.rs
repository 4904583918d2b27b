/// A utility builder for tree-like data structures.
///
/// See [`crate::rules::Pattern`] and [`crate::rules::OptExpression`].
pub trait TreeBuilder: Sized {
    type Node;
    type Tree: From<(Self::Node, Vec<Self::Tree>)>;
    type Output;

    /// Opens a child node; the matching [`end`] attaches it to its parent.
    ///
    /// [`end`]: TreeBuilder::end
    fn begin<K: Into<Self::Node>>(self, node: K) -> NonRootBuilder<Self> {
        NonRootBuilder {
            parent: self,
            node: node.into(),
            children: vec![],
        }
    }

    /// Attaches a childless node.
    fn leaf<K: Into<Self::Node>>(self, node: K) -> Self {
        let tree = Self::Tree::from((node.into(), vec![]));
        self.add_child(tree)
    }

    fn end(self) -> Self::Output;

    fn add_child(self, tree: Self::Tree) -> Self;
}

pub struct RootBuilder<T, N> {
    node: N,
    children: Vec<T>,
}

impl<T, N> RootBuilder<T, N> {
    pub fn new(node: N) -> Self {
        Self {
            node,
            children: vec![],
        }
    }
}

impl<T, N> TreeBuilder for RootBuilder<T, N>
where
    T: From<(N, Vec<T>)>,
{
    type Node = N;
    type Tree = T;
    type Output = T;

    fn end(self) -> T {
        T::from((self.node, self.children))
    }

    fn add_child(mut self, tree: T) -> Self {
        self.children.push(tree);
        self
    }
}

pub struct NonRootBuilder<P: TreeBuilder> {
    parent: P,
    node: P::Node,
    children: Vec<P::Tree>,
}

impl<P: TreeBuilder> TreeBuilder for NonRootBuilder<P> {
    type Node = P::Node;
    type Tree = P::Tree;
    type Output = P;

    fn end(self) -> P {
        let tree = P::Tree::from((self.node, self.children));
        self.parent.add_child(tree)
    }

    fn add_child(mut self, tree: P::Tree) -> Self {
        self.children.push(tree);
        self
    }
}
