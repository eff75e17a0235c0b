//! Binary tree ADT
//!
//! Values live at both leaves and internal nodes. Every internal node has
//! exactly two children, so node counts are always odd.
//!
//! The tree is only consumed at load time (tagging and linearization); the
//! sequential skeletons in `traversal` serve as the reference the
//! distributed protocols are checked against.

pub mod tagger;
mod traversal;

use std::fmt;

use crate::segment::{self, LTree};

/// Binary tree with values at every position
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tree<V> {
    /// Leaf value
    Leaf(V),
    /// Internal value with its left and right subtrees
    Node(V, Branches<V>),
}

/// Owned left and right subtrees of an internal node
///
/// Released with an explicit stack, so dropping a deep comb does not
/// recurse once per level.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Branches<V>(Option<Box<(Tree<V>, Tree<V>)>>);

impl<V> Branches<V> {
    fn new(left: Tree<V>, right: Tree<V>) -> Self {
        Branches(Some(Box::new((left, right))))
    }

    /// Borrow both subtrees.
    pub fn pair(&self) -> Option<(&Tree<V>, &Tree<V>)> {
        self.0.as_deref().map(|(left, right)| (left, right))
    }

    fn into_pair(mut self) -> Option<(Tree<V>, Tree<V>)> {
        self.0.take().map(|pair| *pair)
    }
}

impl<V> Drop for Branches<V> {
    fn drop(&mut self) {
        let mut stack: Vec<Box<(Tree<V>, Tree<V>)>> = self.0.take().into_iter().collect();
        while let Some(mut pair) = stack.pop() {
            let (left, right) = &mut *pair;
            for child in [left, right] {
                if let Tree::Node(_, branches) = child {
                    stack.extend(branches.0.take());
                }
            }
        }
    }
}

impl<V> Tree<V> {
    /// Leaf constructor.
    pub fn leaf(value: V) -> Self {
        Tree::Leaf(value)
    }

    /// Internal node constructor.
    pub fn node(value: V, left: Tree<V>, right: Tree<V>) -> Self {
        Tree::Node(value, Branches::new(left, right))
    }

    /// Value stored at the root.
    pub fn value(&self) -> &V {
        match self {
            Tree::Leaf(value) | Tree::Node(value, _) => value,
        }
    }

    /// Left and right subtrees, if any.
    pub fn children(&self) -> Option<(&Tree<V>, &Tree<V>)> {
        match self {
            Tree::Leaf(_) => None,
            Tree::Node(_, branches) => branches.pair(),
        }
    }

    /// Split into the root value and the owned subtrees.
    pub fn into_parts(self) -> (V, Option<(Tree<V>, Tree<V>)>) {
        match self {
            Tree::Leaf(value) => (value, None),
            Tree::Node(value, branches) => (value, branches.into_pair()),
        }
    }

    /// Node count.
    pub fn size(&self) -> usize {
        let mut count = 0usize;
        let mut walk = vec![self];
        while let Some(tree) = walk.pop() {
            count += 1;
            if let Some((left, right)) = tree.children() {
                walk.push(left);
                walk.push(right);
            }
        }
        count
    }

    /// Edges on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0usize;
        let mut walk = vec![(self, 0usize)];
        while let Some((tree, depth)) = walk.pop() {
            match tree.children() {
                Some((left, right)) => {
                    walk.push((left, depth + 1));
                    walk.push((right, depth + 1));
                }
                None => height = height.max(depth),
            }
        }
        height
    }

    /// Values in pre-order.
    pub fn preorder(&self) -> Vec<&V> {
        let mut out = Vec::with_capacity(self.size());
        let mut walk = vec![self];
        while let Some(tree) = walk.pop() {
            out.push(tree.value());
            if let Some((left, right)) = tree.children() {
                walk.push(right);
                walk.push(left);
            }
        }
        out
    }

    /// Balanced tree with `nodes` nodes (rounded down to odd), values by pre-order index.
    pub fn balanced(nodes: usize, mut value: impl FnMut(usize) -> V) -> Self {
        let nodes = odd_at_most(nodes);
        let mut next = 0usize;
        build_balanced(nodes, &mut next, &mut value)
    }

    /// Ill-balanced tree whose internal nodes all hang off the left spine.
    pub fn left_comb(nodes: usize, mut value: impl FnMut(usize) -> V) -> Self {
        let internal = odd_at_most(nodes) / 2;
        let mut index = 0usize;
        let mut take = || {
            let v = value(index);
            index += 1;
            v
        };
        let mut spine: Vec<V> = (0..internal).map(|_| take()).collect();
        let mut tree = Tree::Leaf(take());
        while let Some(parent) = spine.pop() {
            tree = Tree::node(parent, tree, Tree::Leaf(take()));
        }
        tree
    }

    /// Ill-balanced tree whose internal nodes all hang off the right spine.
    pub fn right_comb(nodes: usize, mut value: impl FnMut(usize) -> V) -> Self {
        let internal = odd_at_most(nodes) / 2;
        let mut spine = Vec::with_capacity(internal);
        let mut index = 0usize;
        for _ in 0..internal {
            let parent = value(index);
            let leaf = value(index + 1);
            index += 2;
            spine.push((parent, leaf));
        }
        let mut tree = Tree::Leaf(value(index));
        while let Some((parent, leaf)) = spine.pop() {
            tree = Tree::node(parent, Tree::Leaf(leaf), tree);
        }
        tree
    }

    /// Arbitrary shape steered by `splits`: each internal node takes the
    /// next split to choose its left subtree size. Values by pre-order index.
    pub fn from_splits(nodes: usize, splits: &[usize], mut value: impl FnMut(usize) -> V) -> Self {
        let nodes = odd_at_most(nodes);
        let mut cursor = 0usize;
        let mut next = 0usize;
        build_split(nodes, splits, &mut cursor, &mut next, &mut value)
    }

    /// Tag with bound `m` and flatten into segments.
    pub fn linearize(&self, bound: usize) -> crate::Result<LTree<V>>
    where
        V: Clone,
    {
        Ok(segment::flatten(tagger::tag(self, bound)?))
    }
}

fn odd_at_most(nodes: usize) -> usize {
    if nodes <= 1 {
        1
    } else if nodes % 2 == 0 {
        nodes - 1
    } else {
        nodes
    }
}

fn build_balanced<V>(nodes: usize, next: &mut usize, value: &mut impl FnMut(usize) -> V) -> Tree<V> {
    let own = value(*next);
    *next += 1;
    if nodes == 1 {
        return Tree::Leaf(own);
    }
    let rest = nodes - 1;
    let half = rest / 2;
    let left_nodes = if half % 2 == 1 { half } else { half - 1 };
    let left = build_balanced(left_nodes, next, value);
    let right = build_balanced(rest - left_nodes, next, value);
    Tree::node(own, left, right)
}

fn build_split<V>(
    nodes: usize,
    splits: &[usize],
    cursor: &mut usize,
    next: &mut usize,
    value: &mut impl FnMut(usize) -> V,
) -> Tree<V> {
    let own = value(*next);
    *next += 1;
    if nodes == 1 {
        return Tree::Leaf(own);
    }
    // Left subtree sizes available: 1, 3, ..., nodes - 2
    let choices = (nodes - 1) / 2;
    let pick = if splits.is_empty() {
        choices / 2
    } else {
        splits[*cursor % splits.len()] % choices
    };
    *cursor += 1;
    let left_nodes = 2 * pick + 1;
    let left = build_split(left_nodes, splits, cursor, next, value);
    let right = build_split(nodes - 1 - left_nodes, splits, cursor, next, value);
    Tree::node(own, left, right)
}

impl<V: fmt::Display> fmt::Display for Tree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.children() {
            None => write!(f, "leaf({})", self.value()),
            Some((left, right)) => write!(f, "node({}, {}, {})", self.value(), left, right),
        }
    }
}

impl<V: PartialEq> PartialEq for Tree<V> {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.value() != b.value() {
                return false;
            }
            match (a.children(), b.children()) {
                (None, None) => {}
                (Some((al, ar)), Some((bl, br))) => {
                    pending.push((ar, br));
                    pending.push((al, bl));
                }
                _ => return false,
            }
        }
        true
    }
}

impl<V: Eq> Eq for Tree<V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_shape() {
        let tree = Tree::balanced(15, |i| i);
        assert_eq!(tree.size(), 15);
        assert_eq!(tree.height(), 3);
        let order: Vec<usize> = tree.preorder().into_iter().copied().collect();
        assert_eq!(order, (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_even_sizes_round_down() {
        assert_eq!(Tree::balanced(10, |_| ()).size(), 9);
        assert_eq!(Tree::balanced(0, |_| ()).size(), 1);
    }

    #[test]
    fn test_combs_are_linear() {
        let left = Tree::left_comb(21, |i| i);
        let right = Tree::right_comb(21, |i| i);
        assert_eq!(left.size(), 21);
        assert_eq!(right.size(), 21);
        assert_eq!(left.height(), 10);
        assert_eq!(right.height(), 10);
        let order: Vec<usize> = right.preorder().into_iter().copied().collect();
        assert_eq!(order, (0..21).collect::<Vec<_>>());
    }

    #[test]
    fn test_splits_respect_size() {
        for seed in 0..20usize {
            let splits = vec![seed, seed * 7 + 3, seed * 13 + 1];
            let tree = Tree::from_splits(41, &splits, |i| i);
            assert_eq!(tree.size(), 41);
        }
    }

    #[test]
    fn test_shape_differences_not_equal() {
        let tree = Tree::node(1, Tree::leaf(2), Tree::leaf(3));
        assert_ne!(tree, Tree::leaf(1));
        assert_ne!(tree, Tree::node(1, Tree::leaf(2), Tree::leaf(4)));
        assert_eq!(tree.clone(), tree);
    }

    #[test]
    fn test_into_parts() {
        let (value, children) = Tree::node(1, Tree::leaf(2), Tree::leaf(3)).into_parts();
        assert_eq!(value, 1);
        assert_eq!(children, Some((Tree::leaf(2), Tree::leaf(3))));
        assert_eq!(Tree::leaf(4).into_parts(), (4, None));
    }

    #[test]
    fn test_deep_comb_on_small_stack() {
        // 256 KiB is far below what one frame per level would need
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let tree = Tree::left_comb(200_001, |i| i as u32);
                let same = Tree::left_comb(200_001, |i| i as u32);
                (tree.size(), tree.height(), tree == same)
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), (200_001, 100_000, true));
    }

    #[test]
    fn test_display() {
        let tree = Tree::node(1, Tree::leaf(2), Tree::leaf(3));
        assert_eq!(tree.to_string(), "node(1, leaf(2), leaf(3))");
    }
}
