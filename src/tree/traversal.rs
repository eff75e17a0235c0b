//! Sequential reference skeletons
//!
//! Plain recursive traversals. The distributed protocols must reproduce
//! these results exactly.

use super::Tree;
use crate::{Result, SkeletonError};

impl<V> Tree<V> {
    /// Apply `leaf` to leaf values and `node` to internal values.
    pub fn map<W>(&self, leaf: &impl Fn(&V) -> W, node: &impl Fn(&V) -> W) -> Tree<W> {
        match self.children() {
            None => Tree::Leaf(leaf(self.value())),
            Some((left, right)) => Tree::node(
                node(self.value()),
                left.map(leaf, node),
                right.map(leaf, node),
            ),
        }
    }

    /// Pair up two trees of identical shape.
    pub fn zip<W: Clone>(&self, other: &Tree<W>) -> Result<Tree<(V, W)>>
    where
        V: Clone,
    {
        let own = (self.value().clone(), other.value().clone());
        match (self.children(), other.children()) {
            (None, None) => Ok(Tree::Leaf(own)),
            (Some((al, ar)), Some((bl, br))) => Ok(Tree::node(own, al.zip(bl)?, ar.zip(br)?)),
            _ => Err(SkeletonError::ShapeMismatch(
                "trees differ in shape".to_string(),
            )),
        }
    }

    /// Bottom-up fold: leaves yield their value, nodes `k(left, value, right)`.
    pub fn reduce(&self, k: &impl Fn(&V, &V, &V) -> V) -> V
    where
        V: Clone,
    {
        match self.children() {
            None => self.value().clone(),
            Some((left, right)) => k(&left.reduce(k), self.value(), &right.reduce(k)),
        }
    }

    /// Replace every value with the reduction of its subtree.
    pub fn uacc(&self, k: &impl Fn(&V, &V, &V) -> V) -> Tree<V>
    where
        V: Clone,
    {
        match self.children() {
            None => Tree::Leaf(self.value().clone()),
            Some((left, right)) => {
                let left = left.uacc(k);
                let right = right.uacc(k);
                let own = k(left.value(), self.value(), right.value());
                Tree::node(own, left, right)
            }
        }
    }

    /// Top-down accumulation: the root receives `c`; the children of a node
    /// holding `acc` receive `gl(acc, value)` and `gr(acc, value)`.
    pub fn dacc<C: Clone>(
        &self,
        c: C,
        gl: &impl Fn(&C, &V) -> C,
        gr: &impl Fn(&C, &V) -> C,
    ) -> Tree<C> {
        match self.children() {
            None => Tree::Leaf(c),
            Some((left, right)) => {
                let to_left = gl(&c, self.value());
                let to_right = gr(&c, self.value());
                Tree::node(c, left.dacc(to_left, gl, gr), right.dacc(to_right, gl, gr))
            }
        }
    }
}
