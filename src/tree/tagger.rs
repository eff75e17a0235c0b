//! Size-based tagging
//!
//! A node of size s with children of sizes ls, rs is Critical iff
//! ⌈s/m⌉ > ⌈ls/m⌉ and ⌈s/m⌉ > ⌈rs/m⌉. Crossing a multiple of m therefore
//! only ever happens at a Critical node, which bounds segment length by ~m.

use super::Tree;
use crate::{
    segment::{
        reduce::{pop_pair, single},
        Tag, TaggedValue,
    },
    Result, SkeletonError,
};

/// Tag every position of `tree` for bound `m`.
pub fn tag<V: Clone>(tree: &Tree<V>, bound: usize) -> Result<Tree<TaggedValue<V>>> {
    if bound == 0 {
        return Err(SkeletonError::InvalidConfig(
            "segment bound must be > 0".to_string(),
        ));
    }
    tag_sized(tree, bound)
}

/// Whether a node with the given sizes crosses a bound boundary against both children.
#[inline]
pub fn is_critical(size: usize, left: usize, right: usize, bound: usize) -> bool {
    let blocks = size.div_ceil(bound);
    blocks > left.div_ceil(bound) && blocks > right.div_ceil(bound)
}

enum Visit<'a, V> {
    Enter(&'a Tree<V>),
    Exit(&'a V),
}

// Post-order over an explicit stack; finished subtrees wait on `done` with
// the left one on top.
fn tag_sized<V: Clone>(tree: &Tree<V>, bound: usize) -> Result<Tree<TaggedValue<V>>> {
    let mut visits = vec![Visit::Enter(tree)];
    let mut done: Vec<(Tree<TaggedValue<V>>, usize)> = Vec::new();

    while let Some(visit) = visits.pop() {
        match visit {
            Visit::Enter(subtree) => match subtree.children() {
                None => done.push((Tree::Leaf(TaggedValue::leaf(subtree.value().clone())), 1)),
                Some((left, right)) => {
                    visits.push(Visit::Exit(subtree.value()));
                    visits.push(Visit::Enter(left));
                    visits.push(Visit::Enter(right));
                }
            },
            Visit::Exit(value) => {
                let position = done.len();
                let ((left, left_size), (right, right_size)) = pop_pair(&mut done, position)?;
                let size = 1 + left_size + right_size;
                let tag = if is_critical(size, left_size, right_size, bound) {
                    Tag::Critical
                } else {
                    Tag::Node
                };
                done.push((
                    Tree::node(TaggedValue::new(value.clone(), tag), left, right),
                    size,
                ));
            }
        }
    }

    single(done).map(|(tagged, _)| tagged)
}
