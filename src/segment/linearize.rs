//! Linearizer: tagged tree → ordered segments
//!
//! flatten(leaf v)            = [[v]]
//! flatten(node v l r), v ≠ C = [v :: head(l) :: head(r)] ++ tail(l) ++ tail(r)
//! flatten(node v l r), v = C = [[v]] ++ flatten(l) ++ flatten(r)
//!
//! Implemented with explicit work stacks so that deep combs do not recurse.

use tracing::debug;

use super::{LTree, Segment, Tag, TaggedValue};
use crate::tree::Tree;

/// Flatten a tagged tree into its segment sequence.
pub fn flatten<V>(tree: Tree<TaggedValue<V>>) -> LTree<V> {
    let mut segments = Vec::new();
    // Roots of segments still to emit; popped in root-first, left-first order
    let mut pending = vec![tree];

    while let Some(root) = pending.pop() {
        let mut segment: Segment<V> = Vec::new();
        let mut deferred = Vec::new();
        let mut walk = vec![root];

        while let Some(subtree) = walk.pop() {
            match subtree.into_parts() {
                (entry, None) => segment.push(TaggedValue::leaf(entry.value)),
                (entry, Some((left, right))) => {
                    if entry.tag == Tag::Critical {
                        segment.push(entry);
                        deferred.push((left, right));
                    } else {
                        segment.push(TaggedValue::node(entry.value));
                        walk.push(right);
                        walk.push(left);
                    }
                }
            }
        }

        for (left, right) in deferred.into_iter().rev() {
            pending.push(right);
            pending.push(left);
        }
        segments.push(segment);
    }

    debug!(segments = segments.len(), "tree flattened");
    LTree::from_segments_unchecked(segments)
}
