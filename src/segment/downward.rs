//! Downward accumulation over one segment
//!
//! `dacc_path` composes the path steps from a segment's root down to its
//! Critical node, yielding what the two child segments need on top of the
//! accumulator arriving at this segment's root. `dacc_global` pushes the
//! seed through the meta-segment; `dacc_local` is the plain top-down pass.

use super::{has_critical, Summary, Tag, TaggedValue};
use crate::{algebra::DownwardCombiner, Result, SkeletonError};

/// Composed path steps to a Critical node's left and right children
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathPair<D> {
    /// Steps from the segment root into the Critical node's left child
    pub to_left: D,
    /// Steps from the segment root into the Critical node's right child
    pub to_right: D,
}

/// Summary shipped by the downward pass: open segments carry their path pair.
pub type PathSummary<D> = Summary<(), PathPair<D>>;

/// Compose the path from the segment root to its Critical node.
///
/// Fails with `Precondition` when the segment has no Critical node.
pub fn dacc_path<A, C, D>(
    segment: &[TaggedValue<A>],
    combiner: &DownwardCombiner<A, C, D>,
) -> Result<PathPair<D>> {
    if segment.is_empty() {
        return Err(SkeletonError::EmptyInput("segment has no values"));
    }
    let mut depth = 0usize;
    let mut cursor: Option<usize> = None;
    let mut pair: Option<PathPair<D>> = None;

    for (position, entry) in segment.iter().enumerate().rev() {
        match entry.tag {
            Tag::Leaf => {
                depth += 1;
                cursor = cursor.map(|d| d + 1);
            }
            Tag::Critical => {
                if cursor.is_some() {
                    return Err(SkeletonError::IllFormed {
                        position,
                        reason: "more than one Critical node in segment",
                    });
                }
                depth += 1;
                cursor = Some(0);
                pair = Some(PathPair {
                    to_left: combiner.phi_l(&entry.value),
                    to_right: combiner.phi_r(&entry.value),
                });
            }
            Tag::Node => {
                if depth < 2 {
                    return Err(SkeletonError::IllFormed {
                        position,
                        reason: "node has fewer than two operands",
                    });
                }
                depth -= 1;
                let step = match cursor {
                    Some(0) => Some(combiner.phi_l(&entry.value)),
                    Some(1) => {
                        cursor = Some(0);
                        Some(combiner.phi_r(&entry.value))
                    }
                    Some(d) => {
                        cursor = Some(d - 1);
                        None
                    }
                    None => None,
                };
                if let (Some(step), Some(current)) = (step, pair.as_mut()) {
                    current.to_left = combiner.psi_u(&step, &current.to_left);
                    current.to_right = combiner.psi_u(&step, &current.to_right);
                }
            }
        }
    }
    if depth != 1 {
        return Err(SkeletonError::IllFormed {
            position: 0,
            reason: "segment does not reduce to a single value",
        });
    }
    pair.ok_or_else(|| {
        SkeletonError::Precondition("path composition needs a Critical node".to_string())
    })
}

/// Summary for the gather phase: Critical-free segments only forward their presence.
pub fn dacc_summary<A, C, D>(
    segment: &[TaggedValue<A>],
    combiner: &DownwardCombiner<A, C, D>,
) -> Result<PathSummary<D>> {
    if has_critical(segment) {
        Ok(Summary::Open(dacc_path(segment, combiner)?))
    } else if segment.is_empty() {
        Err(SkeletonError::EmptyInput("segment has no values"))
    } else {
        Ok(Summary::Closed(()))
    }
}

/// Seed every segment root by pushing `seed` through the meta-segment.
pub fn dacc_global<A, C: Clone, D>(
    summaries: &[PathSummary<D>],
    combiner: &DownwardCombiner<A, C, D>,
    seed: C,
) -> Result<Vec<C>> {
    if summaries.is_empty() {
        return Err(SkeletonError::EmptyInput("meta-segment has no summaries"));
    }
    let mut stack = vec![seed];
    let mut roots = Vec::with_capacity(summaries.len());
    for (position, summary) in summaries.iter().enumerate() {
        let acc = stack.pop().ok_or(SkeletonError::IllFormed {
            position,
            reason: "meta-segment has more segments than open holes",
        })?;
        if let Summary::Open(pair) = summary {
            stack.push(combiner.psi_d(&acc, &pair.to_right));
            stack.push(combiner.psi_d(&acc, &pair.to_left));
        }
        roots.push(acc);
    }
    if !stack.is_empty() {
        return Err(SkeletonError::IllFormed {
            position: summaries.len(),
            reason: "meta-segment ends with unfilled holes",
        });
    }
    Ok(roots)
}

/// Top-down pass over one segment starting from its root accumulator.
pub fn dacc_local<A, C: Clone, D>(
    segment: &[TaggedValue<A>],
    combiner: &DownwardCombiner<A, C, D>,
    seed: C,
) -> Result<Vec<C>> {
    if segment.is_empty() {
        return Err(SkeletonError::EmptyInput("segment has no values"));
    }
    let mut stack = vec![seed];
    let mut out = Vec::with_capacity(segment.len());
    for (position, entry) in segment.iter().enumerate() {
        let acc = stack.pop().ok_or(SkeletonError::IllFormed {
            position,
            reason: "segment continues past its root subtree",
        })?;
        if entry.tag == Tag::Node {
            stack.push(combiner.gr(&acc, &entry.value));
            stack.push(combiner.gl(&acc, &entry.value));
        }
        out.push(acc);
    }
    if !stack.is_empty() {
        return Err(SkeletonError::IllFormed {
            position: segment.len(),
            reason: "segment ends before its subtree is complete",
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra;

    fn entries(tags: &[Tag]) -> Vec<TaggedValue<i64>> {
        tags.iter().map(|tag| TaggedValue::new(0, *tag)).collect()
    }

    #[test]
    fn test_path_through_left_then_right() {
        // node(node(leaf, critical), leaf): root → left → right child is Critical
        let segment = entries(&[Tag::Node, Tag::Node, Tag::Leaf, Tag::Critical, Tag::Leaf]);
        let pair = dacc_path(&segment, &algebra::left_turns()).unwrap();
        // One left turn to reach the Critical node, plus one into its left child
        assert_eq!(pair, PathPair { to_left: 2, to_right: 1 });

        let pair = dacc_path(&segment, &algebra::depth()).unwrap();
        assert_eq!(pair, PathPair { to_left: 3, to_right: 3 });
    }

    #[test]
    fn test_path_requires_critical() {
        let segment = entries(&[Tag::Node, Tag::Leaf, Tag::Leaf]);
        assert!(matches!(
            dacc_path(&segment, &algebra::depth()),
            Err(SkeletonError::Precondition(_))
        ));
        assert_eq!(
            dacc_summary(&segment, &algebra::depth()).unwrap(),
            Summary::Closed(())
        );
    }

    #[test]
    fn test_global_seeds_children_left_first() {
        let combiner = algebra::depth::<i64>();
        let summaries = vec![
            Summary::Open(PathPair { to_left: 1, to_right: 1 }),
            Summary::Open(PathPair { to_left: 1, to_right: 1 }),
            Summary::Closed(()),
            Summary::Closed(()),
            Summary::Closed(()),
        ];
        assert_eq!(
            dacc_global(&summaries, &combiner, 0).unwrap(),
            vec![0, 1, 2, 2, 1]
        );
    }

    #[test]
    fn test_global_rejects_unfilled_holes() {
        let combiner = algebra::depth::<i64>();
        let summaries = vec![Summary::Open(PathPair { to_left: 1, to_right: 1 })];
        assert!(dacc_global(&summaries, &combiner, 0).is_err());
    }

    #[test]
    fn test_local_preorder() {
        let segment = entries(&[Tag::Node, Tag::Node, Tag::Leaf, Tag::Critical, Tag::Leaf]);
        let depths = dacc_local(&segment, &algebra::depth(), 4).unwrap();
        assert_eq!(depths, vec![4, 5, 6, 6, 5]);
    }
}
