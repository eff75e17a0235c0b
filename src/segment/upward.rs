//! Upward accumulation over one segment
//!
//! Three phases: `uacc_local` runs the reduction scan and keeps every
//! position's result, leaving the positions on the path to the Critical node
//! unresolved; `uacc_global` recovers, for every open segment, the complete
//! values of its Critical node's two children; `uacc_update` rescans with
//! those values and fills the unresolved positions with plain `k`.

use super::{
    reduce::{pop_pair, scan, single},
    Summary, Tag, TaggedValue,
};
use crate::{algebra::ReduceCombiner, Result, SkeletonError};

/// Result of the local upward pass over one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialAccumulation<A, C> {
    /// Segment summary (same as `reduce_local`)
    pub summary: Summary<A, C>,
    /// Per-position results; `None` where the subtree contains the Critical node
    pub resolved: Vec<Option<A>>,
}

/// Local upward pass.
pub fn uacc_local<A: Clone, C>(
    segment: &[TaggedValue<A>],
    combiner: &ReduceCombiner<A, C>,
) -> Result<PartialAccumulation<A, C>> {
    let mut resolved: Vec<Option<A>> = vec![None; segment.len()];
    let summary = scan(segment, combiner, |position, entry| {
        if let Summary::Closed(value) = entry {
            resolved[position] = Some(value.clone());
        }
    })?;
    Ok(PartialAccumulation { summary, resolved })
}

/// Global upward pass over the meta-segment.
///
/// Returns, per summary, the complete values of the Critical node's left and
/// right children (`None` for closed summaries).
pub fn uacc_global<A: Clone, C>(
    summaries: &[Summary<A, C>],
    combiner: &ReduceCombiner<A, C>,
) -> Result<Vec<Option<(A, A)>>> {
    if summaries.is_empty() {
        return Err(SkeletonError::EmptyInput("meta-segment has no summaries"));
    }
    let mut corrections: Vec<Option<(A, A)>> = vec![None; summaries.len()];
    let mut stack: Vec<A> = Vec::with_capacity(summaries.len());
    for (position, summary) in summaries.iter().enumerate().rev() {
        match summary {
            Summary::Closed(value) => stack.push(value.clone()),
            Summary::Open(context) => {
                let (left, right) = pop_pair(&mut stack, position)?;
                stack.push(combiner.psi_n(&left, context, &right));
                corrections[position] = Some((left, right));
            }
        }
    }
    single(stack)?;
    Ok(corrections)
}

/// Finish one segment with its Critical node's children values.
pub fn uacc_update<A: Clone, C>(
    segment: &[TaggedValue<A>],
    partial: Vec<Option<A>>,
    combiner: &ReduceCombiner<A, C>,
    correction: Option<&(A, A)>,
) -> Result<Vec<A>> {
    if partial.len() != segment.len() {
        return Err(SkeletonError::ShapeMismatch(format!(
            "partial accumulation has {} positions, segment has {}",
            partial.len(),
            segment.len()
        )));
    }
    let mut out: Vec<Option<A>> = partial;
    let mut stack: Vec<A> = Vec::with_capacity(segment.len());

    for (position, entry) in segment.iter().enumerate().rev() {
        let value = match entry.tag {
            Tag::Leaf => entry.value.clone(),
            Tag::Node => {
                let (left, right) = pop_pair(&mut stack, position)?;
                match out[position].take() {
                    Some(done) => done,
                    None => combiner.k(&left, &entry.value, &right),
                }
            }
            Tag::Critical => {
                let (left, right) = correction.ok_or_else(|| {
                    SkeletonError::Precondition(
                        "segment has a Critical node but no child values were supplied".to_string(),
                    )
                })?;
                combiner.k(left, &entry.value, right)
            }
        };
        out[position] = Some(value.clone());
        stack.push(value);
    }
    single(stack)?;

    out.into_iter()
        .enumerate()
        .map(|(position, value)| {
            value.ok_or(SkeletonError::IllFormed {
                position,
                reason: "position left unresolved after update",
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra;

    fn ones(tags: &[Tag]) -> Vec<TaggedValue<i64>> {
        tags.iter().map(|tag| TaggedValue::new(1, *tag)).collect()
    }

    #[test]
    fn test_local_leaves_path_unresolved() {
        let segment = ones(&[Tag::Node, Tag::Node, Tag::Leaf, Tag::Critical, Tag::Leaf]);
        let partial = uacc_local(&segment, &algebra::sum()).unwrap();
        assert!(partial.summary.is_open());
        assert_eq!(partial.resolved, vec![None, None, Some(1), None, Some(1)]);
    }

    #[test]
    fn test_update_fills_path() {
        let combiner = algebra::sum();
        let segment = ones(&[Tag::Node, Tag::Node, Tag::Leaf, Tag::Critical, Tag::Leaf]);
        let partial = uacc_local(&segment, &combiner).unwrap();
        // Critical's children are subtrees of 3 and 1 nodes
        let done = uacc_update(&segment, partial.resolved, &combiner, Some(&(3, 1))).unwrap();
        assert_eq!(done, vec![9, 7, 1, 5, 1]);
    }

    #[test]
    fn test_global_corrections_follow_meta_order() {
        let combiner = algebra::sum();
        // [1^C], [2^C], [3^L], [4^L], [5^L] counted as ones
        let summaries = vec![
            Summary::Open(1i64),
            Summary::Open(1),
            Summary::Closed(1),
            Summary::Closed(1),
            Summary::Closed(1),
        ];
        let corrections = uacc_global(&summaries, &combiner).unwrap();
        assert_eq!(
            corrections,
            vec![Some((3, 1)), Some((1, 1)), None, None, None]
        );
    }

    #[test]
    fn test_update_without_correction_fails() {
        let combiner = algebra::sum();
        let segment = ones(&[Tag::Critical]);
        let partial = uacc_local(&segment, &combiner).unwrap();
        assert!(matches!(
            uacc_update(&segment, partial.resolved, &combiner, None),
            Err(SkeletonError::Precondition(_))
        ));
    }

    #[test]
    fn test_critical_free_segment_fully_resolved() {
        let combiner = algebra::sum();
        let segment = ones(&[Tag::Node, Tag::Leaf, Tag::Leaf]);
        let partial = uacc_local(&segment, &combiner).unwrap();
        assert_eq!(partial.summary, Summary::Closed(3));
        let done = uacc_update(&segment, partial.resolved, &combiner, None).unwrap();
        assert_eq!(done, vec![3, 1, 1]);
    }
}
