//! Stack-machine reduction over one segment
//!
//! Right-to-left scan with a stack and a cursor `d` counting how many
//! complete values sit above the open context (`None` until a Critical node
//! has been seen):
//!
//! - Leaf v:     push v, d += 1
//! - Node b:     pop l, pop r (l is on top)
//!               d = 0  → push ψl(l, φ(b), r)         the context is the left child
//!               d = 1  → push ψr(l, φ(b), r), d = 0  the context is the right child
//!               else   → push k(l, b, r), d -= 1
//! - Critical b: push φ(b), d = 0

use super::{Summary, Tag, TaggedValue};
use crate::{algebra::ReduceCombiner, Result, SkeletonError};

/// Reduce one segment to its summary.
pub fn reduce_local<A: Clone, C>(
    segment: &[TaggedValue<A>],
    combiner: &ReduceCombiner<A, C>,
) -> Result<Summary<A, C>> {
    scan(segment, combiner, |_, _| {})
}

/// Reduce the gathered meta-segment, filling every open summary with the two
/// complete subtrees that follow it.
pub fn reduce_global<A: Clone, C>(
    summaries: &[Summary<A, C>],
    combiner: &ReduceCombiner<A, C>,
) -> Result<A> {
    if summaries.is_empty() {
        return Err(SkeletonError::EmptyInput("meta-segment has no summaries"));
    }
    let mut stack: Vec<A> = Vec::with_capacity(summaries.len());
    for (position, summary) in summaries.iter().enumerate().rev() {
        match summary {
            Summary::Closed(value) => stack.push(value.clone()),
            Summary::Open(context) => {
                let (left, right) = pop_pair(&mut stack, position)?;
                stack.push(combiner.psi_n(&left, context, &right));
            }
        }
    }
    single(stack)
}

/// Shared scan: `record(position, &entry)` sees each position's in-progress result.
pub(crate) fn scan<A: Clone, C>(
    segment: &[TaggedValue<A>],
    combiner: &ReduceCombiner<A, C>,
    mut record: impl FnMut(usize, &Summary<A, C>),
) -> Result<Summary<A, C>> {
    if segment.is_empty() {
        return Err(SkeletonError::EmptyInput("segment has no values"));
    }
    let mut stack: Vec<Summary<A, C>> = Vec::with_capacity(segment.len());
    let mut cursor: Option<usize> = None;

    for (position, entry) in segment.iter().enumerate().rev() {
        let result = match entry.tag {
            Tag::Leaf => {
                cursor = cursor.map(|d| d + 1);
                Summary::Closed(entry.value.clone())
            }
            Tag::Critical => {
                if cursor.is_some() {
                    return Err(SkeletonError::IllFormed {
                        position,
                        reason: "more than one Critical node in segment",
                    });
                }
                cursor = Some(0);
                Summary::Open(combiner.phi(&entry.value))
            }
            Tag::Node => {
                let (left, right) = pop_pair(&mut stack, position)?;
                match cursor {
                    None => {
                        let (l, r) = (closed(left, position)?, closed(right, position)?);
                        Summary::Closed(combiner.k(&l, &entry.value, &r))
                    }
                    Some(0) => {
                        let (l, r) = (open(left, position)?, closed(right, position)?);
                        Summary::Open(combiner.psi_l(&l, &combiner.phi(&entry.value), &r))
                    }
                    Some(1) => {
                        cursor = Some(0);
                        let (l, r) = (closed(left, position)?, open(right, position)?);
                        Summary::Open(combiner.psi_r(&l, &combiner.phi(&entry.value), &r))
                    }
                    Some(d) => {
                        cursor = Some(d - 1);
                        let (l, r) = (closed(left, position)?, closed(right, position)?);
                        Summary::Closed(combiner.k(&l, &entry.value, &r))
                    }
                }
            }
        };
        record(position, &result);
        stack.push(result);
    }
    single(stack)
}

/// Pop the top two entries: the top is the left child.
pub(crate) fn pop_pair<T>(stack: &mut Vec<T>, position: usize) -> Result<(T, T)> {
    match (stack.pop(), stack.pop()) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(SkeletonError::IllFormed {
            position,
            reason: "node has fewer than two operands",
        }),
    }
}

pub(crate) fn single<T>(mut stack: Vec<T>) -> Result<T> {
    if stack.len() != 1 {
        return Err(SkeletonError::IllFormed {
            position: 0,
            reason: "scan does not reduce to a single value",
        });
    }
    stack.pop().ok_or(SkeletonError::EmptyInput("scan produced no value"))
}

fn closed<A, C>(entry: Summary<A, C>, position: usize) -> Result<A> {
    match entry {
        Summary::Closed(value) => Ok(value),
        Summary::Open(_) => Err(SkeletonError::IllFormed {
            position,
            reason: "expected a complete operand, found the open context",
        }),
    }
}

fn open<A, C>(entry: Summary<A, C>, position: usize) -> Result<C> {
    match entry {
        Summary::Open(context) => Ok(context),
        Summary::Closed(_) => Err(SkeletonError::IllFormed {
            position,
            reason: "expected the open context, found a complete operand",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra;

    #[test]
    fn test_critical_free_segment_closes() {
        let segment = vec![
            TaggedValue::node(1i64),
            TaggedValue::node(2),
            TaggedValue::leaf(3),
            TaggedValue::leaf(4),
            TaggedValue::leaf(5),
        ];
        let summary = reduce_local(&segment, &algebra::sum()).unwrap();
        assert_eq!(summary, Summary::Closed(15));
    }

    #[test]
    fn test_context_in_left_child() {
        // node(a, critical(b), leaf(c)): the hole sits under b
        let segment = vec![
            TaggedValue::node("a".to_string()),
            TaggedValue::critical("b".to_string()),
            TaggedValue::leaf("c".to_string()),
        ];
        let combiner = algebra::preorder_concat();
        let summary = reduce_local(&segment, &combiner).unwrap();
        let Summary::Open(context) = summary else {
            panic!("expected open summary");
        };
        assert_eq!(combiner.psi_n(&"X".to_string(), &context, &"Y".to_string()), "abXYc");
    }

    #[test]
    fn test_context_in_right_child() {
        let segment = vec![
            TaggedValue::node("a".to_string()),
            TaggedValue::leaf("c".to_string()),
            TaggedValue::critical("b".to_string()),
        ];
        let combiner = algebra::preorder_concat();
        let Summary::Open(context) = reduce_local(&segment, &combiner).unwrap() else {
            panic!("expected open summary");
        };
        assert_eq!(combiner.psi_n(&"X".to_string(), &context, &"Y".to_string()), "acbXY");
    }

    #[test]
    fn test_global_fills_holes_in_order() {
        let combiner = algebra::preorder_concat();
        let s = |v: &str| v.to_string();
        // Root segment [1^C], then left [2^C] with [3^L] [4^L], then right [5^L]
        let summaries = vec![
            Summary::Open(combiner.phi(&s("1"))),
            Summary::Open(combiner.phi(&s("2"))),
            Summary::Closed(s("3")),
            Summary::Closed(s("4")),
            Summary::Closed(s("5")),
        ];
        assert_eq!(reduce_global(&summaries, &combiner).unwrap(), "12345");
    }

    #[test]
    fn test_underflow_is_ill_formed() {
        let segment = vec![TaggedValue::node(1i64), TaggedValue::leaf(2)];
        assert!(matches!(
            reduce_local(&segment, &algebra::sum()),
            Err(SkeletonError::IllFormed { .. })
        ));
    }

    #[test]
    fn test_empty_segment() {
        let segment: Vec<TaggedValue<i64>> = Vec::new();
        assert!(matches!(
            reduce_local(&segment, &algebra::sum()),
            Err(SkeletonError::EmptyInput(_))
        ));
        let summaries: Vec<Summary<i64, i64>> = Vec::new();
        assert!(reduce_global(&summaries, &algebra::sum()).is_err());
    }
}
