//! Position-wise transforms
//!
//! Leaves go through one function, Node and Critical positions through the
//! other. Paired inputs must agree on length and on every tag.

use super::{Tag, TaggedValue};
use crate::{Result, SkeletonError};

/// Map leaf and internal values separately, keeping tags.
pub fn map_local<A, B>(
    values: &[TaggedValue<A>],
    leaf: impl Fn(&A) -> B,
    node: impl Fn(&A) -> B,
) -> Vec<TaggedValue<B>> {
    values
        .iter()
        .map(|entry| match entry.tag {
            Tag::Leaf => entry.with_value(leaf(&entry.value)),
            Tag::Node | Tag::Critical => entry.with_value(node(&entry.value)),
        })
        .collect()
}

/// Pair two same-shaped runs position by position.
pub fn zip_local<A: Clone, B: Clone>(
    left: &[TaggedValue<A>],
    right: &[TaggedValue<B>],
) -> Result<Vec<TaggedValue<(A, B)>>> {
    map2_local(
        left,
        right,
        |a, b| (a.clone(), b.clone()),
        |a, b| (a.clone(), b.clone()),
    )
}

/// Combine two same-shaped runs position by position.
pub fn map2_local<A, B, C>(
    left: &[TaggedValue<A>],
    right: &[TaggedValue<B>],
    leaf: impl Fn(&A, &B) -> C,
    node: impl Fn(&A, &B) -> C,
) -> Result<Vec<TaggedValue<C>>> {
    if left.len() != right.len() {
        return Err(SkeletonError::ShapeMismatch(format!(
            "lengths differ: {} vs {}",
            left.len(),
            right.len()
        )));
    }
    left.iter()
        .zip(right)
        .enumerate()
        .map(|(position, (a, b))| {
            if a.tag != b.tag {
                return Err(SkeletonError::ShapeMismatch(format!(
                    "tags differ at position {}: {:?} vs {:?}",
                    position, a.tag, b.tag
                )));
            }
            let value = match a.tag {
                Tag::Leaf => leaf(&a.value, &b.value),
                Tag::Node | Tag::Critical => node(&a.value, &b.value),
            };
            Ok(TaggedValue::new(value, a.tag))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TaggedValue<i32>> {
        vec![
            TaggedValue::critical(1),
            TaggedValue::node(2),
            TaggedValue::leaf(3),
            TaggedValue::leaf(4),
        ]
    }

    #[test]
    fn test_map_separates_leaves() {
        let mapped = map_local(&sample(), |v| v * 10, |v| -v);
        let values: Vec<i32> = mapped.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![-1, -2, 30, 40]);
        assert_eq!(mapped[0].tag, Tag::Critical);
    }

    #[test]
    fn test_zip_rejects_tag_mismatch() {
        let mut other = sample();
        other[1].tag = Tag::Leaf;
        assert!(matches!(
            zip_local(&sample(), &other),
            Err(SkeletonError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_map2_rejects_length_mismatch() {
        let short = &sample()[..2];
        assert!(map2_local(&sample(), short, |a, b| a + b, |a, b| a * b).is_err());
    }

    #[test]
    fn test_map2_combines() {
        let combined = map2_local(&sample(), &sample(), |a, b| a + b, |a, b| a * b).unwrap();
        let values: Vec<i32> = combined.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![1, 4, 6, 8]);
    }
}
