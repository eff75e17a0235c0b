//! Segmented linear representation of a tagged tree
//!
//! A tree is spliced into segments: runs of pre-order values that stop at
//! Critical nodes. Each segment reduces to exactly one value under a
//! right-to-left stack scan, and carries at most one Critical node whose two
//! children live in the segments that follow it.
//!
//! The algebra over one segment lives in the submodules:
//! - `reduce`: stack-machine reduction (local and global)
//! - `upward`: upward accumulation (local, global, update)
//! - `downward`: downward accumulation (path, global, local)
//! - `pointwise`: map / zip / map2

mod linearize;
pub mod downward;
pub mod pointwise;
pub mod reduce;
pub mod upward;

pub use linearize::flatten;

use std::fmt;

use crate::{tree::Tree, Result, SkeletonError};

/// Role of a value inside a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    /// Tree leaf
    Leaf,
    /// Internal node whose children follow inside the same segment
    Node,
    /// Internal node whose children start the next segments
    Critical,
}

impl Tag {
    /// One-letter code used by the text format.
    pub fn letter(self) -> char {
        match self {
            Tag::Leaf => 'L',
            Tag::Node => 'N',
            Tag::Critical => 'C',
        }
    }

    /// Parse a one-letter code.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'L' => Some(Tag::Leaf),
            'N' => Some(Tag::Node),
            'C' => Some(Tag::Critical),
            _ => None,
        }
    }
}

/// Value paired with its tag
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaggedValue<V> {
    /// Payload
    pub value: V,
    /// Position role
    pub tag: Tag,
}

impl<V> TaggedValue<V> {
    /// Pair a value with a tag.
    pub fn new(value: V, tag: Tag) -> Self {
        Self { value, tag }
    }

    /// Leaf entry.
    pub fn leaf(value: V) -> Self {
        Self::new(value, Tag::Leaf)
    }

    /// In-segment internal node entry.
    pub fn node(value: V) -> Self {
        Self::new(value, Tag::Node)
    }

    /// Critical entry.
    pub fn critical(value: V) -> Self {
        Self::new(value, Tag::Critical)
    }

    /// Replace the payload, keeping the tag.
    pub fn with_value<W>(&self, value: W) -> TaggedValue<W> {
        TaggedValue::new(value, self.tag)
    }
}

impl<V: fmt::Display> fmt::Display for TaggedValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.value, self.tag.letter())
    }
}

/// One segment: an ordered run of tagged values
pub type Segment<V> = Vec<TaggedValue<V>>;

/// Per-segment summary shipped to the root
///
/// `Closed` segments reduced to a complete value (tag Leaf in the
/// meta-segment); `Open` segments still depend on the two subtrees hanging
/// below their Critical node (tag Node).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Summary<A, C> {
    /// Fully reduced value
    Closed(A),
    /// Context with one hole at the Critical node
    Open(C),
}

impl<A, C> Summary<A, C> {
    /// Tag this summary carries inside the meta-segment.
    pub fn tag(&self) -> Tag {
        match self {
            Summary::Closed(_) => Tag::Leaf,
            Summary::Open(_) => Tag::Node,
        }
    }

    /// Whether the segment contained a Critical node.
    pub fn is_open(&self) -> bool {
        matches!(self, Summary::Open(_))
    }
}

/// Whole-tree flattening: segments in root-first, left-before-right order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LTree<V> {
    segments: Vec<Segment<V>>,
}

impl<V> LTree<V> {
    /// Wrap already-ordered segments, checking each one's arity.
    pub fn from_segments(segments: Vec<Segment<V>>) -> Result<Self> {
        if segments.is_empty() {
            return Err(SkeletonError::EmptyInput("ltree has no segments"));
        }
        for segment in &segments {
            check_arity(segment)?;
        }
        Ok(Self { segments })
    }

    pub(crate) fn from_segments_unchecked(segments: Vec<Segment<V>>) -> Self {
        Self { segments }
    }

    /// Borrow the segments.
    pub fn segments(&self) -> &[Segment<V>] {
        &self.segments
    }

    /// Consume into the segment list.
    pub fn into_segments(self) -> Vec<Segment<V>> {
        self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a constructed LTree.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Element count per segment, in order.
    pub fn segment_sizes(&self) -> Vec<usize> {
        self.segments.iter().map(Vec::len).collect()
    }

    /// Total element count (the tree's node count).
    pub fn node_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Rebuild the tree this LTree encodes.
    ///
    /// Segments are read in order; a Critical node's two children each open
    /// the next unread segment, and the enclosing segment resumes once both
    /// are complete.
    pub fn rebuild(self) -> Result<Tree<V>> {
        let mut segments = self.segments.into_iter();
        let mut sources: Vec<std::vec::IntoIter<TaggedValue<V>>> = Vec::new();
        let mut pending: Vec<PendingNode<V>> = Vec::new();
        let mut position = 0usize;

        loop {
            let opens = match pending.last() {
                Some(parent) => parent.critical,
                None => true,
            };
            if opens {
                let segment = segments.next().ok_or(SkeletonError::IllFormed {
                    position,
                    reason: "Critical node is missing a child segment",
                })?;
                sources.push(segment.into_iter());
            }
            let entry = sources
                .last_mut()
                .and_then(Iterator::next)
                .ok_or(SkeletonError::IllFormed {
                    position,
                    reason: "segment ended before its subtree was complete",
                })?;
            position += 1;

            let (mut tree, mut opened) = match entry.tag {
                Tag::Leaf => (Tree::Leaf(entry.value), opens),
                Tag::Node | Tag::Critical => {
                    pending.push(PendingNode {
                        value: entry.value,
                        critical: entry.tag == Tag::Critical,
                        opened: opens,
                        left: None,
                    });
                    continue;
                }
            };

            // Hang the finished subtree under its parent, closing every
            // segment whose root subtree is now complete.
            loop {
                if opened {
                    close_segment(&mut sources, position)?;
                }
                match pending.pop() {
                    None => {
                        if segments.next().is_some() {
                            return Err(SkeletonError::IllFormed {
                                position,
                                reason: "segments left over after the root tree was rebuilt",
                            });
                        }
                        return Ok(tree);
                    }
                    Some(mut parent) => match parent.left.take() {
                        None => {
                            parent.left = Some(tree);
                            pending.push(parent);
                            break;
                        }
                        Some(left) => {
                            opened = parent.opened;
                            tree = Tree::node(parent.value, left, tree);
                        }
                    },
                }
            }
        }
    }
}

/// Internal node waiting for its subtrees during `rebuild`
struct PendingNode<V> {
    value: V,
    critical: bool,
    /// First value of its segment
    opened: bool,
    left: Option<Tree<V>>,
}

fn close_segment<V>(
    sources: &mut Vec<std::vec::IntoIter<TaggedValue<V>>>,
    position: usize,
) -> Result<()> {
    if let Some(mut rest) = sources.pop() {
        if rest.next().is_some() {
            return Err(SkeletonError::IllFormed {
                position,
                reason: "segment has trailing values",
            });
        }
    }
    Ok(())
}

/// Check that a segment reduces to exactly one value with at most one Critical.
pub fn check_arity<V>(segment: &[TaggedValue<V>]) -> Result<()> {
    if segment.is_empty() {
        return Err(SkeletonError::EmptyInput("segment has no values"));
    }
    let mut depth = 0usize;
    let mut critical_seen = false;
    for (position, entry) in segment.iter().enumerate().rev() {
        match entry.tag {
            Tag::Leaf => depth += 1,
            Tag::Critical => {
                if critical_seen {
                    return Err(SkeletonError::IllFormed {
                        position,
                        reason: "more than one Critical node in segment",
                    });
                }
                critical_seen = true;
                depth += 1;
            }
            Tag::Node => {
                if depth < 2 {
                    return Err(SkeletonError::IllFormed {
                        position,
                        reason: "node has fewer than two operands",
                    });
                }
                depth -= 1;
            }
        }
    }
    if depth != 1 {
        return Err(SkeletonError::IllFormed {
            position: 0,
            reason: "segment does not reduce to a single value",
        });
    }
    Ok(())
}

/// Whether a segment carries a Critical node.
pub fn has_critical<V>(segment: &[TaggedValue<V>]) -> bool {
    segment.iter().any(|entry| entry.tag == Tag::Critical)
}
