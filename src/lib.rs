//! # Distributed tree skeletons over segmented binary trees
//!
//! This library evaluates data-parallel skeletons (map, zip, reduce, upward
//! and downward accumulation) on a binary tree spread over a fixed group of
//! SPMD workers that only talk through collective exchanges.
//!
//! ## Core Algorithm
//!
//! 1. **Tagging**: mark a node Critical when it crosses a multiple of the bound `m`
//!    relative to both children
//! 2. **Linearization**: splice the tree into segments that stop at Critical nodes
//! 3. **Distribution**: hand contiguous runs of segments to workers
//! 4. **Skeletons**: local segment pass, one gather/scatter round over the
//!    per-segment summaries, local finishing pass
//!
//! Every skeleton costs one `O(#segments)` collective round regardless of tree
//! depth, and returns exactly what the sequential traversal would.
//!
//! ## Usage Example
//!
//! ```ignore
//! use treeskel::{algebra, group, Coordinator, SkeletonConfig, Tree};
//!
//! let tree = Tree::balanced(1023, |_| 1u64);
//! let config = SkeletonConfig::for_tree(tree.size(), 4);
//! let ltree = tree.linearize(config.bound)?;
//! let totals = group::run_workers(4, |g| -> treeskel::Result<u64> {
//!     let coordinator = Coordinator::new(g, config.clone())?;
//!     let shard = coordinator.from_replicated(&ltree)?;
//!     coordinator.reduce_all(&shard, &algebra::sum())
//! });
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod tree;         // Tree ADT, tagging, sequential reference skeletons
pub mod segment;      // Segments, linearization and the segment algebra
pub mod algebra;      // Combiner bundles and stock combiners
pub mod distribution; // Segment-to-worker assignment
pub mod group;        // Process-group collectives
pub mod coordinator;  // Distributed skeleton protocols
pub mod persist;      // Text persistence of trees, distributions and shards

// Re-exports for convenience
pub use algebra::{DownwardCombiner, ReduceCombiner};
pub use coordinator::{Coordinator, Shard};
pub use distribution::{Distribution, SegmentSpan};
pub use group::{ProcessGroup, SoloGroup, ThreadGroup};
pub use segment::{LTree, Segment, Summary, Tag, TaggedValue};
pub use tree::Tree;

use thiserror::Error;

/// Configuration parameters for a distributed skeleton session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonConfig {
    /// Segment bound `m` used by the tagger
    pub bound: usize,

    /// Number of workers `P` in the process group
    pub workers: usize,

    /// Rank that runs the global phase and owns gathered results
    pub root: usize,

    /// Cross-check the replicated distribution on every rank at load time
    pub verify_distribution: bool,
}

impl SkeletonConfig {
    /// Configuration for a tree of `nodes` nodes: `m = ⌈n/P⌉`.
    pub fn for_tree(nodes: usize, workers: usize) -> Self {
        let workers = workers.max(1);
        let bound = nodes.div_ceil(workers).max(1);
        Self {
            bound,
            workers,
            root: 0,
            verify_distribution: false,
        }
    }

    /// Override the segment bound.
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound;
        self
    }

    /// Override the root rank.
    pub fn with_root(mut self, root: usize) -> Self {
        self.root = root;
        self
    }

    /// Enable the load-time distribution cross-check.
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_distribution = enabled;
        self
    }

    /// Reject configurations no collective can run with.
    pub fn validate(&self) -> Result<()> {
        if self.bound == 0 {
            return Err(SkeletonError::InvalidConfig(
                "segment bound must be > 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(SkeletonError::InvalidConfig(
                "worker count must be > 0".to_string(),
            ));
        }
        if self.root >= self.workers {
            return Err(SkeletonError::InvalidConfig(format!(
                "root rank {} outside group of {}",
                self.root, self.workers
            )));
        }
        Ok(())
    }
}

/// Errors raised by tree construction, the segment algebra and the coordinator
#[derive(Error, Debug)]
pub enum SkeletonError {
    /// Segment or LTree violates the stack-arity invariant
    #[error("ill-formed segment at position {position}: {reason}")]
    IllFormed {
        /// Position inside the segment where the scan failed
        position: usize,
        /// What went wrong
        reason: &'static str,
    },

    /// Paired structures disagree on tags, lengths or distribution
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Operation applied to a segment of the wrong kind
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Nothing to operate on
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Invalid session configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A collective exchange could not complete
    #[error("collective failed on rank {rank}: {reason}")]
    Collective {
        /// Rank that observed the failure
        rank: usize,
        /// Failure description
        reason: String,
    },

    /// Persisted text could not be parsed
    #[error("parse error on line {line}: {reason}")]
    Parse {
        /// 1-indexed line number
        line: usize,
        /// Failure description
        reason: String,
    },

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, SkeletonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_for_tree() {
        let config = SkeletonConfig::for_tree(1023, 4);
        assert_eq!(config.bound, 256);
        assert_eq!(config.workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bound_never_zero() {
        let config = SkeletonConfig::for_tree(0, 8);
        assert_eq!(config.bound, 1);
    }

    #[test]
    fn test_invalid_root_rejected() {
        let config = SkeletonConfig::for_tree(10, 2).with_root(2);
        assert!(matches!(
            config.validate(),
            Err(SkeletonError::InvalidConfig(_))
        ));
    }
}
