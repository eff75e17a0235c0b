//! Per-worker slice of a distributed LTree

use std::sync::Arc;

use crate::{distribution::Distribution, segment::TaggedValue, Result, SkeletonError};

/// One worker's owned segments plus the replicated distribution
///
/// `content` is the concatenation of the owned segments in global segment
/// order; the distribution's spans for this rank index into it. Skeletons
/// never mutate a shard, they return a new one sharing the same distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard<V> {
    distribution: Arc<Distribution>,
    rank: usize,
    content: Vec<TaggedValue<V>>,
}

impl<V> Shard<V> {
    /// Wrap a content buffer, checking it matches the rank's spans.
    pub fn new(
        distribution: Arc<Distribution>,
        rank: usize,
        content: Vec<TaggedValue<V>>,
    ) -> Result<Self> {
        if rank >= distribution.workers() {
            return Err(SkeletonError::InvalidConfig(format!(
                "rank {} outside distribution over {} workers",
                rank,
                distribution.workers()
            )));
        }
        let expected = distribution.local_size(rank);
        if content.len() != expected {
            return Err(SkeletonError::ShapeMismatch(format!(
                "rank {} holds {} values, distribution assigns {}",
                rank,
                content.len(),
                expected
            )));
        }
        Ok(Self {
            distribution,
            rank,
            content,
        })
    }

    /// Replicated distribution.
    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub(crate) fn shared_distribution(&self) -> &Arc<Distribution> {
        &self.distribution
    }

    /// Owning rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Owned values, segments back to back.
    pub fn content(&self) -> &[TaggedValue<V>] {
        &self.content
    }

    /// Number of values held by this worker.
    pub fn local_size(&self) -> usize {
        self.content.len()
    }

    /// Number of values across all workers.
    pub fn global_size(&self) -> usize {
        self.distribution.global_size()
    }

    /// Number of segments owned by this worker.
    pub fn num_segments(&self) -> usize {
        self.distribution.counts()[self.rank]
    }

    /// Owned segments as views into the content buffer.
    pub fn segments(&self) -> impl Iterator<Item = &[TaggedValue<V>]> + '_ {
        self.distribution
            .spans(self.rank)
            .iter()
            .map(move |span| &self.content[span.range()])
    }

    /// Same distribution, fresh content. Length is the caller's invariant.
    pub(crate) fn with_content<W>(&self, content: Vec<TaggedValue<W>>) -> Shard<W> {
        debug_assert_eq!(content.len(), self.content.len());
        Shard {
            distribution: Arc::clone(&self.distribution),
            rank: self.rank,
            content,
        }
    }
}
