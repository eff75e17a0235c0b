//! Segment-to-worker assignment
//!
//! Workers receive contiguous runs of segments. With `avg = ⌊Σsizes / P⌋`,
//! each worker in turn is seeded with the next unassigned segment, then
//! greedily extended while that strictly reduces `|accumulated − avg|`. The
//! last worker absorbs whatever remains.
//!
//! The index records each segment's (offset, length) inside its owner's
//! content buffer, with offsets restarting at 0 for every worker.

use std::ops::Range;

use tracing::{debug, info};

use crate::{Result, SkeletonError};

/// Where one segment lives inside its owner's content buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentSpan {
    /// Offset relative to the start of the owner's buffer
    pub offset: usize,
    /// Number of values in the segment
    pub len: usize,
}

impl SegmentSpan {
    /// Range covered inside the owner's buffer.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Replicated assignment of segments to workers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Distribution {
    counts: Vec<usize>,
    index: Vec<SegmentSpan>,
}

impl Distribution {
    /// Assign segments of the given sizes to `workers` workers.
    pub fn for_segments(sizes: &[usize], workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(SkeletonError::InvalidConfig(
                "worker count must be > 0".to_string(),
            ));
        }
        if sizes.is_empty() {
            return Err(SkeletonError::EmptyInput("no segments to distribute"));
        }

        let total: usize = sizes.iter().sum();
        let avg = total / workers;
        let mut counts = vec![0usize; workers];
        let mut next = 0usize;

        for (worker, count) in counts.iter_mut().enumerate() {
            if worker + 1 == workers {
                *count = sizes.len() - next;
                next = sizes.len();
                break;
            }
            if next == sizes.len() {
                break;
            }
            let mut acc = sizes[next];
            next += 1;
            *count = 1;
            while next < sizes.len() {
                let extended = acc + sizes[next];
                if extended.abs_diff(avg) >= acc.abs_diff(avg) {
                    break;
                }
                acc = extended;
                next += 1;
                *count += 1;
            }
            debug!(worker, segments = *count, load = acc, target = avg, "bucket filled");
        }

        let mut index = Vec::with_capacity(sizes.len());
        let mut segment = 0usize;
        for &count in &counts {
            let mut offset = 0usize;
            for &len in &sizes[segment..segment + count] {
                index.push(SegmentSpan { offset, len });
                offset += len;
            }
            segment += count;
        }

        info!(
            workers,
            segments = sizes.len(),
            nodes = total,
            "distribution built"
        );
        Ok(Self { counts, index })
    }

    /// Rebuild from persisted parts, checking that offsets restart per worker.
    pub fn from_parts(counts: Vec<usize>, index: Vec<SegmentSpan>) -> Result<Self> {
        if counts.is_empty() {
            return Err(SkeletonError::EmptyInput("distribution has no workers"));
        }
        if counts.iter().sum::<usize>() != index.len() {
            return Err(SkeletonError::ShapeMismatch(format!(
                "counts cover {} segments, index has {}",
                counts.iter().sum::<usize>(),
                index.len()
            )));
        }
        let distribution = Self { counts, index };
        for worker in 0..distribution.workers() {
            let mut expected = 0usize;
            for span in distribution.spans(worker) {
                if span.offset != expected {
                    return Err(SkeletonError::ShapeMismatch(format!(
                        "worker {} span starts at {}, expected {}",
                        worker, span.offset, expected
                    )));
                }
                expected += span.len;
            }
        }
        Ok(distribution)
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.counts.len()
    }

    /// Segments per worker.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Per-segment spans, in global segment order.
    pub fn index(&self) -> &[SegmentSpan] {
        &self.index
    }

    /// Total number of segments.
    pub fn num_segments(&self) -> usize {
        self.index.len()
    }

    /// Global segment indices owned by `worker`.
    pub fn owned(&self, worker: usize) -> Range<usize> {
        let start: usize = self.counts[..worker].iter().sum();
        start..start + self.counts[worker]
    }

    /// Spans owned by `worker`.
    pub fn spans(&self, worker: usize) -> &[SegmentSpan] {
        &self.index[self.owned(worker)]
    }

    /// Number of values `worker` holds.
    pub fn local_size(&self, worker: usize) -> usize {
        self.spans(worker).iter().map(|span| span.len).sum()
    }

    /// Number of values across all workers.
    pub fn global_size(&self) -> usize {
        self.index.iter().map(|span| span.len).sum()
    }

    /// Split a per-segment list into per-worker lists.
    pub fn split_by_worker<T>(&self, items: Vec<T>) -> Result<Vec<Vec<T>>> {
        if items.len() != self.num_segments() {
            return Err(SkeletonError::ShapeMismatch(format!(
                "{} items for {} segments",
                items.len(),
                self.num_segments()
            )));
        }
        let mut items = items.into_iter();
        Ok(self
            .counts
            .iter()
            .map(|&count| items.by_ref().take(count).collect())
            .collect())
    }

    /// Content fingerprint, identical on every rank holding the same distribution.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.counts.len() as u64).to_le_bytes());
        for &count in &self.counts {
            hasher.update(&(count as u64).to_le_bytes());
        }
        for span in &self.index {
            hasher.update(&(span.offset as u64).to_le_bytes());
            hasher.update(&(span.len as u64).to_le_bytes());
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(offset: usize, len: usize) -> SegmentSpan {
        SegmentSpan { offset, len }
    }

    #[test]
    fn test_greedy_assignment() {
        let sizes = [5, 3, 3, 5, 5, 1, 1, 3];
        let distribution = Distribution::for_segments(&sizes, 3).unwrap();
        assert_eq!(distribution.counts(), &[2, 2, 4]);
        assert_eq!(distribution.spans(0), &[span(0, 5), span(5, 3)]);
        assert_eq!(distribution.spans(1), &[span(0, 3), span(3, 5)]);
        assert_eq!(
            distribution.spans(2),
            &[span(0, 5), span(5, 1), span(6, 1), span(7, 3)]
        );
        assert_eq!(distribution.owned(2), 4..8);
        assert_eq!(distribution.local_size(2), 10);
        assert_eq!(distribution.global_size(), 26);
    }

    #[test]
    fn test_single_worker_takes_all() {
        let distribution = Distribution::for_segments(&[2, 2, 2], 1).unwrap();
        assert_eq!(distribution.counts(), &[3]);
        assert_eq!(distribution.spans(0), &[span(0, 2), span(2, 2), span(4, 2)]);
    }

    #[test]
    fn test_more_workers_than_segments() {
        let distribution = Distribution::for_segments(&[4, 4], 4).unwrap();
        assert_eq!(distribution.counts().iter().sum::<usize>(), 2);
        assert_eq!(distribution.counts().len(), 4);
        assert_eq!(distribution.counts()[0], 1);
    }

    #[test]
    fn test_split_by_worker() {
        let distribution = Distribution::for_segments(&[5, 3, 3, 5, 5, 1, 1, 3], 3).unwrap();
        let split = distribution.split_by_worker((0..8).collect()).unwrap();
        assert_eq!(split, vec![vec![0, 1], vec![2, 3], vec![4, 5, 6, 7]]);
        assert!(distribution.split_by_worker(vec![0; 3]).is_err());
    }

    #[test]
    fn test_from_parts_checks_offsets() {
        let ok = Distribution::from_parts(vec![1, 1], vec![span(0, 2), span(0, 3)]);
        assert!(ok.is_ok());
        let bad = Distribution::from_parts(vec![2], vec![span(0, 2), span(3, 3)]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_fingerprint_distinguishes_assignments() {
        let a = Distribution::for_segments(&[5, 3, 3, 5], 2).unwrap();
        let b = Distribution::for_segments(&[5, 3, 3, 5], 3).unwrap();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
