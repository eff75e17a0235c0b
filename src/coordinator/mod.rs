//! Distributed skeletons over a process group
//!
//! Every operation here is collective: all ranks must call the same
//! operations in the same order with consistent combiners. Each skeleton is
//! one local segment pass, at most one gather/scatter round of one summary
//! per segment, and one local finishing pass.

mod shard;

pub use shard::Shard;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    algebra::{DownwardCombiner, ReduceCombiner},
    distribution::Distribution,
    group::ProcessGroup,
    segment::{
        downward::{dacc_global, dacc_local, dacc_summary},
        pointwise::{map2_local, map_local, zip_local},
        reduce::{reduce_global, reduce_local},
        upward::{uacc_global, uacc_local, uacc_update},
        LTree, TaggedValue,
    },
    tree::Tree,
    Result, SkeletonConfig, SkeletonError,
};

/// Runs skeletons for one rank of a process group
#[derive(Debug)]
pub struct Coordinator<'g, G: ProcessGroup> {
    group: &'g G,
    config: SkeletonConfig,
}

impl<'g, G: ProcessGroup> Coordinator<'g, G> {
    /// Bind a configuration to a group, checking they agree on the worker count.
    pub fn new(group: &'g G, config: SkeletonConfig) -> Result<Self> {
        config.validate()?;
        if config.workers != group.size() {
            return Err(SkeletonError::InvalidConfig(format!(
                "configured for {} workers, group has {}",
                config.workers,
                group.size()
            )));
        }
        Ok(Self { group, config })
    }

    /// The underlying group.
    pub fn group(&self) -> &G {
        self.group
    }

    /// Session configuration.
    pub fn config(&self) -> &SkeletonConfig {
        &self.config
    }

    /// This worker's rank.
    pub fn rank(&self) -> usize {
        self.group.rank()
    }

    fn is_root(&self) -> bool {
        self.group.is_root(self.config.root)
    }

    // ------------------------------------------------------------------
    // Loading and collection
    // ------------------------------------------------------------------

    /// Tag and flatten a tree held by the root with the configured bound, then distribute it.
    pub fn load<V>(&self, tree: Option<&Tree<V>>) -> Result<Shard<V>>
    where
        V: Clone + Send + 'static,
    {
        let ltree = match tree {
            Some(tree) if self.is_root() => Some(tree.linearize(self.config.bound)?),
            _ => None,
        };
        self.distribute(ltree)
    }

    /// Distribute an LTree only the root holds: broadcast the assignment, scatter contents.
    pub fn distribute<V>(&self, ltree: Option<LTree<V>>) -> Result<Shard<V>>
    where
        V: Clone + Send + 'static,
    {
        let root = self.config.root;
        let (distribution, contents) = if self.is_root() {
            let ltree = ltree.ok_or(SkeletonError::EmptyInput("root holds no ltree to distribute"))?;
            let distribution = Distribution::for_segments(&ltree.segment_sizes(), self.group.size())?;
            let contents: Vec<Vec<TaggedValue<V>>> = distribution
                .split_by_worker(ltree.into_segments())?
                .into_iter()
                .map(|segments| segments.into_iter().flatten().collect())
                .collect();
            (Some(distribution), Some(contents))
        } else {
            (None, None)
        };

        let distribution = Arc::new(self.group.broadcast(distribution, root)?);
        let content = self.group.scatter(contents, root)?;
        debug!(
            rank = self.rank(),
            segments = distribution.counts()[self.rank()],
            values = content.len(),
            "shard received"
        );
        self.verify(&distribution)?;
        Shard::new(distribution, self.rank(), content)
    }

    /// Slice this rank's shard out of an LTree every rank holds. No communication
    /// unless verification is enabled.
    pub fn from_replicated<V: Clone>(&self, ltree: &LTree<V>) -> Result<Shard<V>> {
        let distribution = Distribution::for_segments(&ltree.segment_sizes(), self.group.size())?;
        let content: Vec<TaggedValue<V>> = ltree.segments()[distribution.owned(self.rank())]
            .iter()
            .flatten()
            .cloned()
            .collect();
        self.verify(&distribution)?;
        Shard::new(Arc::new(distribution), self.rank(), content)
    }

    /// Gather every rank's segments back into one LTree at the root.
    pub fn collect<V>(&self, shard: &Shard<V>) -> Result<Option<LTree<V>>>
    where
        V: Clone + Send + 'static,
    {
        self.check_shard(shard)?;
        let gathered = self.group.gather(shard.content().to_vec(), self.config.root)?;
        let Some(contents) = gathered else {
            return Ok(None);
        };
        let distribution = shard.distribution();
        let mut segments = Vec::with_capacity(distribution.num_segments());
        for (worker, content) in contents.iter().enumerate() {
            for span in distribution.spans(worker) {
                let values = content.get(span.range()).ok_or_else(|| {
                    SkeletonError::ShapeMismatch(format!(
                        "rank {} sent {} values, span ends at {}",
                        worker,
                        content.len(),
                        span.offset + span.len
                    ))
                })?;
                segments.push(values.to_vec());
            }
        }
        LTree::from_segments(segments).map(Some)
    }

    fn verify(&self, distribution: &Distribution) -> Result<()> {
        if !self.config.verify_distribution {
            return Ok(());
        }
        let fingerprints = self.group.all_gather(distribution.fingerprint())?;
        let own = distribution.fingerprint();
        if let Some(rank) = fingerprints.iter().position(|theirs| *theirs != own) {
            return Err(SkeletonError::ShapeMismatch(format!(
                "rank {} holds distribution {}, rank {} holds {}",
                self.rank(),
                own.to_hex(),
                rank,
                fingerprints[rank].to_hex()
            )));
        }
        trace!(rank = self.rank(), fingerprint = %own.to_hex(), "distribution verified");
        Ok(())
    }

    fn check_shard<V>(&self, shard: &Shard<V>) -> Result<()> {
        if shard.rank() != self.rank() || shard.distribution().workers() != self.group.size() {
            return Err(SkeletonError::ShapeMismatch(format!(
                "shard for rank {} of {} used on rank {} of {}",
                shard.rank(),
                shard.distribution().workers(),
                self.rank(),
                self.group.size()
            )));
        }
        Ok(())
    }

    fn check_aligned<A, B>(&self, left: &Shard<A>, right: &Shard<B>) -> Result<()> {
        self.check_shard(left)?;
        self.check_shard(right)?;
        let same = Arc::ptr_eq(left.shared_distribution(), right.shared_distribution())
            || left.distribution() == right.distribution();
        if !same {
            return Err(SkeletonError::ShapeMismatch(
                "shards were distributed differently".to_string(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local skeletons
    // ------------------------------------------------------------------

    /// Map leaves and internal nodes separately. Local only.
    pub fn map<A, B>(
        &self,
        shard: &Shard<A>,
        leaf: impl Fn(&A) -> B,
        node: impl Fn(&A) -> B,
    ) -> Result<Shard<B>> {
        self.check_shard(shard)?;
        Ok(shard.with_content(map_local(shard.content(), leaf, node)))
    }

    /// Pair two identically distributed shards. Local only.
    pub fn zip<A: Clone, B: Clone>(
        &self,
        left: &Shard<A>,
        right: &Shard<B>,
    ) -> Result<Shard<(A, B)>> {
        self.check_aligned(left, right)?;
        Ok(left.with_content(zip_local(left.content(), right.content())?))
    }

    /// Combine two identically distributed shards. Local only.
    pub fn map2<A, B, C>(
        &self,
        left: &Shard<A>,
        right: &Shard<B>,
        leaf: impl Fn(&A, &B) -> C,
        node: impl Fn(&A, &B) -> C,
    ) -> Result<Shard<C>> {
        self.check_aligned(left, right)?;
        Ok(left.with_content(map2_local(left.content(), right.content(), leaf, node)?))
    }

    // ------------------------------------------------------------------
    // Collective skeletons
    // ------------------------------------------------------------------

    /// Reduce the whole tree. The result exists only at the root.
    pub fn reduce<A, C>(&self, shard: &Shard<A>, combiner: &ReduceCombiner<A, C>) -> Result<Option<A>>
    where
        A: Clone + Send + 'static,
        C: Clone + Send + 'static,
    {
        self.check_shard(shard)?;
        let summaries = shard
            .segments()
            .map(|segment| reduce_local(segment, combiner))
            .collect::<Result<Vec<_>>>()?;
        debug!(rank = self.rank(), segments = summaries.len(), "reduce: local pass done");

        let Some(gathered) = self.group.gather(summaries, self.config.root)? else {
            return Ok(None);
        };
        let meta: Vec<_> = gathered.into_iter().flatten().collect();
        debug!(segments = meta.len(), "reduce: global pass");
        reduce_global(&meta, combiner).map(Some)
    }

    /// Reduce, then broadcast the result so every rank holds it.
    pub fn reduce_all<A, C>(&self, shard: &Shard<A>, combiner: &ReduceCombiner<A, C>) -> Result<A>
    where
        A: Clone + Send + 'static,
        C: Clone + Send + 'static,
    {
        let result = self.reduce(shard, combiner)?;
        self.group.broadcast(result, self.config.root)
    }

    /// Replace every value with the reduction of its subtree.
    pub fn uacc<A, C>(&self, shard: &Shard<A>, combiner: &ReduceCombiner<A, C>) -> Result<Shard<A>>
    where
        A: Clone + Send + 'static,
        C: Clone + Send + 'static,
    {
        self.check_shard(shard)?;
        let partials = shard
            .segments()
            .map(|segment| uacc_local(segment, combiner))
            .collect::<Result<Vec<_>>>()?;
        let summaries: Vec<_> = partials.iter().map(|partial| partial.summary.clone()).collect();
        debug!(rank = self.rank(), segments = summaries.len(), "uacc: local pass done");

        let root = self.config.root;
        let corrections = match self.group.gather(summaries, root)? {
            Some(gathered) => {
                let meta: Vec<_> = gathered.into_iter().flatten().collect();
                debug!(segments = meta.len(), "uacc: global pass");
                let corrections = uacc_global(&meta, combiner)?;
                Some(shard.distribution().split_by_worker(corrections)?)
            }
            None => None,
        };
        let corrections: Vec<Option<(A, A)>> = self.group.scatter(corrections, root)?;
        if corrections.len() != partials.len() {
            return Err(SkeletonError::ShapeMismatch(format!(
                "received {} corrections for {} segments",
                corrections.len(),
                partials.len()
            )));
        }

        let mut content = Vec::with_capacity(shard.local_size());
        for ((segment, partial), correction) in shard.segments().zip(partials).zip(&corrections) {
            let values = uacc_update(segment, partial.resolved, combiner, correction.as_ref())?;
            content.extend(
                segment
                    .iter()
                    .zip(values)
                    .map(|(entry, value)| entry.with_value(value)),
            );
        }
        debug!(rank = self.rank(), values = content.len(), "uacc: update done");
        Ok(shard.with_content(content))
    }

    /// Replace every value with the accumulation along its root path, starting from `seed`.
    pub fn dacc<A, C, D>(
        &self,
        shard: &Shard<A>,
        combiner: &DownwardCombiner<A, C, D>,
        seed: C,
    ) -> Result<Shard<C>>
    where
        C: Clone + Send + 'static,
        D: Clone + Send + 'static,
    {
        self.check_shard(shard)?;
        let summaries = shard
            .segments()
            .map(|segment| dacc_summary(segment, combiner))
            .collect::<Result<Vec<_>>>()?;
        debug!(rank = self.rank(), segments = summaries.len(), "dacc: path pass done");

        let root = self.config.root;
        let seeds = match self.group.gather(summaries, root)? {
            Some(gathered) => {
                let meta: Vec<_> = gathered.into_iter().flatten().collect();
                debug!(segments = meta.len(), "dacc: global pass");
                let seeds = dacc_global(&meta, combiner, seed)?;
                Some(shard.distribution().split_by_worker(seeds)?)
            }
            None => None,
        };
        let seeds: Vec<C> = self.group.scatter(seeds, root)?;
        if seeds.len() != shard.num_segments() {
            return Err(SkeletonError::ShapeMismatch(format!(
                "received {} segment seeds for {} segments",
                seeds.len(),
                shard.num_segments()
            )));
        }

        let mut content = Vec::with_capacity(shard.local_size());
        for (segment, seed) in shard.segments().zip(seeds) {
            let values = dacc_local(segment, combiner, seed)?;
            content.extend(
                segment
                    .iter()
                    .zip(values)
                    .map(|(entry, value)| entry.with_value(value)),
            );
        }
        debug!(rank = self.rank(), values = content.len(), "dacc: local pass done");
        Ok(shard.with_content(content))
    }
}
