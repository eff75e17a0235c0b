//! Process-group collectives
//!
//! The coordinator only ever talks to its peers through these blocking
//! collectives. Every rank must enter the same collectives in the same order;
//! payloads are always associated with the sender's rank, never with arrival
//! order.

mod solo;
mod thread;

pub use solo::SoloGroup;
pub use thread::{run_workers, ThreadGroup};

use std::fmt;

use crate::Result;

/// Blocking collective primitives over a fixed set of ranks
pub trait ProcessGroup: fmt::Debug {
    /// This worker's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of workers.
    fn size(&self) -> usize;

    /// Collect one item per rank at `root`, in rank order. Non-root ranks get `None`.
    fn gather<T: Send + 'static>(&self, item: T, root: usize) -> Result<Option<Vec<T>>>;

    /// Collect one item per rank on every rank, in rank order.
    fn all_gather<T: Clone + Send + 'static>(&self, item: T) -> Result<Vec<T>>;

    /// Hand item `i` of root's list to rank `i`. Non-root ranks pass `None`.
    fn scatter<T: Send + 'static>(&self, items: Option<Vec<T>>, root: usize) -> Result<T>;

    /// Copy root's value to every rank. Non-root ranks pass `None`.
    fn broadcast<T: Clone + Send + 'static>(&self, value: Option<T>, root: usize) -> Result<T>;

    /// Wait until every rank has arrived.
    fn barrier(&self) -> Result<()> {
        self.all_gather(()).map(|_| ())
    }

    /// Whether this worker is `root`.
    fn is_root(&self, root: usize) -> bool {
        self.rank() == root
    }
}
