//! In-process worker group over crossbeam channels
//!
//! Ranks are threads. Every ordered pair of ranks owns its own FIFO channel,
//! so messages from consecutive collectives can never overtake each other
//! and every payload is received by sender rank. A rank that drops its
//! handle turns its peers' pending receives into `Collective` errors.

use std::any::Any;
use std::fmt;
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::trace;

use super::ProcessGroup;
use crate::{Result, SkeletonError};

type Payload = Box<dyn Any + Send>;

/// One rank's handle into a thread-backed process group
pub struct ThreadGroup {
    rank: usize,
    /// `outboxes[dst]`: channel from this rank to `dst`
    outboxes: Vec<Sender<Payload>>,
    /// `inboxes[src]`: channel from `src` to this rank
    inboxes: Vec<Receiver<Payload>>,
}

impl ThreadGroup {
    /// Wire up `size` handles, one per rank, in rank order.
    pub fn spawn(size: usize) -> Vec<ThreadGroup> {
        let mut outboxes: Vec<Vec<Sender<Payload>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Payload>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        for src in 0..size {
            for dst in 0..size {
                let (sender, receiver) = unbounded();
                outboxes[src].push(sender);
                inboxes[dst].push(receiver);
            }
        }
        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| ThreadGroup {
                rank,
                outboxes,
                inboxes,
            })
            .collect()
    }

    fn check_root(&self, root: usize) -> Result<()> {
        if root >= self.size() {
            return Err(self.failure(format!("root {root} outside group of {}", self.size())));
        }
        Ok(())
    }

    fn failure(&self, reason: String) -> SkeletonError {
        SkeletonError::Collective {
            rank: self.rank,
            reason,
        }
    }

    fn send<T: Send + 'static>(&self, dst: usize, item: T) -> Result<()> {
        trace!(rank = self.rank, dst, "send");
        self.outboxes[dst]
            .send(Box::new(item))
            .map_err(|_| self.failure(format!("rank {dst} has left the group")))
    }

    fn recv<T: Send + 'static>(&self, src: usize) -> Result<T> {
        let payload = self.inboxes[src]
            .recv()
            .map_err(|_| self.failure(format!("rank {src} has left the group")))?;
        trace!(rank = self.rank, src, "recv");
        payload.downcast::<T>().map(|item| *item).map_err(|_| {
            self.failure(format!(
                "payload from rank {src} has an unexpected type; collective call order diverged"
            ))
        })
    }
}

impl ProcessGroup for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn gather<T: Send + 'static>(&self, item: T, root: usize) -> Result<Option<Vec<T>>> {
        self.check_root(root)?;
        self.send(root, item)?;
        if self.rank != root {
            return Ok(None);
        }
        (0..self.size())
            .map(|src| self.recv(src))
            .collect::<Result<Vec<T>>>()
            .map(Some)
    }

    fn all_gather<T: Clone + Send + 'static>(&self, item: T) -> Result<Vec<T>> {
        for dst in 0..self.size() {
            self.send(dst, item.clone())?;
        }
        (0..self.size()).map(|src| self.recv(src)).collect()
    }

    fn scatter<T: Send + 'static>(&self, items: Option<Vec<T>>, root: usize) -> Result<T> {
        self.check_root(root)?;
        if self.rank == root {
            let items = items.ok_or_else(|| self.failure("root supplied nothing to scatter".to_string()))?;
            if items.len() != self.size() {
                return Err(self.failure(format!(
                    "scatter of {} items over {} ranks",
                    items.len(),
                    self.size()
                )));
            }
            for (dst, item) in items.into_iter().enumerate() {
                self.send(dst, item)?;
            }
        }
        self.recv(root)
    }

    fn broadcast<T: Clone + Send + 'static>(&self, value: Option<T>, root: usize) -> Result<T> {
        self.check_root(root)?;
        if self.rank == root {
            let value = value.ok_or_else(|| self.failure("root supplied nothing to broadcast".to_string()))?;
            for dst in 0..self.size() {
                self.send(dst, value.clone())?;
            }
        }
        self.recv(root)
    }
}

impl fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("rank", &self.rank)
            .field("size", &self.size())
            .finish()
    }
}

/// Run `worker` once per rank on `size` scoped threads; results in rank order.
///
/// A panicking worker is resumed on the calling thread after every other
/// worker has finished.
pub fn run_workers<R, F>(size: usize, worker: F) -> Vec<R>
where
    R: Send,
    F: Fn(&ThreadGroup) -> R + Sync,
{
    let groups = ThreadGroup::spawn(size);
    let worker = &worker;
    thread::scope(|scope| {
        let handles: Vec<_> = groups
            .into_iter()
            .map(|group| scope.spawn(move || worker(&group)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}
