//! Single-worker group: every collective is the identity.

use super::ProcessGroup;
use crate::{Result, SkeletonError};

/// Process group of exactly one rank
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloGroup;

impl SoloGroup {
    /// Create the group.
    pub fn new() -> Self {
        Self
    }

    fn check_root(root: usize) -> Result<()> {
        if root != 0 {
            return Err(SkeletonError::Collective {
                rank: 0,
                reason: format!("root {root} outside single-rank group"),
            });
        }
        Ok(())
    }
}

impl ProcessGroup for SoloGroup {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn gather<T: Send + 'static>(&self, item: T, root: usize) -> Result<Option<Vec<T>>> {
        Self::check_root(root)?;
        Ok(Some(vec![item]))
    }

    fn all_gather<T: Clone + Send + 'static>(&self, item: T) -> Result<Vec<T>> {
        Ok(vec![item])
    }

    fn scatter<T: Send + 'static>(&self, items: Option<Vec<T>>, root: usize) -> Result<T> {
        Self::check_root(root)?;
        let mut items = items.ok_or_else(|| SkeletonError::Collective {
            rank: 0,
            reason: "root supplied nothing to scatter".to_string(),
        })?;
        if items.len() != 1 {
            return Err(SkeletonError::Collective {
                rank: 0,
                reason: format!("scatter of {} items over 1 rank", items.len()),
            });
        }
        items.pop().ok_or_else(|| SkeletonError::Collective {
            rank: 0,
            reason: "root supplied nothing to scatter".to_string(),
        })
    }

    fn broadcast<T: Clone + Send + 'static>(&self, value: Option<T>, root: usize) -> Result<T> {
        Self::check_root(root)?;
        value.ok_or_else(|| SkeletonError::Collective {
            rank: 0,
            reason: "root supplied nothing to broadcast".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectives_are_identity() {
        let group = SoloGroup::new();
        assert_eq!(group.gather(7, 0).unwrap(), Some(vec![7]));
        assert_eq!(group.all_gather("x").unwrap(), vec!["x"]);
        assert_eq!(group.scatter(Some(vec![3]), 0).unwrap(), 3);
        assert_eq!(group.broadcast(Some(1.5), 0).unwrap(), 1.5);
        assert!(group.barrier().is_ok());
    }

    #[test]
    fn test_foreign_root_rejected() {
        let group = SoloGroup::new();
        assert!(group.gather(7, 1).is_err());
    }
}
