#![allow(dead_code)]

use treeskel::{
    group::run_workers, Coordinator, ProcessGroup, Shard, SkeletonConfig, ThreadGroup, Tree,
};

/// node(1, node(2, leaf(3), leaf(4)), leaf(5))
pub fn sample() -> Tree<i64> {
    Tree::node(
        1,
        Tree::node(2, Tree::leaf(3), Tree::leaf(4)),
        Tree::leaf(5),
    )
}

/// Shapes every distributed test sweeps over.
pub fn shapes(nodes: usize) -> Vec<(&'static str, Tree<i64>)> {
    let value = |index: usize| index as i64 + 1;
    vec![
        ("balanced", Tree::balanced(nodes, value)),
        ("left_comb", Tree::left_comb(nodes, value)),
        ("right_comb", Tree::right_comb(nodes, value)),
        ("skewed", Tree::from_splits(nodes, &[1, 4, 0, 9, 2], value)),
    ]
}

/// Load `tree` at the root of a `workers`-thread group and run `job` on every
/// rank; returns what the root produced.
pub fn run_distributed<R, F>(tree: &Tree<i64>, bound: usize, workers: usize, job: F) -> R
where
    R: Send,
    F: Fn(&Coordinator<'_, ThreadGroup>, &Shard<i64>) -> treeskel::Result<Option<R>> + Sync,
{
    let config = SkeletonConfig::for_tree(tree.size(), workers)
        .with_bound(bound)
        .with_verification(true);
    run_with_config(tree, config, job)
}

/// Same as [`run_distributed`] with an explicit configuration.
pub fn run_with_config<R, F>(tree: &Tree<i64>, config: SkeletonConfig, job: F) -> R
where
    R: Send,
    F: Fn(&Coordinator<'_, ThreadGroup>, &Shard<i64>) -> treeskel::Result<Option<R>> + Sync,
{
    let root = config.root;
    let outcomes = run_workers(config.workers, |group| -> treeskel::Result<Option<R>> {
        let coordinator = Coordinator::new(group, config.clone())?;
        let shard = coordinator.load(group.is_root(root).then_some(tree))?;
        job(&coordinator, &shard)
    });
    let mut result = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        let outcome = outcome.unwrap_or_else(|err| panic!("worker {rank} failed: {err}"));
        if rank == root {
            result = outcome;
        } else {
            assert!(outcome.is_none(), "non-root rank {rank} produced a result");
        }
    }
    result.expect("root produced a result")
}

pub fn add3(l: &i64, b: &i64, r: &i64) -> i64 {
    l + b + r
}

/// Sequential subtree sizes.
pub fn subtree_sizes(tree: &Tree<i64>) -> Tree<i64> {
    tree.map(&|_: &i64| 1i64, &|_: &i64| 1i64).uacc(&add3)
}

/// Sequential depths (root = 0).
pub fn depths(tree: &Tree<i64>) -> Tree<i64> {
    tree.dacc(0i64, &|c: &i64, _: &i64| c + 1, &|c: &i64, _: &i64| c + 1)
}
