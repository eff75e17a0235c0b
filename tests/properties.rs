//! Property tests over random tree shapes, bounds and worker counts

mod common;

use common::{add3, depths, run_distributed, subtree_sizes};
use proptest::prelude::*;
use treeskel::{algebra, segment, Distribution, Tag, Tree};

fn arb_tree() -> impl Strategy<Value = Tree<i64>> {
    (1usize..121, proptest::collection::vec(0usize..64, 1..8))
        .prop_map(|(nodes, splits)| Tree::from_splits(nodes, &splits, |i| (i as i64 * 7) % 11 - 5))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn linearize_round_trips(tree in arb_tree(), bound in 1usize..40) {
        let ltree = tree.linearize(bound).unwrap();
        prop_assert_eq!(ltree.node_count(), tree.size());
        for segment in ltree.segments() {
            prop_assert!(segment::check_arity(segment).is_ok());
            let criticals = segment.iter().filter(|entry| entry.tag == Tag::Critical).count();
            prop_assert!(criticals <= 1, "segment carries {} Critical nodes", criticals);
        }
        prop_assert_eq!(ltree.clone().rebuild().unwrap(), tree.clone());
        prop_assert_eq!(tree.linearize(bound).unwrap(), ltree);
    }

    #[test]
    fn distribution_covers_every_segment(
        sizes in proptest::collection::vec(1usize..50, 1..40),
        workers in 1usize..9,
    ) {
        let distribution = Distribution::for_segments(&sizes, workers).unwrap();
        prop_assert_eq!(distribution.counts().len(), workers);
        prop_assert_eq!(distribution.counts().iter().sum::<usize>(), sizes.len());
        prop_assert_eq!(distribution.global_size(), sizes.iter().sum::<usize>());
        for worker in 0..workers {
            let mut offset = 0;
            for span in distribution.spans(worker) {
                prop_assert_eq!(span.offset, offset);
                offset += span.len;
            }
            prop_assert_eq!(distribution.local_size(worker), offset);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn distributed_skeletons_match_sequential(
        tree in arb_tree(),
        bound in 1usize..30,
        workers in 1usize..5,
    ) {
        let outcome = run_distributed(&tree, bound, workers, |coordinator, shard| {
            let ones = coordinator.map(shard, |_| 1i64, |_| 1i64)?;
            let zeros = coordinator.map(shard, |_| 0i64, |_| 0i64)?;
            let text = coordinator.map(shard, |v| v.to_string(), |v| v.to_string())?;
            let total = coordinator.reduce(shard, &algebra::sum())?;
            let sizes = coordinator.uacc(&ones, &algebra::sum())?;
            let heights = coordinator.uacc(&zeros, &algebra::height())?;
            let spellings = coordinator.uacc(&text, &algebra::preorder_concat())?;
            let depths = coordinator.dacc(shard, &algebra::depth(), 0)?;
            let sizes = coordinator.collect(&sizes)?;
            let heights = coordinator.collect(&heights)?;
            let spellings = coordinator.collect(&spellings)?;
            let depths = coordinator.collect(&depths)?;
            Ok(match (total, sizes, heights, spellings, depths) {
                (Some(total), Some(s), Some(h), Some(w), Some(d)) => {
                    Some((total, s.rebuild()?, h.rebuild()?, w.rebuild()?, d.rebuild()?))
                }
                _ => None,
            })
        });
        let (total, sizes, heights, spellings, depths_found) = outcome;
        let text = tree.map(&|v: &i64| v.to_string(), &|v: &i64| v.to_string());
        let zeros = tree.map(&|_: &i64| 0i64, &|_: &i64| 0i64);
        prop_assert_eq!(total, tree.reduce(&add3));
        prop_assert_eq!(sizes, subtree_sizes(&tree));
        prop_assert_eq!(heights, zeros.uacc(&|l: &i64, _: &i64, r: &i64| 1 + l.max(r)));
        prop_assert_eq!(
            spellings,
            text.uacc(&|l: &String, b: &String, r: &String| format!("{b}{l}{r}"))
        );
        prop_assert_eq!(depths_found, depths(&tree));
    }
}
