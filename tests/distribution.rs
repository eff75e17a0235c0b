//! Greedy segment assignment tables

use test_case::test_case;
use treeskel::{Distribution, SkeletonError};

#[test_case(&[5, 3, 3, 5, 5, 1, 1, 3], 3, &[2, 2, 4]; "greedy example")]
#[test_case(&[4, 4, 4, 4], 2, &[2, 2]; "even split")]
#[test_case(&[4, 4, 4, 4], 1, &[4]; "single worker")]
#[test_case(&[1, 1, 1, 9], 2, &[3, 1]; "heavy tail")]
#[test_case(&[9, 1, 1, 1], 2, &[1, 3]; "heavy head")]
#[test_case(&[3, 3], 4, &[1, 1, 0, 0]; "idle workers")]
#[test_case(&[7], 3, &[1, 0, 0]; "single segment")]
fn greedy_counts(sizes: &[usize], workers: usize, expected: &[usize]) {
    let distribution = Distribution::for_segments(sizes, workers).unwrap();
    assert_eq!(distribution.counts(), expected);
}

#[test]
fn index_restarts_per_worker() {
    let distribution = Distribution::for_segments(&[5, 3, 3, 5, 5, 1, 1, 3], 3).unwrap();
    let spans: Vec<Vec<(usize, usize)>> = (0..3)
        .map(|worker| {
            distribution
                .spans(worker)
                .iter()
                .map(|span| (span.offset, span.len))
                .collect()
        })
        .collect();
    assert_eq!(
        spans,
        vec![
            vec![(0, 5), (5, 3)],
            vec![(0, 3), (3, 5)],
            vec![(0, 5), (5, 1), (6, 1), (7, 3)],
        ]
    );
}

#[test]
fn zero_workers_rejected() {
    assert!(matches!(
        Distribution::for_segments(&[1, 2], 0),
        Err(SkeletonError::InvalidConfig(_))
    ));
}

#[test]
fn no_segments_rejected() {
    assert!(matches!(
        Distribution::for_segments(&[], 2),
        Err(SkeletonError::EmptyInput(_))
    ));
}
