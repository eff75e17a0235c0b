//! Combiner algebra
//!
//! `ReduceCombiner` and `DownwardCombiner` bundle the closure families the
//! segment algebra is driven by. The constructors below cover the stock
//! skeletons used by the CLI and the tests.

mod combiner;

pub use combiner::{DownwardCombiner, ReduceCombiner};

use std::ops::Add;

/// Sum of every value in the tree (node count after mapping to 1).
pub fn sum<A>() -> ReduceCombiner<A, A>
where
    A: Clone + Add<Output = A> + Send + Sync + 'static,
{
    fn add3<A: Clone + Add<Output = A>>(l: &A, b: &A, r: &A) -> A {
        l.clone() + b.clone() + r.clone()
    }
    ReduceCombiner::new(add3, A::clone, add3, add3, add3)
}

/// Context for `height`: `max(max(x, y) + shift, floor)` over the hole's children heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightContext {
    /// Edges between the hole and the context root
    pub shift: i64,
    /// Best height reachable without passing through the hole
    pub floor: i64,
}

/// Subtree height (edges). Values are ignored; leaves must be mapped to 0.
pub fn height() -> ReduceCombiner<i64, HeightContext> {
    ReduceCombiner::new(
        |l: &i64, _: &i64, r: &i64| 1 + l.max(r),
        |_: &i64| HeightContext { shift: 1, floor: 0 },
        |l: &i64, c: &HeightContext, r: &i64| (l.max(r) + c.shift).max(c.floor),
        |l: &HeightContext, c: &HeightContext, r: &i64| HeightContext {
            shift: l.shift + c.shift,
            floor: (l.floor + c.shift).max(r + c.shift).max(c.floor),
        },
        |l: &i64, c: &HeightContext, r: &HeightContext| HeightContext {
            shift: r.shift + c.shift,
            floor: (r.floor + c.shift).max(l + c.shift).max(c.floor),
        },
    )
}

/// Context for `preorder_concat`: `prefix ++ x ++ middle ++ y ++ suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Splice {
    /// Text before the left hole child
    pub prefix: String,
    /// Text between the two hole children
    pub middle: String,
    /// Text after the right hole child
    pub suffix: String,
}

/// Pre-order concatenation of string values; order-sensitive.
pub fn preorder_concat() -> ReduceCombiner<String, Splice> {
    ReduceCombiner::new(
        |l: &String, b: &String, r: &String| format!("{b}{l}{r}"),
        |b: &String| Splice {
            prefix: b.clone(),
            ..Splice::default()
        },
        |l: &String, c: &Splice, r: &String| {
            format!("{}{l}{}{r}{}", c.prefix, c.middle, c.suffix)
        },
        |l: &Splice, c: &Splice, r: &String| Splice {
            prefix: format!("{}{}", c.prefix, l.prefix),
            middle: l.middle.clone(),
            suffix: format!("{}{}{r}{}", l.suffix, c.middle, c.suffix),
        },
        |l: &String, c: &Splice, r: &Splice| Splice {
            prefix: format!("{}{l}{}{}", c.prefix, c.middle, r.prefix),
            middle: r.middle.clone(),
            suffix: format!("{}{}", r.suffix, c.suffix),
        },
    )
}

/// Depth of every node (root = 0).
pub fn depth<A: 'static>() -> DownwardCombiner<A, i64, i64> {
    DownwardCombiner::new(
        |c: &i64, _: &A| c + 1,
        |c: &i64, _: &A| c + 1,
        |_: &A| 1,
        |_: &A| 1,
        |a: &i64, b: &i64| a + b,
        |c: &i64, d: &i64| c + d,
    )
}

/// Number of left turns on the path from the root.
pub fn left_turns<A: 'static>() -> DownwardCombiner<A, i64, i64> {
    DownwardCombiner::new(
        |c: &i64, _: &A| c + 1,
        |c: &i64, _: &A| *c,
        |_: &A| 1,
        |_: &A| 0,
        |a: &i64, b: &i64| a + b,
        |c: &i64, d: &i64| c + d,
    )
}

/// Sum of the ancestors' values (root receives the seed).
pub fn path_sum<A>() -> DownwardCombiner<A, A, A>
where
    A: Clone + Add<Output = A> + Send + Sync + 'static,
{
    fn add2<A: Clone + Add<Output = A>>(a: &A, b: &A) -> A {
        a.clone() + b.clone()
    }
    DownwardCombiner::new(add2, add2, A::clone, A::clone, add2, add2)
}
