//! Combiner bundles for the reduce and accumulate skeletons
//!
//! Reduce family, over tree values `A` and contexts `C` (a partial result
//! with one hole where a Critical node's two children go):
//!
//!   k(l, b, r) = ψn(l, φ(b), r)
//!   ψn(ψn(x, l, y), b, r) = ψn(x, ψl(l, b, r), y)
//!   ψn(l, b, ψn(x, r, y)) = ψn(x, ψr(l, b, r), y)
//!
//! Downward family, over accumulators `C` and path summaries `D`:
//!
//!   gl(c, b) = ψd(c, φl(b)),  gr(c, b) = ψd(c, φr(b))
//!   ψd(ψd(c, a), b) = ψd(c, ψu(a, b))
//!
//! The laws are never checked at runtime; an inconsistent bundle silently
//! yields wrong results.

use std::fmt;
use std::sync::Arc;

type Unary<X, R> = Arc<dyn Fn(&X) -> R + Send + Sync>;
type Binary<X, Y, R> = Arc<dyn Fn(&X, &Y) -> R + Send + Sync>;
type Ternary<X, Y, Z, R> = Arc<dyn Fn(&X, &Y, &Z) -> R + Send + Sync>;

/// Closure bundle for reduce and upward accumulation
pub struct ReduceCombiner<A, C> {
    k: Ternary<A, A, A, A>,
    phi: Unary<A, C>,
    psi_n: Ternary<A, C, A, A>,
    psi_l: Ternary<C, C, A, C>,
    psi_r: Ternary<A, C, C, C>,
}

impl<A, C> ReduceCombiner<A, C> {
    /// Bundle the five closures.
    pub fn new(
        k: impl Fn(&A, &A, &A) -> A + Send + Sync + 'static,
        phi: impl Fn(&A) -> C + Send + Sync + 'static,
        psi_n: impl Fn(&A, &C, &A) -> A + Send + Sync + 'static,
        psi_l: impl Fn(&C, &C, &A) -> C + Send + Sync + 'static,
        psi_r: impl Fn(&A, &C, &C) -> C + Send + Sync + 'static,
    ) -> Self {
        Self {
            k: Arc::new(k),
            phi: Arc::new(phi),
            psi_n: Arc::new(psi_n),
            psi_l: Arc::new(psi_l),
            psi_r: Arc::new(psi_r),
        }
    }

    /// Full combine of two complete children around a node value.
    #[inline]
    pub fn k(&self, left: &A, value: &A, right: &A) -> A {
        (self.k)(left, value, right)
    }

    /// Context for a node whose children are both unknown.
    #[inline]
    pub fn phi(&self, value: &A) -> C {
        (self.phi)(value)
    }

    /// Fill a context's hole with its two children.
    #[inline]
    pub fn psi_n(&self, left: &A, context: &C, right: &A) -> A {
        (self.psi_n)(left, context, right)
    }

    /// Node context whose left child is itself a context.
    #[inline]
    pub fn psi_l(&self, left: &C, context: &C, right: &A) -> C {
        (self.psi_l)(left, context, right)
    }

    /// Node context whose right child is itself a context.
    #[inline]
    pub fn psi_r(&self, left: &A, context: &C, right: &C) -> C {
        (self.psi_r)(left, context, right)
    }
}

impl<A, C> Clone for ReduceCombiner<A, C> {
    fn clone(&self) -> Self {
        Self {
            k: Arc::clone(&self.k),
            phi: Arc::clone(&self.phi),
            psi_n: Arc::clone(&self.psi_n),
            psi_l: Arc::clone(&self.psi_l),
            psi_r: Arc::clone(&self.psi_r),
        }
    }
}

impl<A, C> fmt::Debug for ReduceCombiner<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReduceCombiner").finish_non_exhaustive()
    }
}

/// Closure bundle for downward accumulation
pub struct DownwardCombiner<A, C, D> {
    gl: Binary<C, A, C>,
    gr: Binary<C, A, C>,
    phi_l: Unary<A, D>,
    phi_r: Unary<A, D>,
    psi_u: Binary<D, D, D>,
    psi_d: Binary<C, D, C>,
}

impl<A, C, D> DownwardCombiner<A, C, D> {
    /// Bundle the six closures.
    pub fn new(
        gl: impl Fn(&C, &A) -> C + Send + Sync + 'static,
        gr: impl Fn(&C, &A) -> C + Send + Sync + 'static,
        phi_l: impl Fn(&A) -> D + Send + Sync + 'static,
        phi_r: impl Fn(&A) -> D + Send + Sync + 'static,
        psi_u: impl Fn(&D, &D) -> D + Send + Sync + 'static,
        psi_d: impl Fn(&C, &D) -> C + Send + Sync + 'static,
    ) -> Self {
        Self {
            gl: Arc::new(gl),
            gr: Arc::new(gr),
            phi_l: Arc::new(phi_l),
            phi_r: Arc::new(phi_r),
            psi_u: Arc::new(psi_u),
            psi_d: Arc::new(psi_d),
        }
    }

    /// Accumulator handed to a left child.
    #[inline]
    pub fn gl(&self, acc: &C, value: &A) -> C {
        (self.gl)(acc, value)
    }

    /// Accumulator handed to a right child.
    #[inline]
    pub fn gr(&self, acc: &C, value: &A) -> C {
        (self.gr)(acc, value)
    }

    /// Path step through a node into its left child.
    #[inline]
    pub fn phi_l(&self, value: &A) -> D {
        (self.phi_l)(value)
    }

    /// Path step through a node into its right child.
    #[inline]
    pub fn phi_r(&self, value: &A) -> D {
        (self.phi_r)(value)
    }

    /// Compose an upper path step with a lower one.
    #[inline]
    pub fn psi_u(&self, upper: &D, lower: &D) -> D {
        (self.psi_u)(upper, lower)
    }

    /// Push an accumulator down a composed path.
    #[inline]
    pub fn psi_d(&self, acc: &C, path: &D) -> C {
        (self.psi_d)(acc, path)
    }
}

impl<A, C, D> Clone for DownwardCombiner<A, C, D> {
    fn clone(&self) -> Self {
        Self {
            gl: Arc::clone(&self.gl),
            gr: Arc::clone(&self.gr),
            phi_l: Arc::clone(&self.phi_l),
            phi_r: Arc::clone(&self.phi_r),
            psi_u: Arc::clone(&self.psi_u),
            psi_d: Arc::clone(&self.psi_d),
        }
    }
}

impl<A, C, D> fmt::Debug for DownwardCombiner<A, C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownwardCombiner").finish_non_exhaustive()
    }
}
