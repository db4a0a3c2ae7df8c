//! Shuffle algorithms for queue randomization
//!
//! Fisher-Yates permutation of queue positions plus the uniform pick used by
//! shuffled next/previous navigation.

use rand::seq::SliceRandom;
use rand::Rng;

/// Pure random shuffle using Fisher-Yates algorithm
///
/// Each element has equal probability of landing at any position and every
/// element appears exactly once afterwards.
pub fn shuffle_order<T, R: Rng + ?Sized>(order: &mut [T], rng: &mut R) {
    order.shuffle(rng);
}

/// Uniformly random index in `[0, len)`, `None` for an empty range
///
/// Consecutive calls may return the same index.
pub fn random_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(rng.gen_range(0..len))
    }
}
