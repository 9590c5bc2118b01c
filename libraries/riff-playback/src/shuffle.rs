//! Shuffle for play order
//!
//! Shuffling permutes queue indices, never the tracks themselves, so the
//! enqueue order is always available for restoring.

use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform random permutation of `0..len` (Fisher-Yates)
pub fn shuffled_order<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

/// Identity play order for `len` tracks
pub fn identity_order(len: usize) -> Vec<usize> {
    (0..len).collect()
}
