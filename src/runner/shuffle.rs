//! Randomized spec file ordering.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Permutes `items` in place with a uniform Fisher-Yates shuffle.
///
/// Position `i` is swapped with a uniformly chosen position from the
/// not-yet-shuffled suffix `i..len`, so every permutation is equally likely.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    let len = items.len();
    for i in 0..len {
        let j = rng.gen_range(i..len);
        items.swap(i, j);
    }
}

/// The generator used for `--random` runs. Reusing a seed replays the order.
pub fn seeded_rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}
