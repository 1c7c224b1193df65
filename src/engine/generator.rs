use anyhow::{ensure, Result};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produce `size` independent values drawn uniformly from `[min_value, max_value]`.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    size: usize,
    min_value: u32,
    max_value: u32,
) -> Result<Vec<u32>> {
    ensure!(
        min_value <= max_value,
        "min value {min_value} exceeds max value {max_value}"
    );
    let dist = Uniform::new_inclusive(min_value, max_value);
    Ok((0..size).map(|_| rng.sample(dist)).collect())
}

/// Seeded when a seed is given, otherwise from OS entropy.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}
