//! The single pseudo-random stream shared by both samplers of a run.

use rand::rngs::StdRng;
use rand::{Error, Rng, RngCore, SeedableRng};

/// Seeded random source. Passed by `&mut` to every sampler trial so that the
/// trial ordering, and with it every statistic, is reproducible from the seed.
#[derive(Clone, Debug)]
pub struct RandomStream {
    rng: StdRng,
    seed: u64,
}

impl RandomStream {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed from the thread RNG; the chosen seed is still recorded.
    pub fn from_entropy() -> Self {
        let seed = rand::thread_rng().gen::<u64>();
        Self::from_seed(seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform deviate in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform deviate in `[-1, 1)`.
    #[inline]
    pub fn symmetric(&mut self) -> f64 {
        2.0 * self.rng.gen::<f64>() - 1.0
    }

    /// Uniform index in `0..n`. `n` must be positive.
    #[inline]
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }
}

impl RngCore for RandomStream {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.rng.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RandomStream::from_seed(42);
        let mut b = RandomStream::from_seed(42);
        for _ in 0..100 {
            assert_eq!(a.uniform().to_bits(), b.uniform().to_bits());
        }
    }

    #[test]
    fn test_ranges() {
        let mut rng = RandomStream::from_seed(7);
        for _ in 0..1000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
            let s = rng.symmetric();
            assert!((-1.0..1.0).contains(&s));
            assert!(rng.index(5) < 5);
        }
    }
}
