// Small xorshift64* PRNG, seedable for reproducible layouts.
//
// This is NOT cryptographically secure.
// It is used only for layout jitter and reproducible golden tests.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    /// Seed from the wall clock. Used by [`SeedPolicy::Entropy`].
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        // Mix so consecutive calls within the same tick still diverge.
        Self::new(nanos ^ 0xD1B54A32D192ED03u64.wrapping_mul(nanos.rotate_left(17)))
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        // Marsaglia / Vigna family. Simple, fast, decent for layout noise.
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline]
    pub fn next_f32_01(&mut self) -> f32 {
        // Convert to [0,1).
        let x = self.next_u32() >> 8;
        (x as f32) / ((1u32 << 24) as f32)
    }

    #[inline]
    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32_01()
    }

    #[inline]
    pub fn gen_range_usize(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span = (high - low) as u32;
        let v = self.next_u32() % span;
        low + v as usize
    }
}

/// Which random source a layout regeneration draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedPolicy {
    /// Every regeneration restarts from the same seed: identical inputs give
    /// identical layouts.
    Fixed(u64),
    /// Reseed from the wall clock on every regeneration.
    #[default]
    Entropy,
}

impl SeedPolicy {
    pub fn rng(self) -> Prng {
        match self {
            SeedPolicy::Fixed(seed) => Prng::new(seed),
            SeedPolicy::Entropy => Prng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_seed_is_reproducible() {
        let mut a = SeedPolicy::Fixed(7).rng();
        let mut b = SeedPolicy::Fixed(7).rng();
        for _ in 0..32 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn unit_interval_stays_half_open() {
        let mut rng = Prng::new(1);
        for _ in 0..10_000 {
            let x = rng.next_f32_01();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn gen_range_usize_handles_empty_span() {
        let mut rng = Prng::new(3);
        assert_eq!(rng.gen_range_usize(5, 5), 5);
        for _ in 0..100 {
            let v = rng.gen_range_usize(2, 6);
            assert!((2..6).contains(&v));
        }
    }
}
