use rand::{rngs::StdRng, Rng, SeedableRng};

/// Source of uniform integers consumed by the scramble generator
pub trait RandomSource {
    /// Returns an integer in `[0, n)`. `n` is never zero.
    fn uniform(&mut self, n: usize) -> usize;
}

/// `rand`-backed random source
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible source, mostly for tests
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl Default for RngSource<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Each value is reduced modulo the requested bound, so a script can be
/// written against the index it wants without caring about `n`.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<usize>,
    pos: usize,
}

impl ScriptedSource {
    pub fn new(draws: Vec<usize>) -> Self {
        assert!(!draws.is_empty(), "scripted source needs at least one draw");
        Self { draws, pos: 0 }
    }

    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl RandomSource for ScriptedSource {
    fn uniform(&mut self, n: usize) -> usize {
        let value = self.draws[self.pos % self.draws.len()];
        self.pos += 1;
        value % n
    }
}
