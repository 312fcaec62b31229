//! White noise source.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Uniform white noise in [-1, 1).
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    rng: SmallRng,
}

impl WhiteNoise {
    pub fn new() -> Self {
        WhiteNoise {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn next_sample(&mut self) -> f64 {
        self.rng.gen_range(-1.0..1.0)
    }
}

impl Default for WhiteNoise {
    fn default() -> Self {
        Self::new()
    }
}
