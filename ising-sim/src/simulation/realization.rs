use crate::config::{InitMode, SimConfig, DEFAULT_BIAS_PERCENT};
use crate::error::Result;
use crate::geometry::Lattice;
use crate::spins::{self, energy::total_energy};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use validator::Validate;

/// Mutable state of one Metropolis chain.
///
/// Owns the lattice geometry, the spin configuration (flat row-major
/// `Vec<i8>` of +1/−1), the chain's PRNG and the cached total energy. The
/// cached energy is kept in sync with `spins` by the driver.
pub struct Realization {
    pub lattice: Lattice,
    /// Spin configuration, length `lattice.n_spins`.
    pub spins: Vec<i8>,
    pub rng: Xoshiro256StarStar,
    /// Cached total energy of `spins`.
    pub energy: f64,
}

impl Realization {
    /// Build the lattice, seed the PRNG with `config.seed` and initialize spins.
    ///
    /// Fails with [`SimError::Validation`](crate::SimError::Validation) for an
    /// invalid `config`.
    pub fn new(config: &SimConfig) -> Result<Self> {
        config.validate()?;
        let lattice = Lattice::new(config.lattice_size);
        let spins = vec![1i8; lattice.n_spins];
        let mut real = Self {
            lattice,
            spins,
            rng: Xoshiro256StarStar::seed_from_u64(config.seed),
            energy: 0.0,
        };
        real.reset(config.init, config.seed, config.sequential);
        Ok(real)
    }

    /// Reseed the PRNG and re-initialize all spins.
    pub fn reset(&mut self, init: InitMode, seed: u64, sequential: bool) {
        self.rng = Xoshiro256StarStar::seed_from_u64(seed);
        match init {
            InitMode::Uniform(spin) => spins::fill(&mut self.spins, spin),
            InitMode::Random { .. } => {
                let bias = init
                    .effective_bias()
                    .unwrap_or(DEFAULT_BIAS_PERCENT as u32);
                spins::randomize(&mut self.spins, bias, &mut self.rng);
            }
        }
        self.energy = total_energy(&self.lattice, &self.spins, sequential);
    }
}
