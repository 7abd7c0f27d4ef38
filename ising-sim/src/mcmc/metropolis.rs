use crate::geometry::Lattice;
use crate::spins::{self, energy::local_delta_energy_at};
use rand::Rng;

/// Metropolis acceptance probability `min(1, exp(-beta * dE))`.
///
/// Returns exactly `1.0` when `dE <= 0`, without evaluating the exponential,
/// so an infinite `beta` never produces `NaN`.
#[inline]
pub fn acceptance_probability(beta: f64, delta_energy: f64) -> f64 {
    if delta_energy <= 0.0 {
        return 1.0;
    }
    (-beta * delta_energy).exp().min(1.0)
}

/// Outcome of one proposed single-spin flip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    /// Flat index of the proposed site.
    pub site: usize,
    /// Energy change of the flip.
    pub delta_energy: f64,
    /// Whether the flip was applied.
    pub accepted: bool,
}

/// Propose flipping one uniformly chosen site and apply the Metropolis rule.
#[inline]
pub fn metropolis_step<R: Rng>(
    lattice: &Lattice,
    spins: &mut [i8],
    beta: f64,
    rng: &mut R,
) -> Proposal {
    let i = rng.gen_range(0..lattice.size);
    let j = rng.gen_range(0..lattice.size);
    let site = lattice.index(i, j);

    let delta_energy = local_delta_energy_at(lattice, spins, site);
    let p = acceptance_probability(beta, delta_energy);
    let accepted = rng.gen::<f64>() < p;
    if accepted {
        spins::flip(spins, site);
    }

    Proposal {
        site,
        delta_energy,
        accepted,
    }
}

/// One sweep: `n_spins` random-site proposals. Returns the summed energy
/// change of the accepted flips and the number accepted.
#[cfg_attr(feature = "profile", inline(never))]
pub fn metropolis_sweep<R: Rng>(
    lattice: &Lattice,
    spins: &mut [i8],
    beta: f64,
    rng: &mut R,
) -> (f64, usize) {
    let mut delta = 0.0;
    let mut n_accepted = 0;
    for _ in 0..lattice.n_spins {
        let prop = metropolis_step(lattice, spins, beta, rng);
        if prop.accepted {
            delta += prop.delta_energy;
            n_accepted += 1;
        }
    }
    (delta, n_accepted)
}

/// Lifecycle of a Metropolis chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Energy stabilized; `step` is the proposal count at detection.
    Converged { step: u64 },
    /// The proposal budget was exhausted first.
    MaxIterations,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Step bookkeeping and termination state for one chain.
#[derive(Debug, Clone)]
pub struct MetropolisSampler {
    pub beta: f64,
    pub max_steps: u64,
    pub steps: u64,
    pub accepted: u64,
    state: RunState,
}

impl MetropolisSampler {
    pub fn new(beta: f64, max_steps: u64) -> Self {
        Self {
            beta,
            max_steps,
            steps: 0,
            accepted: 0,
            state: if max_steps == 0 {
                RunState::MaxIterations
            } else {
                RunState::Running
            },
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Perform one proposal. A no-op once the chain has terminated.
    pub fn step<R: Rng>(
        &mut self,
        lattice: &Lattice,
        spins: &mut [i8],
        rng: &mut R,
    ) -> Option<Proposal> {
        if !self.state.is_running() {
            return None;
        }
        let prop = metropolis_step(lattice, spins, self.beta, rng);
        self.steps += 1;
        if prop.accepted {
            self.accepted += 1;
        }
        if self.steps >= self.max_steps {
            self.state = RunState::MaxIterations;
        }
        Some(prop)
    }

    /// Mark the chain converged at the current step. Ignored after termination.
    pub fn converge(&mut self) {
        if self.state.is_running() {
            self.state = RunState::Converged { step: self.steps };
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.accepted as f64 / self.steps as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spins::{energy::total_energy, fill, randomize, Spin};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_acceptance_probability_bounds() {
        for beta in [0.0, 1e-6, 0.44, 1.0, 10.0, 1e4, f64::INFINITY] {
            for de in [-8.0, -4.0, 0.0, 4.0, 8.0] {
                let p = acceptance_probability(beta, de);
                assert!((0.0..=1.0).contains(&p), "p={p} beta={beta} dE={de}");
                if de <= 0.0 {
                    assert_eq!(p, 1.0);
                }
            }
        }
        assert_eq!(acceptance_probability(0.0, 8.0), 1.0);
        assert_eq!(acceptance_probability(f64::INFINITY, 4.0), 0.0);
        assert!((acceptance_probability(0.5, 4.0) - (-2.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_spins_stay_valid() {
        let lat = Lattice::new(7);
        let mut rng = Xoshiro256StarStar::seed_from_u64(5);
        let mut spins = vec![0i8; lat.n_spins];
        randomize(&mut spins, 30, &mut rng);
        for _ in 0..50 {
            metropolis_sweep(&lat, &mut spins, 0.4, &mut rng);
            assert!(spins.iter().all(|&s| s == 1 || s == -1));
        }
    }

    #[test]
    fn test_sweep_delta_tracks_energy() {
        let lat = Lattice::new(10);
        let mut rng = Xoshiro256StarStar::seed_from_u64(9);
        let mut spins = vec![0i8; lat.n_spins];
        randomize(&mut spins, 50, &mut rng);
        let mut energy = total_energy(&lat, &spins, true);
        for _ in 0..20 {
            let (delta, _) = metropolis_sweep(&lat, &mut spins, 0.3, &mut rng);
            energy += delta;
            assert_eq!(energy, total_energy(&lat, &spins, true));
        }
    }

    #[test]
    fn test_infinite_temperature_accepts_everything() {
        let lat = Lattice::new(2);
        let mut rng = Xoshiro256StarStar::seed_from_u64(21);
        let mut spins = vec![0i8; lat.n_spins];
        fill(&mut spins, Spin::Up);

        let mut sampler = MetropolisSampler::new(0.0, 40_000);
        let mut up_count = 0u64;
        while let Some(prop) = sampler.step(&lat, &mut spins, &mut rng) {
            assert!(prop.accepted);
            up_count += spins.iter().filter(|&&s| s == 1).count() as u64;
        }
        assert_eq!(sampler.accepted, 40_000);
        assert_eq!(sampler.state(), RunState::MaxIterations);
        // Time-averaged up fraction approaches 1/2.
        let frac = up_count as f64 / (40_000.0 * lat.n_spins as f64);
        assert!((frac - 0.5).abs() < 0.05, "up fraction {frac}");
    }

    #[test]
    fn test_zero_temperature_keeps_ground_state() {
        let lat = Lattice::new(2);
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);
        let mut spins = vec![0i8; lat.n_spins];
        fill(&mut spins, Spin::Up);

        let mut sampler = MetropolisSampler::new(f64::INFINITY, 10_000);
        while let Some(prop) = sampler.step(&lat, &mut spins, &mut rng) {
            assert!(prop.delta_energy > 0.0);
            assert!(!prop.accepted);
        }
        assert_eq!(sampler.accepted, 0);
        assert!(spins.iter().all(|&s| s == 1));
    }

    #[test]
    fn test_sampler_state_transitions() {
        let lat = Lattice::new(3);
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        let mut spins = vec![1i8; lat.n_spins];

        let mut sampler = MetropolisSampler::new(1.0, 5);
        assert_eq!(sampler.state(), RunState::Running);
        for _ in 0..3 {
            sampler.step(&lat, &mut spins, &mut rng);
        }
        sampler.converge();
        assert_eq!(sampler.state(), RunState::Converged { step: 3 });
        assert!(sampler.step(&lat, &mut spins, &mut rng).is_none());
        assert_eq!(sampler.steps, 3);

        let mut exhausted = MetropolisSampler::new(1.0, 2);
        exhausted.step(&lat, &mut spins, &mut rng);
        exhausted.step(&lat, &mut spins, &mut rng);
        assert_eq!(exhausted.state(), RunState::MaxIterations);
        exhausted.converge();
        assert_eq!(exhausted.state(), RunState::MaxIterations);
    }

    #[test]
    fn test_fixed_seed_reproducible() {
        let lat = Lattice::new(8);
        let run = || {
            let mut rng = Xoshiro256StarStar::seed_from_u64(123);
            let mut spins = vec![0i8; lat.n_spins];
            randomize(&mut spins, 50, &mut rng);
            let mut deltas = Vec::new();
            for _ in 0..30 {
                deltas.push(metropolis_sweep(&lat, &mut spins, 0.5, &mut rng));
            }
            (spins, deltas)
        };
        assert_eq!(run(), run());
    }
}
