use crate::mcmc::RunState;

/// One entry of the energy trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    /// Proposal count (or sweep count, for sweep-cadence traces) at recording.
    pub index: u64,
    /// Total lattice energy.
    pub energy: f64,
}

/// Per-spin observables averaged over the measurement sweeps.
///
/// All fields are zero when no sweep was measured (e.g. the run ended
/// during warmup).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observables {
    /// Number of sweeps that contributed.
    pub n_samples: usize,
    /// ⟨e⟩, mean energy per spin.
    pub energy: f64,
    /// ⟨e²⟩.
    pub energy2: f64,
    /// ⟨|m|⟩, mean absolute magnetization per spin.
    pub abs_mag: f64,
    /// ⟨m²⟩.
    pub mag2: f64,
    /// ⟨m⁴⟩.
    pub mag4: f64,
}

/// `scale * variance`; zero when the variance vanishes, even for infinite `beta`.
#[inline]
fn scaled_variance(scale: f64, variance: f64) -> f64 {
    if variance <= 0.0 {
        0.0
    } else {
        scale * variance
    }
}

impl Observables {
    /// Specific heat per spin, `beta² N (⟨e²⟩ − ⟨e⟩²)`.
    pub fn specific_heat(&self, beta: f64, n_spins: usize) -> f64 {
        scaled_variance(
            beta * beta * n_spins as f64,
            self.energy2 - self.energy * self.energy,
        )
    }

    /// Magnetic susceptibility per spin, `beta N (⟨m²⟩ − ⟨|m|⟩²)`.
    pub fn susceptibility(&self, beta: f64, n_spins: usize) -> f64 {
        scaled_variance(
            beta * n_spins as f64,
            self.mag2 - self.abs_mag * self.abs_mag,
        )
    }

    /// Binder cumulant `1 − ⟨m⁴⟩ / (3 ⟨m²⟩²)`.
    pub fn binder_cumulant(&self) -> f64 {
        if self.mag2 == 0.0 {
            return 0.0;
        }
        1.0 - self.mag4 / (3.0 * self.mag2 * self.mag2)
    }
}

/// Outcome of one Metropolis chain.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub temperature: f64,
    pub beta: f64,
    /// Terminal state: `Converged` or `MaxIterations`.
    pub state: RunState,
    /// Proposals made.
    pub steps: u64,
    /// Proposals accepted.
    pub accepted: u64,
    pub initial_energy: f64,
    pub final_energy: f64,
    /// Final magnetization per spin.
    pub magnetization: f64,
    /// Final spin configuration, row-major.
    pub spins: Vec<i8>,
    pub energy_trace: Vec<EnergySample>,
    pub observables: Observables,
}

impl RunResult {
    pub fn acceptance_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.accepted as f64 / self.steps as f64
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self.state, RunState::Converged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_derived_quantities() {
        let obs = Observables {
            n_samples: 10,
            energy: -1.5,
            energy2: 2.5,
            abs_mag: 0.5,
            mag2: 0.5,
            mag4: 0.3,
        };
        assert_relative_eq!(obs.specific_heat(0.5, 16), 0.25 * 16.0 * 0.25);
        assert_relative_eq!(obs.susceptibility(0.5, 16), 0.5 * 16.0 * 0.25);
        assert_relative_eq!(obs.binder_cumulant(), 1.0 - 0.3 / 0.75);
    }

    #[test]
    fn test_ordered_binder_is_two_thirds() {
        let obs = Observables {
            n_samples: 1,
            abs_mag: 1.0,
            mag2: 1.0,
            mag4: 1.0,
            ..Default::default()
        };
        assert_relative_eq!(obs.binder_cumulant(), 2.0 / 3.0);
        assert_eq!(Observables::default().binder_cumulant(), 0.0);
    }

    #[test]
    fn test_zero_temperature_fluctuations_are_zero() {
        // Frozen ground state sampled at T = 0
        let obs = Observables {
            n_samples: 20,
            energy: -2.0,
            energy2: 4.0,
            abs_mag: 1.0,
            mag2: 1.0,
            mag4: 1.0,
        };
        assert_eq!(obs.specific_heat(f64::INFINITY, 64), 0.0);
        assert_eq!(obs.susceptibility(f64::INFINITY, 64), 0.0);
    }
}
