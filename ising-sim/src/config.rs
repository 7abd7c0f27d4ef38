use crate::spins::Spin;
use validator::{Validate, ValidationError};

/// Bias used when a requested percentage is outside `0..=100`.
pub const DEFAULT_BIAS_PERCENT: i32 = 50;

/// Largest supported lattice extent (site indices must fit in `u32`).
pub const MAX_LATTICE_SIZE: usize = 1 << 15;

/// How the lattice is filled before the first proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitMode {
    /// Each spin is `+1` with probability `bias_percent / 100`.
    Random { bias_percent: i32 },
    /// Every spin set to the same orientation.
    Uniform(Spin),
}

impl InitMode {
    /// Bias percentage after normalization: values outside `0..=100` fall back
    /// to [`DEFAULT_BIAS_PERCENT`]. `None` for uniform initialization.
    pub fn effective_bias(&self) -> Option<u32> {
        match *self {
            Self::Random { bias_percent } if (0..=100).contains(&bias_percent) => {
                Some(bias_percent as u32)
            }
            Self::Random { bias_percent } => {
                log::warn!(
                    "bias {bias_percent}% outside 0..=100, using {DEFAULT_BIAS_PERCENT}%"
                );
                Some(DEFAULT_BIAS_PERCENT as u32)
            }
            Self::Uniform(_) => None,
        }
    }
}

impl Default for InitMode {
    fn default() -> Self {
        Self::Random {
            bias_percent: DEFAULT_BIAS_PERCENT,
        }
    }
}

/// When a trace sample or lattice snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordPolicy {
    /// After every proposal, accepted or not.
    EveryStep,
    /// After every accepted flip.
    Accepted,
    /// Once per completed sweep.
    Sweep,
}

impl TryFrom<&str> for RecordPolicy {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "every" | "step" => Ok(Self::EveryStep),
            "accepted" => Ok(Self::Accepted),
            "sweep" => Ok(Self::Sweep),
            _ => Err(format!(
                "unknown record policy '{s}', expected 'every', 'accepted', or 'sweep'"
            )),
        }
    }
}

fn validate_convergence_config(cfg: &ConvergenceConfig) -> Result<(), ValidationError> {
    if cfg.window < 1 {
        return Err(ValidationError::new("convergence window must be >= 1"));
    }
    if !(cfg.threshold >= 0.0) {
        return Err(ValidationError::new(
            "convergence threshold must be a non-negative number",
        ));
    }
    if cfg.interval == Some(0) {
        return Err(ValidationError::new("convergence interval must be >= 1"));
    }
    Ok(())
}

/// Windowed energy-stabilization check.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_convergence_config"))]
pub struct ConvergenceConfig {
    /// Number of samples between the two compared energies.
    pub window: usize,
    /// Stop when `|E_now - E_window_ago| < threshold`.
    pub threshold: f64,
    /// Proposals between energy samples; `None` means one sweep (`N²`).
    pub interval: Option<usize>,
}

fn validate_sim_config(cfg: &SimConfig) -> Result<(), ValidationError> {
    if cfg.lattice_size < 2 {
        return Err(ValidationError::new("lattice_size must be >= 2"));
    }
    if cfg.lattice_size > MAX_LATTICE_SIZE {
        return Err(ValidationError::new("lattice_size too large"));
    }
    if !(cfg.temperature >= 0.0) {
        return Err(ValidationError::new(
            "temperature must be a non-negative number",
        ));
    }
    if !(cfg.boltzmann > 0.0 && cfg.boltzmann.is_finite()) {
        return Err(ValidationError::new(
            "boltzmann constant must be positive and finite",
        ));
    }
    if cfg.max_steps < 1 {
        return Err(ValidationError::new("max_steps must be >= 1"));
    }
    if cfg.trace_limit == Some(0) {
        return Err(ValidationError::new("trace_limit must be >= 1"));
    }
    Ok(())
}

/// Parameters of one Metropolis run. Immutable once the run starts.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_sim_config"))]
pub struct SimConfig {
    /// Linear extent `N` of the `N x N` lattice.
    pub lattice_size: usize,
    pub temperature: f64,
    pub boltzmann: f64,
    /// Proposal budget.
    pub max_steps: u64,
    pub init: InitMode,
    #[validate]
    pub convergence: Option<ConvergenceConfig>,
    pub trace: RecordPolicy,
    /// Keep only the most recent samples of the energy trace.
    pub trace_limit: Option<usize>,
    /// Snapshot cadence when a sink is attached; `None` disables snapshots.
    pub snapshot: Option<RecordPolicy>,
    /// Sweeps discarded before observables are averaged.
    pub warmup_sweeps: usize,
    pub seed: u64,
    /// Recompute total energy on the current thread instead of with rayon.
    pub sequential: bool,
}

impl SimConfig {
    /// Inverse temperature `1 / (k_B T)`. Infinite at `T = 0`.
    pub fn beta(&self) -> f64 {
        1.0 / (self.boltzmann * self.temperature)
    }

    pub fn n_spins(&self) -> usize {
        self.lattice_size * self.lattice_size
    }

    /// Proposals between convergence samples.
    pub fn check_interval(&self) -> Option<usize> {
        self.convergence
            .as_ref()
            .map(|c| c.interval.unwrap_or_else(|| self.n_spins()))
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        let lattice_size = 32;
        Self {
            lattice_size,
            temperature: 2.0,
            boltzmann: 1.0,
            max_steps: 1000 * (lattice_size * lattice_size) as u64,
            init: InitMode::default(),
            convergence: None,
            trace: RecordPolicy::Sweep,
            trace_limit: None,
            snapshot: None,
            warmup_sweeps: 0,
            seed: 42,
            sequential: false,
        }
    }
}
