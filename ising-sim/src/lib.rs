pub mod config;
pub mod error;
pub mod geometry;
pub mod mcmc;
pub mod nbody;
pub mod simulation;
pub mod snapshot;
pub mod spins;
pub mod statistics;

pub use config::{ConvergenceConfig, InitMode, RecordPolicy, SimConfig};
pub use error::{Result, SimError};
pub use geometry::Lattice;
pub use mcmc::{MetropolisSampler, RunState};
pub use simulation::{run, run_realization, run_temperature_scan, Realization};
pub use snapshot::{CsvSnapshotWriter, SnapshotSink};
pub use spins::Spin;
pub use statistics::{EnergySample, Observables, RunResult};
