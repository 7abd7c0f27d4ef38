pub mod convergence;
pub mod results;
mod stats;

pub use convergence::ConvergenceMonitor;
pub use results::{EnergySample, Observables, RunResult};
pub use stats::Statistics;
