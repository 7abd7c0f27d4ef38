pub mod metropolis;

pub use metropolis::{
    acceptance_probability, metropolis_step, metropolis_sweep, MetropolisSampler, Proposal,
    RunState,
};
