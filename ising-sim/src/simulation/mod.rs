pub mod realization;

pub use realization::Realization;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{RecordPolicy, SimConfig};
use crate::error::{Result, SimError};
use crate::mcmc::{MetropolisSampler, RunState};
use crate::snapshot::SnapshotSink;
use crate::spins::energy::{magnetization, total_energy};
use crate::statistics::{ConvergenceMonitor, EnergySample, Observables, RunResult, Statistics};
use log::{debug, info};
use rayon::prelude::*;
use validator::Validate;

/// Whether `policy` asks for a record after proposal number `step`.
#[inline]
fn due(policy: RecordPolicy, accepted: bool, step: u64, n_spins: u64) -> bool {
    match policy {
        RecordPolicy::EveryStep => true,
        RecordPolicy::Accepted => accepted,
        RecordPolicy::Sweep => step % n_spins == 0,
    }
}

/// Trace index: sweep number for sweep-cadence traces, proposal count otherwise.
#[inline]
fn trace_index(policy: RecordPolicy, step: u64, n_spins: u64) -> u64 {
    match policy {
        RecordPolicy::Sweep => step / n_spins,
        _ => step,
    }
}

/// Energy trace, optionally keeping only the most recent samples.
struct Trace {
    samples: VecDeque<EnergySample>,
    limit: Option<usize>,
}

impl Trace {
    fn new(limit: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            limit,
        }
    }

    fn push(&mut self, sample: EnergySample) {
        if self.limit.is_some_and(|k| self.samples.len() >= k) {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }
}

/// Per-sweep observable accumulators.
struct ObservableAccum {
    energy: Statistics,
    energy2: Statistics,
    abs_mag: Statistics,
    mag2: Statistics,
    mag4: Statistics,
}

impl ObservableAccum {
    fn new() -> Self {
        Self {
            energy: Statistics::new(1),
            energy2: Statistics::new(2),
            abs_mag: Statistics::new(1),
            mag2: Statistics::new(2),
            mag4: Statistics::new(4),
        }
    }

    fn update(&mut self, energy_per_spin: f64, mag: f64) {
        self.energy.update(energy_per_spin);
        self.energy2.update(energy_per_spin);
        self.abs_mag.update(mag.abs());
        self.mag2.update(mag);
        self.mag4.update(mag);
    }

    fn finish(&self) -> Observables {
        Observables {
            n_samples: self.energy.count,
            energy: self.energy.average(),
            energy2: self.energy2.average(),
            abs_mag: self.abs_mag.average(),
            mag2: self.mag2.average(),
            mag4: self.mag4.average(),
        }
    }
}

/// Build a fresh [`Realization`] from `config` and run it to termination.
pub fn run(
    config: &SimConfig,
    sink: Option<&mut dyn SnapshotSink>,
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<RunResult> {
    let mut real = Realization::new(config)?;
    run_realization(&mut real, config, sink, interrupted, on_sweep)
}

/// Run the Metropolis chain of `real` until it converges or exhausts
/// `config.max_steps` proposals.
///
/// Per proposal:
/// 1. One Metropolis step (random site, local `dE`, accept/reject)
/// 2. Cached energy updated by `dE` on acceptance
/// 3. Energy trace and lattice snapshot recorded per their [`RecordPolicy`]
/// 4. Every `interval` proposals, total energy is recomputed and fed to the
///    [`ConvergenceMonitor`]
///
/// The initial state is recorded before the first proposal. After every
/// completed sweep observables are accumulated (past `warmup_sweeps`) and
/// `on_sweep` is called; the `interrupted` flag is checked at sweep
/// boundaries. A sink write failure aborts the run with [`SimError::Io`].
pub fn run_realization(
    real: &mut Realization,
    config: &SimConfig,
    mut sink: Option<&mut dyn SnapshotSink>,
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<RunResult> {
    config.validate()?;

    let Realization {
        lattice,
        spins,
        rng,
        energy,
    } = real;
    let lattice = &*lattice;
    let n_spins = lattice.n_spins as u64;
    let beta = config.beta();

    info!(
        "metropolis: {0}x{0} lattice, T = {1}, beta = {2}, budget {3} steps",
        lattice.size, config.temperature, beta, config.max_steps
    );

    let mut sampler = MetropolisSampler::new(beta, config.max_steps);
    let mut monitor = config
        .convergence
        .as_ref()
        .map(|c| ConvergenceMonitor::new(c.window, c.threshold));
    let check_interval = config.check_interval().map(|k| k as u64);
    let mut trace = Trace::new(config.trace_limit);
    let mut observables = ObservableAccum::new();

    let initial_energy = *energy;
    trace.push(EnergySample {
        index: 0,
        energy: initial_energy,
    });
    if let Some(s) = sink.as_deref_mut() {
        s.write_energy(0, initial_energy)?;
        if config.snapshot.is_some() {
            s.write_lattice(lattice, spins)?;
        }
    }

    let mut sweep_id = 0usize;
    loop {
        if sampler.steps % n_spins == 0 && interrupted.load(Ordering::Relaxed) {
            return Err(SimError::Interrupted);
        }
        let Some(prop) = sampler.step(lattice, spins, rng) else {
            break;
        };
        let step = sampler.steps;
        if prop.accepted {
            *energy += prop.delta_energy;
        }

        if due(config.trace, prop.accepted, step, n_spins) {
            let index = trace_index(config.trace, step, n_spins);
            trace.push(EnergySample {
                index,
                energy: *energy,
            });
            if let Some(s) = sink.as_deref_mut() {
                s.write_energy(index, *energy)?;
            }
        }

        if let (Some(policy), Some(s)) = (config.snapshot, sink.as_deref_mut()) {
            if due(policy, prop.accepted, step, n_spins) {
                s.write_lattice(lattice, spins)?;
            }
        }

        if let (Some(mon), Some(k)) = (monitor.as_mut(), check_interval) {
            if step % k == 0 {
                let e = total_energy(lattice, spins, config.sequential);
                debug_assert_eq!(e, *energy);
                debug!("step {step}: E = {e}");
                if mon.push(e) {
                    sampler.converge();
                }
            }
        }

        if step % n_spins == 0 {
            if sweep_id >= config.warmup_sweeps {
                observables.update(*energy / n_spins as f64, magnetization(spins));
            }
            sweep_id += 1;
            on_sweep();
        }
    }

    if let Some(s) = sink.as_deref_mut() {
        s.flush()?;
    }

    let state = sampler.state();
    match state {
        RunState::Converged { step } => info!(
            "converged after {step} steps ({} sweeps), E = {}",
            step / n_spins,
            *energy
        ),
        _ => info!(
            "step budget exhausted after {} steps, E = {}",
            sampler.steps, *energy
        ),
    }
    debug!("acceptance rate {:.4}", sampler.acceptance_rate());

    Ok(RunResult {
        temperature: config.temperature,
        beta,
        state,
        steps: sampler.steps,
        accepted: sampler.accepted,
        initial_energy,
        final_energy: *energy,
        magnetization: magnetization(spins),
        spins: spins.clone(),
        energy_trace: trace.samples.into(),
        observables: observables.finish(),
    })
}

/// Run one independent chain per temperature.
///
/// Chain `k` uses `config` with `temperature = temperatures[k]` and seed
/// `config.seed + k`; snapshots are disabled. Chains run in parallel with
/// rayon unless `config.sequential` is set. Results keep input order.
pub fn run_temperature_scan(
    config: &SimConfig,
    temperatures: &[f64],
    interrupted: &AtomicBool,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<Vec<RunResult>> {
    config.validate()?;

    let configs: Vec<SimConfig> = temperatures
        .iter()
        .enumerate()
        .map(|(k, &temperature)| SimConfig {
            temperature,
            seed: config.seed.wrapping_add(k as u64),
            snapshot: None,
            ..config.clone()
        })
        .collect();

    let work = |cfg: &SimConfig| run(cfg, None, interrupted, on_sweep);
    let results: Vec<Result<RunResult>> = if config.sequential {
        configs.iter().map(work).collect()
    } else {
        configs.par_iter().map(work).collect()
    };

    results.into_iter().collect()
}
