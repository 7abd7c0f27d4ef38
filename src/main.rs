use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use ising_sim::nbody::{self, NBodyConfig, TextTrajectoryWriter, TrajectorySink};
use ising_sim::{
    ConvergenceConfig, CsvSnapshotWriter, InitMode, RecordPolicy, RunResult, SimConfig,
    SnapshotSink, Spin,
};
use log::info;
use validator::Validate;

#[derive(Parser, Debug)]
#[command(author, version, about = "2D Ising model Metropolis Monte Carlo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single Metropolis chain
    Run {
        #[command(flatten)]
        chain: ChainArgs,

        #[arg(long, default_value_t = 2.0)]
        temperature: f64,

        /// Lattice snapshot cadence: every, accepted or sweep
        #[arg(long, value_parser = parse_policy)]
        snapshot: Option<RecordPolicy>,

        /// Lattice snapshot file (comma-separated rows)
        #[arg(long)]
        lattice_out: Option<PathBuf>,

        /// Energy trace file (`index energy`)
        #[arg(long)]
        energy_out: Option<PathBuf>,
    },
    /// Run one independent chain per temperature and print a table
    Scan {
        #[command(flatten)]
        chain: ChainArgs,

        #[arg(long, default_value_t = 1.5)]
        t_min: f64,

        #[arg(long, default_value_t = 3.5)]
        t_max: f64,

        #[arg(long, default_value_t = 16)]
        n_temps: usize,
    },
    /// Integrate the solar system with velocity-Verlet
    Orbits {
        /// Time step in days
        #[arg(long, default_value_t = 1.0)]
        dt: f64,

        /// Integrated span in years
        #[arg(long, default_value_t = 1.0)]
        years: f64,

        #[arg(long, default_value_t = 30)]
        report_every: usize,

        /// Plummer softening length in meters
        #[arg(long, default_value_t = 0.0)]
        softening: f64,

        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Positions file (`time name x y`)
        #[arg(long)]
        positions_out: Option<PathBuf>,

        /// Angular momentum file (`time L`)
        #[arg(long)]
        momentum_out: Option<PathBuf>,
    },
}

/// Chain parameters shared by `run` and `scan`.
#[derive(Args, Debug)]
struct ChainArgs {
    /// Linear lattice size N
    #[arg(long, default_value_t = 32)]
    size: usize,

    #[arg(long, default_value_t = 1.0)]
    boltzmann: f64,

    /// Proposal budget (default: 1000 sweeps)
    #[arg(long)]
    steps: Option<u64>,

    /// Percentage of up spins in the random initial state
    #[arg(long, default_value_t = 50)]
    bias: i32,

    /// Start from a uniform lattice instead: up or down
    #[arg(long, value_parser = parse_spin)]
    ordered: Option<Spin>,

    /// Enable the convergence check, comparing energies this many samples apart
    #[arg(long)]
    window: Option<usize>,

    #[arg(long, default_value_t = 1e-3)]
    threshold: f64,

    /// Proposals between convergence samples (default: one sweep)
    #[arg(long)]
    check_interval: Option<usize>,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Energy trace cadence: every, accepted or sweep
    #[arg(long, default_value = "sweep", value_parser = parse_policy)]
    trace: RecordPolicy,

    /// Keep only the most recent trace samples
    #[arg(long)]
    trace_limit: Option<usize>,

    /// Sweeps excluded from the observable averages
    #[arg(long, default_value_t = 0)]
    warmup: usize,

    #[arg(long, default_value_t = false)]
    sequential: bool,
}

fn parse_policy(s: &str) -> std::result::Result<RecordPolicy, String> {
    RecordPolicy::try_from(s)
}

fn parse_spin(s: &str) -> std::result::Result<Spin, String> {
    Spin::try_from(s)
}

impl ChainArgs {
    fn to_config(&self, temperature: f64) -> SimConfig {
        let n_spins = (self.size * self.size) as u64;
        SimConfig {
            lattice_size: self.size,
            temperature,
            boltzmann: self.boltzmann,
            max_steps: self.steps.unwrap_or(1000 * n_spins),
            init: match self.ordered {
                Some(spin) => InitMode::Uniform(spin),
                None => InitMode::Random {
                    bias_percent: self.bias,
                },
            },
            convergence: self.window.map(|window| ConvergenceConfig {
                window,
                threshold: self.threshold,
                interval: self.check_interval,
            }),
            trace: self.trace,
            trace_limit: self.trace_limit,
            snapshot: None,
            warmup_sweeps: self.warmup,
            seed: self.seed,
            sequential: self.sequential,
        }
    }
}

fn progress_bar(len: u64, msg: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]",
        )
        .context("invalid progress bar template")?
        .progress_chars("=> "),
    );
    pb.set_message(msg);
    Ok(pb)
}

/// Sweeps in one chain's budget, after rejecting an invalid configuration.
fn sweeps_per_chain(config: &SimConfig) -> Result<u64> {
    config.validate().context("invalid configuration")?;
    Ok(config.max_steps / config.n_spins() as u64)
}

fn print_run(result: &RunResult, n_spins: usize) {
    let obs = &result.observables;
    println!("state            {:?}", result.state);
    println!("steps            {}", result.steps);
    println!("acceptance rate  {:.4}", result.acceptance_rate());
    println!("initial energy   {}", result.initial_energy);
    println!("final energy     {}", result.final_energy);
    println!("magnetization    {:.6}", result.magnetization);
    if obs.n_samples > 0 {
        println!("<e>              {:.6}", obs.energy);
        println!("<|m|>            {:.6}", obs.abs_mag);
        println!(
            "specific heat    {:.6}",
            obs.specific_heat(result.beta, n_spins)
        );
        println!(
            "susceptibility   {:.6}",
            obs.susceptibility(result.beta, n_spins)
        );
        println!("binder cumulant  {:.6}", obs.binder_cumulant());
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("failed to install Ctrl-C handler")?;

    match Cli::parse().command {
        Command::Run {
            chain,
            temperature,
            snapshot,
            lattice_out,
            energy_out,
        } => {
            let mut config = chain.to_config(temperature);
            config.snapshot = match snapshot {
                None if lattice_out.is_some() => Some(RecordPolicy::Sweep),
                other => other,
            };
            let sweeps = sweeps_per_chain(&config)?;

            let mut writer = if lattice_out.is_some() || energy_out.is_some() {
                Some(
                    CsvSnapshotWriter::create(lattice_out.as_deref(), energy_out.as_deref())
                        .context("failed to create snapshot files")?,
                )
            } else {
                None
            };
            let sink = writer.as_mut().map(|w| w as &mut dyn SnapshotSink);

            let n_spins = config.n_spins();
            let pb = progress_bar(sweeps, "sweeps")?;
            let result = ising_sim::run(&config, sink, &interrupted, &|| pb.inc(1))
                .context("metropolis run failed")?;
            pb.finish_and_clear();
            print_run(&result, n_spins);
        }
        Command::Scan {
            chain,
            t_min,
            t_max,
            n_temps,
        } => {
            let temperatures = linspace(t_min, t_max, n_temps);
            let config = chain.to_config(t_min);
            let n_spins = config.n_spins();
            let sweeps = sweeps_per_chain(&config)?;
            info!(
                "scanning {} temperatures in [{}, {}]",
                temperatures.len(),
                t_min,
                t_max
            );

            let pb = progress_bar(sweeps * temperatures.len() as u64, "sweeps")?;
            let results =
                ising_sim::run_temperature_scan(&config, &temperatures, &interrupted, &|| {
                    pb.inc(1)
                })
                .context("temperature scan failed")?;
            pb.finish_and_clear();

            println!(
                "{:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8}",
                "T", "<e>", "<|m|>", "C", "chi", "U4", "acc"
            );
            for r in &results {
                let obs = &r.observables;
                println!(
                    "{:>8.4} {:>10.5} {:>10.5} {:>10.5} {:>10.5} {:>10.5} {:>8.4}",
                    r.temperature,
                    obs.energy,
                    obs.abs_mag,
                    obs.specific_heat(r.beta, n_spins),
                    obs.susceptibility(r.beta, n_spins),
                    obs.binder_cumulant(),
                    r.acceptance_rate()
                );
            }
        }
        Command::Orbits {
            dt,
            years,
            report_every,
            softening,
            parallel,
            positions_out,
            momentum_out,
        } => {
            let config = NBodyConfig {
                dt: dt * nbody::DAY,
                duration: years * nbody::YEAR * nbody::DAY,
                report_every,
                gravitational_constant: nbody::G,
                softening,
                sequential: !parallel,
            };

            let mut writer = if positions_out.is_some() || momentum_out.is_some() {
                Some(
                    TextTrajectoryWriter::create(positions_out.as_deref(), momentum_out.as_deref())
                        .context("failed to create trajectory files")?,
                )
            } else {
                None
            };
            let sink = writer.as_mut().map(|w| w as &mut dyn TrajectorySink);

            let mut bodies = nbody::solar_system();
            let report =
                nbody::run_orbits(&mut bodies, &config, sink).context("orbit integration failed")?;

            println!("steps                  {}", report.steps);
            println!("energy drift           {:.3e}", report.energy_drift);
            println!(
                "angular momentum drift {:.3e}",
                report.angular_momentum_drift
            );
            for b in &bodies {
                println!(
                    "{:<8} x = {:>12.4e} m, y = {:>12.4e} m",
                    b.name, b.position[0], b.position[1]
                );
            }
        }
    }

    Ok(())
}
