use std::sync::atomic::AtomicBool;
use std::time::Instant;

use ising_sim::mcmc::metropolis_sweep;
use ising_sim::{run_temperature_scan, Realization, SimConfig};

const L: usize = 128;
const N_TEMPS: usize = 16;
const N_SWEEPS: usize = 50;

fn main() {
    let config = SimConfig {
        lattice_size: L,
        temperature: 2.269,
        max_steps: (N_SWEEPS * L * L) as u64,
        ..Default::default()
    };

    println!(
        "Lattice: {}x{}  |  Temps: {}  |  Sweeps: {}",
        L, L, N_TEMPS, N_SWEEPS
    );
    println!("{}", "-".repeat(70));

    // Bare sweeps on one chain
    let mut real = Realization::new(&config).unwrap();
    let beta = config.beta();
    let t0 = Instant::now();
    let mut n_accepted = 0;
    for _ in 0..N_SWEEPS {
        let (delta, accepted) =
            metropolis_sweep(&real.lattice, &mut real.spins, beta, &mut real.rng);
        real.energy += delta;
        n_accepted += accepted;
    }
    let elapsed = t0.elapsed().as_secs_f64();
    println!(
        "Single chain: {:.3} ms/sweep  |  acceptance {:.4}",
        elapsed / N_SWEEPS as f64 * 1000.0,
        n_accepted as f64 / (N_SWEEPS * L * L) as f64
    );

    // Independent chains across temperatures, parallel over rayon
    let temps: Vec<f64> = (0..N_TEMPS)
        .map(|i| 1.5 + 2.0 * i as f64 / (N_TEMPS - 1) as f64)
        .collect();
    let interrupted = AtomicBool::new(false);

    let t0 = Instant::now();
    run_temperature_scan(&config, &temps, &interrupted, &|| {}).unwrap();
    let elapsed = t0.elapsed().as_secs_f64();

    let per_sweep = elapsed / N_SWEEPS as f64 * 1000.0;
    println!("Scan total: {:.3} s  |  {:.3} ms/sweep", elapsed, per_sweep);
}
