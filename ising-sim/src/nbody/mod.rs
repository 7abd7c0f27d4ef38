//! Planar N-body gravity integrated with velocity-Verlet.
//!
//! Companion to the Ising engine: a fixed inverse-square force law, direct
//! O(n²) summation, and conservation diagnostics (total energy, angular
//! momentum) reported along the trajectory.

pub mod integrator;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use integrator::{accelerations, angular_momentum, total_energy, verlet_step};
use log::info;
use validator::{Validate, ValidationError};

/// Gravitational constant (m³ kg⁻¹ s⁻²).
pub const G: f64 = 6.67430e-11;
/// Astronomical unit (m).
pub const AU: f64 = 1.496e11;
/// One day (s).
pub const DAY: f64 = 86_400.0;
/// One Julian year (days).
pub const YEAR: f64 = 365.25;
/// Solar mass (kg).
pub const SUN_MASS: f64 = 1.98847e30;

/// Point mass in the orbital plane, SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub mass: f64,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
}

impl Body {
    pub fn new(name: &str, mass: f64, position: [f64; 2], velocity: [f64; 2]) -> Self {
        Self {
            name: name.to_string(),
            mass,
            position,
            velocity,
        }
    }
}

/// The Sun and the eight planets, lined up on the +x axis and moving along +y.
///
/// The Sun's velocity cancels the planets' total momentum, so the center of
/// mass stays at rest.
pub fn solar_system() -> Vec<Body> {
    // name, mass (kg), distance (AU), speed (m/s)
    let planets = [
        ("Mercury", 3.3011e23, 0.39, 47_400.0),
        ("Venus", 4.8675e24, 0.72, 35_020.0),
        ("Earth", 5.97237e24, 1.0, 29_780.0),
        ("Mars", 6.4171e23, 1.52, 24_070.0),
        ("Jupiter", 1.8982e27, 5.2, 13_070.0),
        ("Saturn", 5.6834e26, 9.58, 9_680.0),
        ("Uranus", 8.6810e25, 19.22, 6_800.0),
        ("Neptune", 1.02413e26, 30.05, 5_430.0),
    ];

    let momentum_y: f64 = planets.iter().map(|&(_, m, _, v)| m * v).sum();
    let mut bodies = vec![Body::new(
        "Sun",
        SUN_MASS,
        [0.0, 0.0],
        [0.0, -momentum_y / SUN_MASS],
    )];
    bodies.extend(
        planets
            .iter()
            .map(|&(name, m, d, v)| Body::new(name, m, [d * AU, 0.0], [0.0, v])),
    );
    bodies
}

fn validate_nbody_config(cfg: &NBodyConfig) -> std::result::Result<(), ValidationError> {
    if !(cfg.dt > 0.0 && cfg.dt.is_finite()) {
        return Err(ValidationError::new("dt must be positive and finite"));
    }
    if !(cfg.duration >= 0.0 && cfg.duration.is_finite()) {
        return Err(ValidationError::new(
            "duration must be non-negative and finite",
        ));
    }
    if cfg.report_every < 1 {
        return Err(ValidationError::new("report_every must be >= 1"));
    }
    if !(cfg.gravitational_constant > 0.0) {
        return Err(ValidationError::new(
            "gravitational_constant must be positive",
        ));
    }
    if !(cfg.softening >= 0.0) {
        return Err(ValidationError::new("softening must be non-negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_nbody_config"))]
pub struct NBodyConfig {
    /// Time step (s).
    pub dt: f64,
    /// Integrated time span (s).
    pub duration: f64,
    /// Steps between trajectory reports.
    pub report_every: usize,
    pub gravitational_constant: f64,
    /// Plummer softening length (m).
    pub softening: f64,
    /// Compute accelerations on the current thread instead of with rayon.
    pub sequential: bool,
}

impl NBodyConfig {
    pub fn n_steps(&self) -> usize {
        (self.duration / self.dt).round() as usize
    }
}

impl Default for NBodyConfig {
    fn default() -> Self {
        Self {
            dt: DAY,
            duration: YEAR * DAY,
            report_every: 30,
            gravitational_constant: G,
            softening: 0.0,
            sequential: true,
        }
    }
}

/// Destination for trajectory reports.
pub trait TrajectorySink {
    fn write_positions(&mut self, time: f64, bodies: &[Body]) -> io::Result<()>;
    fn write_angular_momentum(&mut self, time: f64, l: f64) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Text sink: `time_days name x y` per body, and `time_days L` per report.
pub struct TextTrajectoryWriter<P: Write, L: Write> {
    positions_out: Option<P>,
    momentum_out: Option<L>,
}

impl TextTrajectoryWriter<BufWriter<File>, BufWriter<File>> {
    pub fn create(positions_path: Option<&Path>, momentum_path: Option<&Path>) -> io::Result<Self> {
        let open = |p: &Path| File::create(p).map(BufWriter::new);
        Ok(Self {
            positions_out: positions_path.map(open).transpose()?,
            momentum_out: momentum_path.map(open).transpose()?,
        })
    }
}

impl<P: Write, L: Write> TextTrajectoryWriter<P, L> {
    pub fn new(positions_out: Option<P>, momentum_out: Option<L>) -> Self {
        Self {
            positions_out,
            momentum_out,
        }
    }

    pub fn into_inner(self) -> (Option<P>, Option<L>) {
        (self.positions_out, self.momentum_out)
    }
}

impl<P: Write, L: Write> TrajectorySink for TextTrajectoryWriter<P, L> {
    fn write_positions(&mut self, time: f64, bodies: &[Body]) -> io::Result<()> {
        if let Some(out) = self.positions_out.as_mut() {
            for b in bodies {
                writeln!(
                    out,
                    "{:.2} {} {:.6e} {:.6e}",
                    time / DAY,
                    b.name,
                    b.position[0],
                    b.position[1]
                )?;
            }
        }
        Ok(())
    }

    fn write_angular_momentum(&mut self, time: f64, l: f64) -> io::Result<()> {
        match self.momentum_out.as_mut() {
            Some(out) => writeln!(out, "{:.2} {:.10e}", time / DAY, l),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(out) = self.positions_out.as_mut() {
            out.flush()?;
        }
        if let Some(out) = self.momentum_out.as_mut() {
            out.flush()?;
        }
        Ok(())
    }
}

/// Summary of an integration.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitReport {
    pub steps: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
    /// `(E_end - E_0) / |E_0|`.
    pub energy_drift: f64,
    pub initial_angular_momentum: f64,
    pub final_angular_momentum: f64,
    /// `(L_end - L_0) / |L_0|`.
    pub angular_momentum_drift: f64,
}

fn relative_drift(start: f64, end: f64) -> f64 {
    if start == 0.0 {
        end - start
    } else {
        (end - start) / start.abs()
    }
}

/// Integrate `bodies` for `config.duration`, reporting to `sink` at step 0
/// and every `report_every` steps. A sink write failure aborts the run.
pub fn run_orbits(
    bodies: &mut [Body],
    config: &NBodyConfig,
    mut sink: Option<&mut dyn TrajectorySink>,
) -> Result<OrbitReport> {
    config.validate()?;

    let g = config.gravitational_constant;
    let n_steps = config.n_steps();
    info!(
        "n-body: {} bodies, dt = {} s, {} steps",
        bodies.len(),
        config.dt,
        n_steps
    );

    let initial_energy = total_energy(bodies, g, config.softening);
    let initial_angular_momentum = angular_momentum(bodies);
    let mut acc = accelerations(bodies, g, config.softening, config.sequential);

    if let Some(s) = sink.as_deref_mut() {
        s.write_positions(0.0, bodies)?;
        s.write_angular_momentum(0.0, initial_angular_momentum)?;
    }

    for step in 1..=n_steps {
        verlet_step(
            bodies,
            &mut acc,
            config.dt,
            g,
            config.softening,
            config.sequential,
        );
        if step % config.report_every == 0 {
            if let Some(s) = sink.as_deref_mut() {
                let time = step as f64 * config.dt;
                s.write_positions(time, bodies)?;
                s.write_angular_momentum(time, angular_momentum(bodies))?;
            }
        }
    }

    if let Some(s) = sink.as_deref_mut() {
        s.flush()?;
    }

    let final_energy = total_energy(bodies, g, config.softening);
    let final_angular_momentum = angular_momentum(bodies);
    let report = OrbitReport {
        steps: n_steps,
        initial_energy,
        final_energy,
        energy_drift: relative_drift(initial_energy, final_energy),
        initial_angular_momentum,
        final_angular_momentum,
        angular_momentum_drift: relative_drift(initial_angular_momentum, final_angular_momentum),
    };
    info!(
        "n-body: energy drift {:.3e}, angular momentum drift {:.3e}",
        report.energy_drift, report.angular_momentum_drift
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[test]
    fn test_solar_system_momentum_cancels() {
        let bodies = solar_system();
        assert_eq!(bodies.len(), 9);
        let py: f64 = bodies.iter().map(|b| b.mass * b.velocity[1]).sum();
        let scale = bodies[3].mass * bodies[3].velocity[1];
        assert!(py.abs() < 1e-9 * scale);
    }

    #[test]
    fn test_run_orbits_reports() {
        let mut bodies = solar_system();
        let config = NBodyConfig::default();
        let mut sink = TextTrajectoryWriter::new(Some(Vec::new()), Some(Vec::new()));
        let report = run_orbits(&mut bodies, &config, Some(&mut sink)).unwrap();
        assert_eq!(report.steps, 365);
        assert!(report.energy_drift.abs() < 1e-4);
        assert!(report.angular_momentum_drift.abs() < 1e-9);

        let (positions, momentum) = sink.into_inner();
        let momentum = String::from_utf8(momentum.unwrap()).unwrap();
        // step 0 plus every 30 days
        assert_eq!(momentum.lines().count(), 1 + 365 / 30);
        let positions = String::from_utf8(positions.unwrap()).unwrap();
        assert_eq!(positions.lines().count(), 9 * (1 + 365 / 30));
        assert!(positions.lines().next().unwrap().starts_with("0.00 Sun "));
    }

    #[test]
    fn test_invalid_config() {
        let mut bodies = solar_system();
        let config = NBodyConfig {
            dt: 0.0,
            ..Default::default()
        };
        let err = run_orbits(&mut bodies, &config, None).unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    struct BrokenSink;

    impl TrajectorySink for BrokenSink {
        fn write_positions(&mut self, _: f64, _: &[Body]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn write_angular_momentum(&mut self, _: f64, _: f64) -> io::Result<()> {
            Ok(())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_fatal() {
        let mut bodies = solar_system();
        let err = run_orbits(&mut bodies, &NBodyConfig::default(), Some(&mut BrokenSink)).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
