//! Direct-summation gravity and the velocity-Verlet step.

use super::Body;
use rayon::prelude::*;

/// Acceleration of body `i` from every other body.
///
/// Terms are accumulated in index order, so the result does not depend on
/// how bodies are distributed over threads.
#[inline]
fn acceleration_on(bodies: &[Body], i: usize, g: f64, softening: f64) -> [f64; 2] {
    let eps2 = softening * softening;
    let xi = bodies[i].position;
    let mut a = [0.0f64; 2];
    for (j, bj) in bodies.iter().enumerate() {
        if j == i {
            continue;
        }
        let dx = bj.position[0] - xi[0];
        let dy = bj.position[1] - xi[1];
        let r2 = dx * dx + dy * dy + eps2;
        let inv_r3 = 1.0 / (r2 * r2.sqrt());
        a[0] += g * bj.mass * dx * inv_r3;
        a[1] += g * bj.mass * dy * inv_r3;
    }
    a
}

/// Gravitational acceleration of every body (O(n²) direct sum).
pub fn accelerations(
    bodies: &[Body],
    g: f64,
    softening: f64,
    sequential: bool,
) -> Vec<[f64; 2]> {
    let n = bodies.len();
    if sequential {
        (0..n)
            .map(|i| acceleration_on(bodies, i, g, softening))
            .collect()
    } else {
        (0..n)
            .into_par_iter()
            .map(|i| acceleration_on(bodies, i, g, softening))
            .collect()
    }
}

/// Advance all bodies by `dt` with velocity-Verlet.
///
/// `acc` must hold the accelerations at the current positions on entry and
/// holds those at the new positions on return, so each step costs one force
/// evaluation.
pub fn verlet_step(
    bodies: &mut [Body],
    acc: &mut Vec<[f64; 2]>,
    dt: f64,
    g: f64,
    softening: f64,
    sequential: bool,
) {
    let half_dt = 0.5 * dt;

    // v(t + dt/2) = v(t) + dt/2 a(t);  x(t + dt) = x(t) + dt v(t + dt/2)
    for (b, a) in bodies.iter_mut().zip(acc.iter()) {
        b.velocity[0] += half_dt * a[0];
        b.velocity[1] += half_dt * a[1];
        b.position[0] += dt * b.velocity[0];
        b.position[1] += dt * b.velocity[1];
    }

    *acc = accelerations(bodies, g, softening, sequential);

    // v(t + dt) = v(t + dt/2) + dt/2 a(t + dt)
    for (b, a) in bodies.iter_mut().zip(acc.iter()) {
        b.velocity[0] += half_dt * a[0];
        b.velocity[1] += half_dt * a[1];
    }
}

pub fn kinetic_energy(bodies: &[Body]) -> f64 {
    bodies
        .iter()
        .map(|b| 0.5 * b.mass * (b.velocity[0].powi(2) + b.velocity[1].powi(2)))
        .sum()
}

/// Pairwise potential energy, each pair counted once.
pub fn potential_energy(bodies: &[Body], g: f64, softening: f64) -> f64 {
    let eps2 = softening * softening;
    let mut u = 0.0;
    for i in 0..bodies.len() {
        for j in i + 1..bodies.len() {
            let dx = bodies[j].position[0] - bodies[i].position[0];
            let dy = bodies[j].position[1] - bodies[i].position[1];
            u -= g * bodies[i].mass * bodies[j].mass / (dx * dx + dy * dy + eps2).sqrt();
        }
    }
    u
}

pub fn total_energy(bodies: &[Body], g: f64, softening: f64) -> f64 {
    kinetic_energy(bodies) + potential_energy(bodies, g, softening)
}

/// z-component of the total angular momentum about the origin.
pub fn angular_momentum(bodies: &[Body]) -> f64 {
    bodies
        .iter()
        .map(|b| b.mass * (b.position[0] * b.velocity[1] - b.position[1] * b.velocity[0]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbody::{solar_system, AU, DAY, G};
    use approx::assert_relative_eq;

    fn sun_earth() -> Vec<Body> {
        vec![
            Body::new("Sun", 1.98847e30, [0.0, 0.0], [0.0, 0.0]),
            Body::new("Earth", 5.97237e24, [AU, 0.0], [0.0, 29_780.0]),
        ]
    }

    #[test]
    fn test_newton_third_law() {
        let bodies = sun_earth();
        let acc = accelerations(&bodies, G, 0.0, true);
        let f_sun = bodies[0].mass * acc[0][0];
        let f_earth = bodies[1].mass * acc[1][0];
        assert_relative_eq!(f_sun, -f_earth, max_relative = 1e-12);
        assert_eq!(acc[0][1], 0.0);
        // Earth pulled towards the Sun with g = GM/r²
        assert_relative_eq!(acc[1][0], -G * 1.98847e30 / (AU * AU), max_relative = 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let bodies = solar_system();
        let seq = accelerations(&bodies, G, 0.0, true);
        let par = accelerations(&bodies, G, 0.0, false);
        assert_eq!(seq, par);
    }

    #[test]
    fn test_earth_returns_after_one_year() {
        let mut bodies = sun_earth();
        let dt = 0.25 * DAY;
        let mut acc = accelerations(&bodies, G, 0.0, true);
        for _ in 0..(365.25 * 4.0) as usize {
            verlet_step(&mut bodies, &mut acc, dt, G, 0.0, true);
        }
        let earth = &bodies[1];
        let dx = earth.position[0] - AU;
        let dy = earth.position[1];
        assert!((dx * dx + dy * dy).sqrt() < 0.01 * AU);
    }

    #[test]
    fn test_invariants_conserved() {
        let mut bodies = solar_system();
        let e0 = total_energy(&bodies, G, 0.0);
        let l0 = angular_momentum(&bodies);
        let mut acc = accelerations(&bodies, G, 0.0, true);
        for _ in 0..365 {
            verlet_step(&mut bodies, &mut acc, DAY, G, 0.0, true);
        }
        let e1 = total_energy(&bodies, G, 0.0);
        let l1 = angular_momentum(&bodies);
        assert!(((e1 - e0) / e0).abs() < 1e-4);
        assert!(((l1 - l0) / l0).abs() < 1e-9);
    }

    #[test]
    fn test_softening_bounds_close_encounter() {
        let bodies = vec![
            Body::new("a", 1.0, [0.0, 0.0], [0.0, 0.0]),
            Body::new("b", 1.0, [1e-9, 0.0], [0.0, 0.0]),
        ];
        let acc = accelerations(&bodies, 1.0, 1e-3, true);
        assert!(acc[0][0].is_finite());
        assert!(acc[0][0] < 2.0);
    }
}
