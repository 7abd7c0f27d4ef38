use crate::geometry::Lattice;
use rayon::prelude::*;

/// Sum of the four neighbor spins of `flat_idx`.
#[inline]
fn local_field(lattice: &Lattice, spins: &[i8], flat_idx: usize) -> i32 {
    lattice
        .neighbor_sites(flat_idx)
        .iter()
        .map(|&n| spins[n] as i32)
        .sum()
}

/// Energy change if the spin at flat index `flat_idx` were flipped.
///
/// `dE = 2 * s * h` with `h` the sum of the four neighbor spins (J = 1).
#[inline]
pub fn local_delta_energy_at(lattice: &Lattice, spins: &[i8], flat_idx: usize) -> f64 {
    (2 * spins[flat_idx] as i32 * local_field(lattice, spins, flat_idx)) as f64
}

/// Energy change if the spin at `(i, j)` were flipped.
pub fn local_delta_energy(lattice: &Lattice, spins: &[i8], i: usize, j: usize) -> f64 {
    local_delta_energy_at(lattice, spins, lattice.index(i, j))
}

/// Total nearest-neighbor energy `-sum_<ij> s_i s_j`, each bond counted once.
///
/// The double-counted site sum is accumulated in `i64`, so the parallel
/// reduction is exact and matches the sequential one bit for bit.
pub fn total_energy(lattice: &Lattice, spins: &[i8], sequential: bool) -> f64 {
    let site = |i: usize| spins[i] as i64 * local_field(lattice, spins, i) as i64;
    let raw: i64 = if sequential {
        (0..lattice.n_spins).map(site).sum()
    } else {
        (0..lattice.n_spins).into_par_iter().map(site).sum()
    };
    -(raw as f64) / 2.0
}

/// Mean spin per site.
pub fn magnetization(spins: &[i8]) -> f64 {
    let sum: i64 = spins.iter().map(|&s| s as i64).sum();
    sum as f64 / spins.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spins::{fill, flip, randomize, Spin};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_ground_state_energy() {
        let lat = Lattice::new(6);
        let mut spins = vec![0i8; lat.n_spins];
        fill(&mut spins, Spin::Up);
        // 2 bonds per site
        assert_eq!(total_energy(&lat, &spins, true), -72.0);
        assert_eq!(magnetization(&spins), 1.0);
        assert_eq!(local_delta_energy(&lat, &spins, 3, 3), 8.0);
    }

    #[test]
    fn test_checkerboard_energy() {
        let lat = Lattice::new(4);
        let spins: Vec<i8> = (0..lat.n_spins)
            .map(|k| {
                let (i, j) = lat.coords(k);
                if (i + j) % 2 == 0 {
                    1
                } else {
                    -1
                }
            })
            .collect();
        assert_eq!(total_energy(&lat, &spins, true), 32.0);
        assert_eq!(magnetization(&spins), 0.0);
        assert_eq!(local_delta_energy(&lat, &spins, 0, 0), -8.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let lat = Lattice::new(33);
        let mut rng = Xoshiro256StarStar::seed_from_u64(11);
        let mut spins = vec![0i8; lat.n_spins];
        randomize(&mut spins, 50, &mut rng);
        assert_eq!(
            total_energy(&lat, &spins, true).to_bits(),
            total_energy(&lat, &spins, false).to_bits()
        );
    }

    proptest! {
        #[test]
        fn test_delta_matches_total_energy(
            size in 2usize..9,
            seed in any::<u64>(),
            bias in 0u32..=100,
            site in any::<usize>(),
        ) {
            let lat = Lattice::new(size);
            let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
            let mut spins = vec![0i8; lat.n_spins];
            randomize(&mut spins, bias, &mut rng);

            let k = site % lat.n_spins;
            let (i, j) = lat.coords(k);
            let before = total_energy(&lat, &spins, true);
            let delta = local_delta_energy(&lat, &spins, i, j);
            flip(&mut spins, k);
            let after = total_energy(&lat, &spins, true);
            prop_assert!((after - before - delta).abs() < 1e-9);
        }
    }
}
