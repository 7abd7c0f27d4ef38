use super::offsets::{square, N_NEIGHBORS};

/// Periodic square lattice with a precomputed neighbor table.
///
/// Sites are indexed in row-major order: site `(i, j)` has flat index
/// `i * size + j`. Every site has exactly [`N_NEIGHBORS`] neighbors, stored
/// in the order up, down, left, right.
#[derive(Debug, Clone)]
pub struct Lattice {
    /// Linear extent `N` of the `N x N` lattice.
    pub size: usize,
    /// Total number of sites (`size * size`).
    pub n_spins: usize,
    /// Precomputed neighbor table, length `n_spins * N_NEIGHBORS`.
    /// Layout: `neighbors[i * N_NEIGHBORS + d]` with `d` indexing [`square`].
    neighbors: Vec<u32>,
}

impl Lattice {
    /// Create an `size x size` periodic lattice.
    pub fn new(size: usize) -> Self {
        assert!(size >= 1, "lattice size must be positive");
        let n_spins = size * size;
        let offsets = square();

        let mut neighbors = vec![0u32; n_spins * N_NEIGHBORS];
        for i in 0..size {
            for j in 0..size {
                let flat = i * size + j;
                for (d, &(di, dj)) in offsets.iter().enumerate() {
                    let ni = (i as isize + di).rem_euclid(size as isize) as usize;
                    let nj = (j as isize + dj).rem_euclid(size as isize) as usize;
                    neighbors[flat * N_NEIGHBORS + d] = (ni * size + nj) as u32;
                }
            }
        }

        Self {
            size,
            n_spins,
            neighbors,
        }
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.size + j
    }

    #[inline]
    pub fn coords(&self, flat_idx: usize) -> (usize, usize) {
        (flat_idx / self.size, flat_idx % self.size)
    }

    /// Flat indices of the four periodic neighbors of `flat_idx`.
    #[inline]
    pub fn neighbor_sites(&self, flat_idx: usize) -> [usize; N_NEIGHBORS] {
        let base = flat_idx * N_NEIGHBORS;
        [
            self.neighbors[base] as usize,
            self.neighbors[base + 1] as usize,
            self.neighbors[base + 2] as usize,
            self.neighbors[base + 3] as usize,
        ]
    }

    /// The four periodic neighbors of `(i, j)` as `(row, col)` pairs:
    /// `(i-1, j)`, `(i+1, j)`, `(i, j-1)`, `(i, j+1)`, all taken mod `size`.
    pub fn neighbors(&self, i: usize, j: usize) -> [(usize, usize); N_NEIGHBORS] {
        self.neighbor_sites(self.index(i, j))
            .map(|flat| self.coords(flat))
    }
}
