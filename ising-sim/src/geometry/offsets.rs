/// Number of nearest neighbors on the square lattice.
pub const N_NEIGHBORS: usize = 4;

/// Square-lattice neighbor offsets `(d_row, d_col)`: up, down, left, right.
pub fn square() -> [(isize, isize); N_NEIGHBORS] {
    [(-1, 0), (1, 0), (0, -1), (0, 1)]
}
