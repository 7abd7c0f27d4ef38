pub mod lattice;
pub mod offsets;

pub use lattice::Lattice;
pub use offsets::{square, N_NEIGHBORS};
