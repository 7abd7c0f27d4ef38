pub mod energy;

use rand::Rng;

/// Orientation of a single spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spin {
    Up,
    Down,
}

impl Spin {
    #[inline]
    pub fn value(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl TryFrom<&str> for Spin {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "up" | "+1" | "1" => Ok(Self::Up),
            "down" | "-1" => Ok(Self::Down),
            _ => Err(format!("unknown spin '{s}', expected 'up' or 'down'")),
        }
    }
}

/// Fill `spins` independently: `+1` when a uniform draw from `0..100` falls
/// below `bias_percent`, `-1` otherwise.
///
/// `bias_percent = 0` gives all `-1`, `bias_percent = 100` gives all `+1`.
pub fn randomize<R: Rng>(spins: &mut [i8], bias_percent: u32, rng: &mut R) {
    for s in spins.iter_mut() {
        *s = if rng.gen_range(0..100u32) < bias_percent {
            1
        } else {
            -1
        };
    }
}

/// Set every spin to the same orientation.
pub fn fill(spins: &mut [i8], spin: Spin) {
    spins.fill(spin.value());
}

/// Flip the spin at `flat_idx` in place.
#[inline]
pub fn flip(spins: &mut [i8], flat_idx: usize) {
    spins[flat_idx] = -spins[flat_idx];
}
