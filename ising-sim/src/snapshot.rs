//! Flat-text output of lattice snapshots and energy traces.
//!
//! Lattice snapshots are one text row per lattice row with comma-separated
//! spins, followed by a blank line. Energy samples are written as two
//! whitespace-separated columns, `index energy`, one per line; the energy
//! always carries a decimal point.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::geometry::Lattice;

/// Destination for snapshots produced during a run.
///
/// Any error returned here aborts the run.
pub trait SnapshotSink {
    fn write_lattice(&mut self, lattice: &Lattice, spins: &[i8]) -> io::Result<()>;
    fn write_energy(&mut self, index: u64, energy: f64) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Text sink writing lattice snapshots and energy samples to two streams.
pub struct CsvSnapshotWriter<L: Write, E: Write> {
    lattice_out: Option<L>,
    energy_out: Option<E>,
}

impl CsvSnapshotWriter<BufWriter<File>, BufWriter<File>> {
    /// Create (truncating) the output files. Either path may be omitted.
    pub fn create(lattice_path: Option<&Path>, energy_path: Option<&Path>) -> io::Result<Self> {
        let open = |p: &Path| File::create(p).map(BufWriter::new);
        Ok(Self {
            lattice_out: lattice_path.map(open).transpose()?,
            energy_out: energy_path.map(open).transpose()?,
        })
    }
}

impl<L: Write, E: Write> CsvSnapshotWriter<L, E> {
    pub fn new(lattice_out: Option<L>, energy_out: Option<E>) -> Self {
        Self {
            lattice_out,
            energy_out,
        }
    }

    pub fn into_inner(self) -> (Option<L>, Option<E>) {
        (self.lattice_out, self.energy_out)
    }
}

/// Write one lattice snapshot: comma-separated rows and a trailing blank line.
pub fn write_lattice_csv<W: Write>(
    out: &mut W,
    lattice: &Lattice,
    spins: &[i8],
) -> io::Result<()> {
    for row in spins.chunks(lattice.size) {
        for (j, s) in row.iter().enumerate() {
            if j > 0 {
                out.write_all(b",")?;
            }
            write!(out, "{s}")?;
        }
        out.write_all(b"\n")?;
    }
    out.write_all(b"\n")
}

impl<L: Write, E: Write> SnapshotSink for CsvSnapshotWriter<L, E> {
    fn write_lattice(&mut self, lattice: &Lattice, spins: &[i8]) -> io::Result<()> {
        match self.lattice_out.as_mut() {
            Some(out) => write_lattice_csv(out, lattice, spins),
            None => Ok(()),
        }
    }

    fn write_energy(&mut self, index: u64, energy: f64) -> io::Result<()> {
        match self.energy_out.as_mut() {
            Some(out) => writeln!(out, "{index} {energy:?}"),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(out) = self.lattice_out.as_mut() {
            out.flush()?;
        }
        if let Some(out) = self.energy_out.as_mut() {
            out.flush()?;
        }
        Ok(())
    }
}
