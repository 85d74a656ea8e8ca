use polyns::core::models::walker::WalkerSnapshot;
use polyns::workflows::sample::TrajectorySink;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Visualization scale factor: reduced bead diameters to a CH2-like size in
/// angstroms so standard viewers render sensible bonds.
const VIS_SCALING: f64 = 3.75;

/// Appends extended-XYZ frames, one per committed eviction. All beads are
/// written as carbon at wrapped, scaled positions.
pub struct ExtxyzWriter {
    out: BufWriter<File>,
}

impl ExtxyzWriter {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
        })
    }

    pub fn append(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }
}

impl TrajectorySink for ExtxyzWriter {
    fn write_frame(
        &mut self,
        iteration: u64,
        threshold: f64,
        snapshot: &WalkerSnapshot,
    ) -> std::io::Result<()> {
        let cell: Vec<String> = snapshot
            .cell
            .iter()
            .flatten()
            .map(|c| format!("{:.8}", c * VIS_SCALING))
            .collect();

        writeln!(self.out, "{}", snapshot.coordinates.len())?;
        writeln!(
            self.out,
            "Lattice=\"{}\" Properties=species:S:1:pos:R:3 Iteration={} Threshold={:.8}",
            cell.join(" "),
            iteration,
            threshold
        )?;
        let wrapped = snapshot
            .wrapped_coordinates()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        for [x, y, z] in wrapped {
            writeln!(
                self.out,
                "C {:.8} {:.8} {:.8}",
                x * VIS_SCALING,
                y * VIS_SCALING,
                z * VIS_SCALING
            )?;
        }
        self.out.flush()
    }
}
