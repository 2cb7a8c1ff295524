//! PHITS dump record layout and writer
//!
//! A dump record is 10 or 13 IEEE-754 doubles in a fixed order, framed by the
//! Fortran record markers from [framing](crate::framing):
//!
//! ```text
//! <marker>
//!     <kf> <x> <y> <z> <u> <v> <w> <ekin> <weight> <time>
//!     (<sx> <sy> <sz>)
//! <marker>
//! ```
//!
//! The three polarisation fields are either present in every record of a file
//! or in none of them, so the field count is fixed at writer creation. This
//! matches a PHITS input section of `dump = 13` with columns
//! `1 2 3 4 5 6 7 8 9 10 14 15 16`, or `dump = 10` with `1 2 3 4 5 6 7 8 9 10`.
//!
//! Positions are cm and energies MeV in both formats. Times are the
//! exception, so they pass through the same conversion factor the MCPL
//! distribution uses for its PHITS tools.

// internal modules
use crate::framing::{self, MarkerWidth};
use crate::particle::Particle;
use crate::utils::*;

// standard library
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// external crates
use anyhow::{Context, Result};
use log::trace;

/// Number of doubles in a record without polarisation
pub const RECORD_FIELDS: usize = 10;

/// Number of doubles in a record carrying polarisation
pub const RECORD_FIELDS_POL: usize = 13;

/// Pack one particle into the dump field order
///
/// Only the leading 10 or 13 values of `fields` end up on disk; the caller
/// decides which when framing the payload.
pub fn fill_record(fields: &mut [f64; RECORD_FIELDS_POL], kf: i32, particle: &Particle) {
    fields[0] = f64::from(kf);
    fields[1] = particle.position[0]; // already in cm
    fields[2] = particle.position[1];
    fields[3] = particle.position[2];
    fields[4] = particle.direction[0];
    fields[5] = particle.direction[1];
    fields[6] = particle.direction[2];
    fields[7] = particle.ekin; // already in MeV
    fields[8] = particle.weight;
    fields[9] = particle.time * 1.0e-6; // ms (MCPL) to ns (PHITS)
    fields[10] = particle.polarisation[0];
    fields[11] = particle.polarisation[1];
    fields[12] = particle.polarisation[2];
}

/// Writer for binary PHITS dump files
///
/// Owns the output stream, the marker configuration, and a single fixed-size
/// record buffer reused for every particle. One framed record is serialised
/// per [write](DumpWriter::write) call, so memory use is flat no matter how
/// many particles pass through.
#[derive(Debug)]
pub struct DumpWriter {
    writer: BufWriter<File>,
    marker: MarkerWidth,
    polarisation: bool,
    fields: [f64; RECORD_FIELDS_POL],
    bytes: [u8; RECORD_FIELDS_POL * 8],
}

impl DumpWriter {
    /// Create (or truncate) a dump file at `path`
    pub fn create<P: AsRef<Path>>(path: P, marker: MarkerWidth, polarisation: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| f!("Could not create {}", path.display()))?;
        trace!("New dump writer for {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            marker,
            polarisation,
            fields: [0.0; RECORD_FIELDS_POL],
            bytes: [0u8; RECORD_FIELDS_POL * 8],
        })
    }

    /// Number of doubles each record of this file carries
    pub fn record_fields(&self) -> usize {
        if self.polarisation {
            RECORD_FIELDS_POL
        } else {
            RECORD_FIELDS
        }
    }

    /// Serialise one particle as a framed record
    ///
    /// The kf-code is passed alongside the particle because translation
    /// failures are the caller's to count, a particle only reaches this point
    /// once it has a valid code.
    pub fn write(&mut self, kf: i32, particle: &Particle) -> Result<()> {
        fill_record(&mut self.fields, kf, particle);
        for (chunk, value) in self.bytes.chunks_exact_mut(8).zip(&self.fields) {
            chunk.copy_from_slice(&value.to_ne_bytes());
        }
        let payload = &self.bytes[..self.record_fields() * 8];
        framing::write_record(&mut self.writer, self.marker, payload)
    }

    /// Flush and close the file, surfacing any buffered write errors
    pub fn close(mut self) -> Result<()> {
        self.writer.flush().context("Could not flush dump file")?;
        Ok(())
    }
}
