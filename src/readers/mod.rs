#![doc(hidden)]
//! Library of readers for the two binary file formats

// internal modules
use crate::mcpl::Header;
use crate::particle::Particle;

// standard library
use std::path::Path;

// external crates
use anyhow::Result;

// files under the readers module
mod dump_file;
mod mcpl_file;

// inline important the file readers for a nice API
#[doc(inline)]
pub use crate::readers::dump_file::{DumpReader, DumpRecord};

#[doc(inline)]
pub use crate::readers::mcpl_file::McplReader;

/// Read every record of a binary PHITS dump file
///
/// Returns a result containing a vector of [DumpRecord] structs, one per
/// record in the file. Untranslatable kf-codes are kept (with a `pdgcode` of
/// 0) so the caller can do its own accounting.
///
/// - `path` - Path to the dump file, can be [&str], [String], [Path], etc...
///
/// The streaming [DumpReader] is the better choice for large files, this is
/// a convenience for when everything is wanted in memory anyway.
pub fn read_dump_file<P: AsRef<Path>>(path: P) -> Result<Vec<DumpRecord>> {
    let path: &Path = Path::new(path.as_ref());
    let mut reader = DumpReader::open(path)?;
    let mut records = Vec::new();
    while let Some(record) = reader.load()? {
        records.push(record);
    }
    Ok(records)
}

/// Read an entire MCPL file, header and particles
///
/// Returns a result containing the parsed [Header] and every particle in the
/// file. Handles gzipped files transparently.
///
/// - `path` - Path to the MCPL file, can be [&str], [String], [Path], etc...
pub fn read_mcpl_file<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Particle>)> {
    let path: &Path = Path::new(path.as_ref());
    let mut reader = McplReader::open(path)?;
    let mut particles = Vec::with_capacity(reader.nparticles() as usize);
    while let Some(particle) = reader.load()? {
        particles.push(particle);
    }
    Ok((reader.header().clone(), particles))
}
