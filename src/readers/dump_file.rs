//! Reader for binary PHITS dump files
//!
//! Dump files carry no self-description at all, just back-to-back Fortran
//! records of 10 or 13 doubles. Both the marker width and the field count
//! are fixed per file, so they are inferred once from the first record and
//! the total file size, then trusted for the rest of the pass.

// internal modules
use crate::dump::RECORD_FIELDS_POL;
use crate::framing::{self, MarkerWidth};
use crate::particle::Particle;
use crate::species;
use crate::utils::*;

// standard library
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

// external crates
use anyhow::{bail, Context, Result};
use bincode::deserialize;
use log::debug;
use serde::Deserialize;

/// The 10-double core shared by every dump record layout
///
/// `bincode` maps this straight onto the raw payload bytes, the polarisation
/// tail (when present) is handled separately.
#[derive(Deserialize, Debug)]
struct RecordCore {
    kf: f64,
    x: f64,
    y: f64,
    z: f64,
    u: f64,
    v: f64,
    w: f64,
    ekin: f64,
    weight: f64,
    time: f64,
}

/// One decoded dump record
///
/// Keeps the raw kf field alongside the translated particle so callers can
/// name the offending code when the translation came back empty.
#[derive(Debug, Clone)]
pub struct DumpRecord {
    /// The kf-code exactly as stored in the file
    pub raw_code: i64,
    /// Translated particle, `pdgcode` 0 when the kf-code has no counterpart
    pub particle: Particle,
}

/// A streaming reader for binary PHITS dump files
///
/// ```ignore
/// let mut reader = DumpReader::open("phits.dmp")?;
/// while let Some(record) = reader.load()? {
///     // one record at a time, nothing is cached
/// }
/// ```
#[derive(Debug)]
pub struct DumpReader {
    reader: BufReader<File>,
    marker: MarkerWidth,
    payload_bytes: u64,
    nparticles: u64,
    payload: Vec<u8>,
}

impl DumpReader {
    /// Open a dump file, inferring marker width and record layout
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).with_context(|| f!("Could not open {}", path.display()))?;
        let length = file.metadata()?.len();

        let (marker, payload_bytes) = Self::detect_layout(&mut file, length).with_context(
            || {
                f!(
                    "{} does not look like a binary PHITS dump file in a supported configuration",
                    path.display()
                )
            },
        )?;
        file.seek(SeekFrom::Start(0))?;

        let record_bytes = 2 * marker.bytes() as u64 + payload_bytes;
        let nparticles = length / record_bytes;
        debug!(
            "Dump layout: {} byte markers, {} fields, {} records",
            marker.bytes(),
            payload_bytes / 8,
            nparticles
        );

        Ok(Self {
            reader: BufReader::new(file),
            marker,
            payload_bytes,
            nparticles,
            payload: Vec::with_capacity(RECORD_FIELDS_POL * 8),
        })
    }

    /// Number of records the file size implies
    pub fn nparticles(&self) -> u64 {
        self.nparticles
    }

    /// Records of this file carry the three polarisation fields
    pub fn has_polarisation(&self) -> bool {
        self.payload_bytes as usize == RECORD_FIELDS_POL * 8
    }

    /// The marker width the file was written with
    pub fn marker_width(&self) -> MarkerWidth {
        self.marker
    }

    /// Pull the next record, `None` once the file is exhausted
    pub fn load(&mut self) -> Result<Option<DumpRecord>> {
        let n = match framing::read_record(&mut self.reader, self.marker, &mut self.payload)? {
            Some(n) => n,
            None => return Ok(None),
        };
        if n as u64 != self.payload_bytes {
            bail!(
                "Record payload of {n} bytes, expected {}",
                self.payload_bytes
            );
        }

        let core: RecordCore =
            deserialize(&self.payload[..80]).context("Could not deserialise dump record")?;

        let raw_code = core.kf as i64;
        let mut particle = Particle {
            pdgcode: species::pdg_from_kf(raw_code),
            position: [core.x, core.y, core.z], // already in cm
            direction: [core.u, core.v, core.w],
            polarisation: [0.0; 3],
            ekin: core.ekin, // already in MeV
            time: core.time * 1.0e6, // nanoseconds (PHITS) to milliseconds (MCPL)
            weight: core.weight,
        };
        if self.has_polarisation() {
            for (slot, chunk) in particle
                .polarisation
                .iter_mut()
                .zip(self.payload[80..].chunks_exact(8))
            {
                *slot = f64::from_ne_bytes(chunk.try_into().unwrap());
            }
        }

        Ok(Some(DumpRecord { raw_code, particle }))
    }

    /// Work out the marker width and payload size from the first record
    ///
    /// A leading 4-byte marker of 80/104 is indistinguishable from the low
    /// half of an 8-byte marker on its own, so candidates are tried 4-byte
    /// first (the recommended PHITS configuration) and accepted only when
    /// the record size divides the file length and the first record's
    /// trailing marker agrees with the leading one.
    fn detect_layout(file: &mut File, length: u64) -> Result<(MarkerWidth, u64)> {
        // the smallest valid file is one 10-field record with 4-byte markers
        if length < 88 {
            bail!("File of {length} bytes is too short to hold a single record");
        }
        let mut head = [0u8; 8];
        file.read_exact(&mut head)?;

        for width in [MarkerWidth::Four, MarkerWidth::Eight] {
            let leading = match width {
                MarkerWidth::Four => u32::from_ne_bytes(head[..4].try_into().unwrap()) as u64,
                MarkerWidth::Eight => u64::from_ne_bytes(head),
            };
            if leading != 80 && leading != 104 {
                continue;
            }
            let record_bytes = 2 * width.bytes() as u64 + leading;
            if length % record_bytes != 0 {
                continue;
            }

            let mut tail = [0u8; 8];
            file.seek(SeekFrom::Start(width.bytes() as u64 + leading))?;
            file.read_exact(&mut tail[..width.bytes()])?;
            let trailing = match width {
                MarkerWidth::Four => u32::from_ne_bytes(tail[..4].try_into().unwrap()) as u64,
                MarkerWidth::Eight => u64::from_ne_bytes(tail),
            };

            if trailing == leading {
                return Ok((width, leading));
            }
        }

        bail!("Expected leading Fortran markers of 80 or 104 payload bytes");
    }
}
