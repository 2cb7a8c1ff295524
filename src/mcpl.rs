//! MCPL particle-list container, header and writer
//!
//! MCPL files are self-describing particle lists: a header carrying the
//! producer name, free-text comments, named binary blobs and the storage
//! options, followed by one fixed-size record per particle. The whole file
//! may be gzipped after writing, and readers are expected to cope with both
//! forms.
//!
//! The byte layout used by this crate:
//!
//! ```text
//! [ 4] magic "MCPL"
//! [ 3] format version, ascii digits
//! [ 1] endianness, 'L' little or 'B' big
//! [ 8] u64 particle count (patched when the file is closed)
//! [ 4] u32 number of comments
//! [ 4] u32 number of blobs
//! [ 4] u32 polarisation storage flag
//! [ 4] u32 double-precision storage flag
//! [ 4] u32 bytes per particle record
//! [..] source name                   <u32 length> <bytes>
//! [..] comments, each                <u32 length> <bytes>
//! [..] blobs, each                   <u32 length> <key> <u32 length> <data>
//! [..] particle records
//! ```
//!
//! A particle record is an i32 PDG code followed by position, direction,
//! kinetic energy, time, weight and (only when enabled) polarisation, stored
//! as f32 by default or f64 in double-precision mode.
//!
//! All integers and floats are native-endian, with the header byte recording
//! which that was at write time.

// internal modules
use crate::particle::Particle;
use crate::utils::*;

// standard library
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

// external crates
use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, trace};

/// File magic, always the first four bytes
pub const MAGIC: &[u8; 4] = b"MCPL";

/// Format version written by this crate
pub const FORMAT_VERSION: &[u8; 3] = b"003";

/// Byte offset of the u64 particle count, patched on close
const NPARTICLES_OFFSET: u64 = 8;

/// A named binary blob attached to the header
///
/// Used to embed things like the PHITS input deck that produced a dump file.
/// The core never interprets the bytes.
#[derive(Debug, Clone)]
pub struct Blob {
    pub key: String,
    pub data: Vec<u8>,
}

/// Parsed or pending MCPL header fields
///
/// For a writer this accumulates until the first particle forces it onto
/// disk. For a reader it is the parsed copy of what the file declared.
#[derive(Debug, Clone, Default)]
pub struct Header {
    /// Name of the program that produced the particles
    pub source_name: String,
    /// Human-readable comments, in order of addition
    pub comments: Vec<String>,
    /// Named binary blobs, in order of addition
    pub blobs: Vec<Blob>,
    /// Particle records carry polarisation vectors
    pub polarisation: bool,
    /// Floating point fields stored as f64 rather than f32
    pub double_precision: bool,
    /// Declared number of particle records
    pub nparticles: u64,
}

impl Header {
    /// Bytes of one floating point field under the storage options
    pub fn fp_bytes(&self) -> usize {
        if self.double_precision {
            8
        } else {
            4
        }
    }

    /// Number of floating point fields per particle record
    pub fn fp_fields(&self) -> usize {
        // position, direction, ekin, time, weight, and maybe polarisation
        if self.polarisation {
            12
        } else {
            9
        }
    }

    /// Total bytes of one particle record
    pub fn particle_bytes(&self) -> usize {
        4 + self.fp_fields() * self.fp_bytes()
    }
}

/// Writer for MCPL files
///
/// Header fields may be set freely after [create](McplWriter::create), but
/// the header is serialised once the first particle arrives and is immutable
/// from then on. [close](McplWriter::close) patches the particle count into
/// the fixed header slot; [close_and_gzip](McplWriter::close_and_gzip)
/// additionally compresses the finished file.
#[derive(Debug)]
pub struct McplWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    header: Header,
    header_written: bool,
    nparticles: u64,
    record: Vec<u8>,
}

impl McplWriter {
    /// Create (or truncate) an MCPL file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file =
            File::create(&path).with_context(|| f!("Could not create {}", path.display()))?;
        trace!("New MCPL writer for {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            header: Header::default(),
            header_written: false,
            nparticles: 0,
            record: Vec::with_capacity(4 + 12 * 8),
        })
    }

    /// Name of the program the particles came from
    pub fn set_source_name(&mut self, name: &str) -> Result<()> {
        self.check_mutable("source name")?;
        self.header.source_name = name.to_string();
        Ok(())
    }

    /// Attach a free-text comment to the header
    pub fn add_comment(&mut self, comment: &str) -> Result<()> {
        self.check_mutable("comment")?;
        self.header.comments.push(comment.to_string());
        Ok(())
    }

    /// Attach a named binary blob to the header
    ///
    /// The buffer is moved in and released as soon as the header hits disk.
    pub fn add_blob(&mut self, key: &str, data: Vec<u8>) -> Result<()> {
        self.check_mutable("blob")?;
        self.header.blobs.push(Blob {
            key: key.to_string(),
            data,
        });
        Ok(())
    }

    /// Store polarisation vectors with every particle
    pub fn enable_polarisation(&mut self) -> Result<()> {
        self.check_mutable("polarisation mode")?;
        self.header.polarisation = true;
        Ok(())
    }

    /// Store floating point fields as f64 rather than f32
    pub fn enable_double_precision(&mut self) -> Result<()> {
        self.check_mutable("precision mode")?;
        self.header.double_precision = true;
        Ok(())
    }

    /// Append one particle record, writing the header first if needed
    pub fn add_particle(&mut self, particle: &Particle) -> Result<()> {
        self.ensure_header()?;

        self.record.clear();
        self.record.extend_from_slice(&particle.pdgcode.to_ne_bytes());
        for value in particle.position {
            self.push_fp(value);
        }
        for value in particle.direction {
            self.push_fp(value);
        }
        self.push_fp(particle.ekin);
        self.push_fp(particle.time);
        self.push_fp(particle.weight);
        if self.header.polarisation {
            for value in particle.polarisation {
                self.push_fp(value);
            }
        }

        self.writer.write_all(&self.record)?;
        self.nparticles += 1;
        Ok(())
    }

    /// Particles written so far
    pub fn nparticles(&self) -> u64 {
        self.nparticles
    }

    /// Finish the file and return its path
    pub fn close(mut self) -> Result<PathBuf> {
        self.finalise()?;
        Ok(self.path)
    }

    /// Finish the file, gzip it to `<path>.gz`, and return the new path
    ///
    /// The uncompressed file is removed once the compressed copy is on disk.
    pub fn close_and_gzip(mut self) -> Result<PathBuf> {
        self.finalise()?;

        let mut gz_path = self.path.clone().into_os_string();
        gz_path.push(".gz");
        let gz_path = PathBuf::from(gz_path);

        debug!("Compressing {} to .gz", self.path.display());
        let mut input = BufReader::new(
            File::open(&self.path)
                .with_context(|| f!("Could not reopen {}", self.path.display()))?,
        );
        let output = File::create(&gz_path)
            .with_context(|| f!("Could not create {}", gz_path.display()))?;
        let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
        std::io::copy(&mut input, &mut encoder)?;
        encoder
            .finish()
            .context("Could not finish gzip stream")?
            .flush()?;
        std::fs::remove_file(&self.path)
            .with_context(|| f!("Could not remove {}", self.path.display()))?;

        Ok(gz_path)
    }

    fn check_mutable(&self, what: &str) -> Result<()> {
        if self.header_written {
            bail!("Cannot set {what}, the header is already on disk");
        }
        Ok(())
    }

    fn push_fp(&mut self, value: f64) {
        if self.header.double_precision {
            self.record.extend_from_slice(&value.to_ne_bytes());
        } else {
            self.record.extend_from_slice(&(value as f32).to_ne_bytes());
        }
    }

    /// Serialise the header exactly once
    fn ensure_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }

        let w = &mut self.writer;
        w.write_all(MAGIC)?;
        w.write_all(FORMAT_VERSION)?;
        w.write_all(&[endian_byte()])?;
        w.write_all(&0u64.to_ne_bytes())?; // particle count placeholder
        w.write_all(&u32::try_from(self.header.comments.len())?.to_ne_bytes())?;
        w.write_all(&u32::try_from(self.header.blobs.len())?.to_ne_bytes())?;
        w.write_all(&u32::from(self.header.polarisation).to_ne_bytes())?;
        w.write_all(&u32::from(self.header.double_precision).to_ne_bytes())?;
        w.write_all(&u32::try_from(self.header.particle_bytes())?.to_ne_bytes())?;

        write_string(w, &self.header.source_name)?;
        for comment in &self.header.comments {
            write_string(w, comment)?;
        }
        for blob in &mut self.header.blobs {
            write_string(w, &blob.key)?;
            let data = std::mem::take(&mut blob.data);
            w.write_all(&u32::try_from(data.len())?.to_ne_bytes())?;
            w.write_all(&data)?;
            // blob buffers are dropped here, the header never needs them again
        }

        self.header_written = true;
        Ok(())
    }

    fn finalise(&mut self) -> Result<()> {
        // an empty file still needs its header
        self.ensure_header()?;
        self.writer.flush().context("Could not flush MCPL file")?;

        // patch the particle count into the fixed slot after the magic bytes
        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(NPARTICLES_OFFSET))?;
        file.write_all(&self.nparticles.to_ne_bytes())?;
        file.flush()?;

        debug!(
            "Closed {} with {} particles",
            self.path.display(),
            self.nparticles
        );
        Ok(())
    }
}

/// Length-prefixed string field
fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_all(&u32::try_from(s.len())?.to_ne_bytes())?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

/// Header byte recording the endianness of everything that follows
fn endian_byte() -> u8 {
    if cfg!(target_endian = "little") {
        b'L'
    } else {
        b'B'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(f!("phitsmcpl_mcpl_{}_{name}", std::process::id()))
    }

    #[test]
    fn header_starts_with_magic_and_version() {
        let path = scratch("magic.mcpl");
        let writer = McplWriter::create(&path).unwrap();
        writer.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(&bytes[4..7], FORMAT_VERSION);
        assert!(bytes[7] == b'L' || bytes[7] == b'B');
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn particle_count_patched_on_close() {
        let path = scratch("count.mcpl");
        let mut writer = McplWriter::create(&path).unwrap();
        for _ in 0..3 {
            writer.add_particle(&Particle::default()).unwrap();
        }
        writer.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let count = u64::from_ne_bytes(bytes[8..16].try_into().unwrap());
        assert_eq!(count, 3);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn header_mutation_after_first_particle_fails() {
        let path = scratch("frozen.mcpl");
        let mut writer = McplWriter::create(&path).unwrap();
        writer.set_source_name("PHITS").unwrap();
        writer.add_particle(&Particle::default()).unwrap();

        assert!(writer.set_source_name("other").is_err());
        assert!(writer.add_comment("too late").is_err());
        assert!(writer.add_blob("key", vec![1]).is_err());
        assert!(writer.enable_polarisation().is_err());
        assert!(writer.enable_double_precision().is_err());

        writer.close().unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn record_sizes_follow_storage_options() {
        let mut header = Header::default();
        assert_eq!(header.particle_bytes(), 4 + 9 * 4);
        header.polarisation = true;
        assert_eq!(header.particle_bytes(), 4 + 12 * 4);
        header.double_precision = true;
        assert_eq!(header.particle_bytes(), 4 + 12 * 8);
    }
}
