//! Reader for MCPL particle list files
//!
//! Understands both plain and gzipped files, sniffing the two-byte gzip
//! magic rather than trusting the file extension. The header is parsed and
//! validated up front, after which particles stream out one at a time until
//! the declared count is exhausted.

// internal modules
use crate::mcpl::{Blob, Header, FORMAT_VERSION, MAGIC};
use crate::particle::Particle;
use crate::utils::*;

// standard library
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

// external crates
use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use log::{debug, trace};

/// A streaming reader for MCPL files
///
/// ```ignore
/// let mut reader = McplReader::open("output.mcpl.gz")?;
/// println!("{} particles from {}", reader.nparticles(), reader.source_name());
/// while let Some(particle) = reader.load()? {
///     // ...
/// }
/// ```
pub struct McplReader {
    reader: Box<dyn Read>,
    header: Header,
    loaded: u64,
    record: Vec<u8>,
}

impl McplReader {
    /// Open a plain or gzipped MCPL file and parse its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).with_context(|| f!("Could not open {}", path.display()))?;

        // gzip magic sniff, the extension is not to be trusted
        let mut magic = [0u8; 2];
        let got = file.read(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;
        let mut reader: Box<dyn Read> = if got == 2 && magic == [0x1f, 0x8b] {
            trace!("{} is gzip compressed", path.display());
            Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };

        let header = read_header(&mut reader)
            .with_context(|| f!("{} is not a valid MCPL file", path.display()))?;
        debug!(
            "Opened {}: {} particles from \"{}\"",
            path.display(),
            header.nparticles,
            header.source_name
        );

        let record = vec![0u8; header.particle_bytes()];
        Ok(Self {
            reader,
            header,
            loaded: 0,
            record,
        })
    }

    /// The full parsed header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Name of the program that produced the file
    pub fn source_name(&self) -> &str {
        &self.header.source_name
    }

    /// Declared number of particle records
    pub fn nparticles(&self) -> u64 {
        self.header.nparticles
    }

    /// Records carry polarisation vectors
    pub fn has_polarisation(&self) -> bool {
        self.header.polarisation
    }

    /// Floating point fields are stored as f64
    pub fn double_precision(&self) -> bool {
        self.header.double_precision
    }

    /// Look up a header blob by key
    pub fn blob(&self, key: &str) -> Option<&Blob> {
        self.header.blobs.iter().find(|blob| blob.key == key)
    }

    /// Pull the next particle, `None` once the declared count is reached
    ///
    /// A file that ends before its declared count is corrupt and reported as
    /// an error rather than a clean end.
    pub fn load(&mut self) -> Result<Option<Particle>> {
        if self.loaded == self.header.nparticles {
            return Ok(None);
        }
        self.reader
            .read_exact(&mut self.record)
            .context("MCPL particle data ends before the declared count")?;
        self.loaded += 1;

        let fp_bytes = self.header.fp_bytes();
        let fp = |index: usize| -> f64 {
            let at = 4 + index * fp_bytes;
            let bytes = &self.record[at..at + fp_bytes];
            if self.header.double_precision {
                f64::from_ne_bytes(bytes.try_into().unwrap())
            } else {
                f32::from_ne_bytes(bytes.try_into().unwrap()) as f64
            }
        };

        let mut particle = Particle {
            pdgcode: i32::from_ne_bytes(self.record[..4].try_into().unwrap()),
            position: [fp(0), fp(1), fp(2)],
            direction: [fp(3), fp(4), fp(5)],
            polarisation: [0.0; 3],
            ekin: fp(6),
            time: fp(7),
            weight: fp(8),
        };
        if self.header.polarisation {
            particle.polarisation = [fp(9), fp(10), fp(11)];
        }

        Ok(Some(particle))
    }
}

impl std::fmt::Debug for McplReader {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("McplReader")
            .field("header", &self.header)
            .field("loaded", &self.loaded)
            .finish()
    }
}

/// Parse and validate the header block
fn read_header(reader: &mut impl Read) -> Result<Header> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        bail!("Bad magic bytes, expected \"MCPL\"");
    }

    let mut version = [0u8; 3];
    reader.read_exact(&mut version)?;
    if &version != FORMAT_VERSION {
        bail!(
            "Unsupported format version \"{}\"",
            String::from_utf8_lossy(&version)
        );
    }

    let mut endian = [0u8; 1];
    reader.read_exact(&mut endian)?;
    let native = if cfg!(target_endian = "little") {
        b'L'
    } else {
        b'B'
    };
    if endian[0] != native {
        bail!(
            "File endianness '{}' does not match this system",
            endian[0] as char
        );
    }

    let nparticles = read_u64(reader)?;
    let ncomments = read_u32(reader)?;
    let nblobs = read_u32(reader)?;
    let polarisation = read_u32(reader)? != 0;
    let double_precision = read_u32(reader)? != 0;
    let particle_bytes = read_u32(reader)? as usize;

    let source_name = read_string(reader).context("Could not read source name")?;
    let mut comments = Vec::with_capacity(ncomments as usize);
    for _ in 0..ncomments {
        comments.push(read_string(reader).context("Could not read comment")?);
    }
    let mut blobs = Vec::with_capacity(nblobs as usize);
    for _ in 0..nblobs {
        let key = read_string(reader).context("Could not read blob key")?;
        let length = read_u32(reader)? as usize;
        let mut data = vec![0u8; length];
        reader
            .read_exact(&mut data)
            .with_context(|| f!("Could not read blob \"{key}\""))?;
        blobs.push(Blob { key, data });
    }

    let header = Header {
        source_name,
        comments,
        blobs,
        polarisation,
        double_precision,
        nparticles,
    };
    if header.particle_bytes() != particle_bytes {
        bail!(
            "Inconsistent record size: file declares {particle_bytes} bytes, storage options imply {}",
            header.particle_bytes()
        );
    }

    Ok(header)
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_ne_bytes(bytes))
}

fn read_u64(reader: &mut impl Read) -> Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_ne_bytes(bytes))
}

fn read_string(reader: &mut impl Read) -> Result<String> {
    let length = read_u32(reader)? as usize;
    let mut bytes = vec![0u8; length];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).context("String field is not valid UTF-8")
}
