//! Fortran-style record framing for binary dump files
//!
//! PHITS writes sequential unformatted Fortran records, so every payload is
//! wrapped in a pair of length markers:
//!
//! ```text
//! <record byte length> <payload> <record byte length>
//! ```
//!
//! The marker is an unsigned integer of either 4 or 8 bytes depending on how
//! the Fortran runtime was configured, and the leading and trailing values
//! must match. The width is a file-level constant, so it is decided once and
//! passed explicitly to every call here.
//!
//! The endian is assumed to be the same as the native type of the system
//! this tool is run on, as with all the other binary formats in this crate.

// standard library
use std::io::{ErrorKind, Read, Write};

// external crates
use anyhow::{anyhow, bail, Result};

/// Width of the record length markers in a dump file
///
/// Constructed through [MarkerWidth::from_bytes] so an unsupported width is
/// rejected before any file is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerWidth {
    /// 32-bit markers, the common Fortran default
    Four,
    /// 64-bit markers
    Eight,
}

impl MarkerWidth {
    /// Validate a raw byte count into a marker width
    ///
    /// Anything other than 4 or 8 is a configuration error, raised here
    /// rather than partway through writing a file.
    pub fn from_bytes(bytes: usize) -> Result<Self> {
        match bytes {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            _ => Err(anyhow!(
                "Record marker width should be 4 (32bit Fortran record markers, recommended) or 8 (64bit Fortran record markers), got {bytes}"
            )),
        }
    }

    /// Marker size in bytes
    pub fn bytes(&self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

/// Write one framed record
///
/// Serialises the payload length as a native-endian marker, then the payload,
/// then the marker again. Uses `write_all` throughout so a short write at any
/// of the three stages fails the record outright rather than leaving a
/// partial one behind.
pub fn write_record<W: Write>(writer: &mut W, width: MarkerWidth, payload: &[u8]) -> Result<()> {
    match width {
        MarkerWidth::Four => {
            let marker = u32::try_from(payload.len())?;
            writer.write_all(&marker.to_ne_bytes())?;
            writer.write_all(payload)?;
            writer.write_all(&marker.to_ne_bytes())?;
        }
        MarkerWidth::Eight => {
            let marker = payload.len() as u64;
            writer.write_all(&marker.to_ne_bytes())?;
            writer.write_all(payload)?;
            writer.write_all(&marker.to_ne_bytes())?;
        }
    }
    Ok(())
}

/// Read one framed record into `buf`
///
/// Returns the payload length, or `None` on a clean end of stream (i.e. the
/// reader is exhausted before the first marker byte). The trailing marker
/// must equal the leading one, anything else means the stream has lost
/// framing and is unrecoverable.
pub fn read_record<R: Read>(
    reader: &mut R,
    width: MarkerWidth,
    buf: &mut Vec<u8>,
) -> Result<Option<usize>> {
    let length = match read_marker(reader, width)? {
        Some(length) => length,
        None => return Ok(None),
    };

    buf.clear();
    buf.resize(usize::try_from(length)?, 0);
    reader.read_exact(buf)?;

    let trailing = read_marker(reader, width)?
        .ok_or_else(|| anyhow!("Record truncated, missing trailing marker"))?;
    if trailing != length {
        bail!("Record markers disagree: leading {length}, trailing {trailing}");
    }

    Ok(Some(buf.len()))
}

/// Read a single length marker, `None` on clean EOF
fn read_marker<R: Read>(reader: &mut R, width: MarkerWidth) -> Result<Option<u64>> {
    let mut bytes = [0u8; 8];
    let marker = &mut bytes[..width.bytes()];
    match reader.read_exact(marker) {
        Ok(()) => (),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let value = match width {
        MarkerWidth::Four => u32::from_ne_bytes(bytes[..4].try_into().unwrap()) as u64,
        MarkerWidth::Eight => u64::from_ne_bytes(bytes),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case(4)]
    #[case(8)]
    fn valid_widths_accepted(#[case] bytes: usize) {
        assert_eq!(MarkerWidth::from_bytes(bytes).unwrap().bytes(), bytes);
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    #[case(16)]
    fn invalid_widths_rejected(#[case] bytes: usize) {
        assert!(MarkerWidth::from_bytes(bytes).is_err());
    }

    #[rstest]
    #[case(MarkerWidth::Four, 0)]
    #[case(MarkerWidth::Four, 1)]
    #[case(MarkerWidth::Four, 80)]
    #[case(MarkerWidth::Eight, 104)]
    #[case(MarkerWidth::Eight, 1000)]
    fn write_then_read_round_trips(#[case] width: MarkerWidth, #[case] length: usize) {
        let payload = (0..length).map(|i| i as u8).collect::<Vec<u8>>();

        let mut stream = Vec::new();
        write_record(&mut stream, width, &payload).unwrap();
        assert_eq!(stream.len(), 2 * width.bytes() + length);

        let mut cursor = Cursor::new(stream);
        let mut buf = Vec::new();
        let n = read_record(&mut cursor, width, &mut buf).unwrap();
        assert_eq!(n, Some(length));
        assert_eq!(buf, payload);

        // stream exhausted, next read reports end cleanly
        assert_eq!(read_record(&mut cursor, width, &mut buf).unwrap(), None);
    }

    #[test]
    fn mismatched_trailing_marker_is_an_error() {
        let mut stream = Vec::new();
        write_record(&mut stream, MarkerWidth::Four, &[1, 2, 3, 4]).unwrap();
        let last = stream.len() - 1;
        stream[last] ^= 0x01;

        let mut buf = Vec::new();
        let result = read_record(&mut Cursor::new(stream), MarkerWidth::Four, &mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut stream = Vec::new();
        write_record(&mut stream, MarkerWidth::Four, &[0u8; 16]).unwrap();
        stream.truncate(12);

        let mut buf = Vec::new();
        let result = read_record(&mut Cursor::new(stream), MarkerWidth::Four, &mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn consecutive_records_keep_framing() {
        let mut stream = Vec::new();
        write_record(&mut stream, MarkerWidth::Eight, &[0xAA; 80]).unwrap();
        write_record(&mut stream, MarkerWidth::Eight, &[0xBB; 80]).unwrap();

        let mut cursor = Cursor::new(stream);
        let mut buf = Vec::new();
        read_record(&mut cursor, MarkerWidth::Eight, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xAA));
        read_record(&mut cursor, MarkerWidth::Eight, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xBB));
    }
}
