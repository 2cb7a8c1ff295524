//! Loading and sanity checking of auxiliary metadata files
//!
//! The converters can embed the PHITS input deck and dump summary text files
//! into the MCPL header so the particle list carries its own provenance.
//! Nothing here interprets the content, the checks are deliberately loose to
//! avoid false positives:
//!
//! - the file must be within a sane size range,
//! - every byte must look like ASCII or UTF-8 text,
//! - the caller checks for a keyword that plausibly ties the file to the
//!   conversion (in practice the word `dump`).
//!
//! Any failure aborts the whole conversion, a wrong file embedded forever in
//! the output is worse than asking the user to check their paths.

// internal modules
use crate::utils::*;

// standard library
use std::path::Path;

// external crates
use anyhow::{bail, Context, Result};

/// Ceiling on embedded file size (100 MiB)
pub const MAX_FILE_BYTES: u64 = 104_857_600;

/// Files smaller than this cannot plausibly be an input deck or summary
pub const MIN_FILE_BYTES: u64 = 50;

/// Load an auxiliary text file completely into memory
///
/// Applies the size bounds and the [buffer_is_text] heuristic. The returned
/// buffer is handed straight to the MCPL header embedding and dropped once
/// the header is written.
pub fn load_text_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let length = path
        .metadata()
        .with_context(|| f!("Could not open {}", path.display()))?
        .len();

    if length < MIN_FILE_BYTES {
        bail!("File {} is suspiciously short", path.display());
    }
    if length > MAX_FILE_BYTES {
        bail!(
            "File {} is larger than {MAX_FILE_BYTES} bytes",
            path.display()
        );
    }

    let buffer =
        std::fs::read(path).with_context(|| f!("Could not read {}", path.display()))?;

    if !buffer_is_text(&buffer) {
        bail!("File {} does not appear to be a text file", path.display());
    }

    Ok(buffer)
}

/// Loose check that a buffer holds readable text
///
/// Accepts ASCII and UTF-8 but will classify UTF-16 and UTF-32 as binary,
/// which is fine for the PHITS-adjacent files this is pointed at. Allowed
/// bytes are horizontal/vertical whitespace (9-13), printable ASCII (32-126),
/// and anything with the high bit set (UTF-8 continuation and lead bytes).
pub fn buffer_is_text(buffer: &[u8]) -> bool {
    buffer
        .iter()
        .all(|&b| (9..=13).contains(&b) || (32..=126).contains(&b) || b >= 128)
}

/// Check for an expected keyword anywhere in the buffer
pub fn contains_keyword(buffer: &[u8], keyword: &str) -> bool {
    let keyword = keyword.as_bytes();
    if keyword.is_empty() || buffer.len() < keyword.len() {
        return false;
    }
    buffer.windows(keyword.len()).any(|window| window == keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(f!("phitsmcpl_meta_{}_{name}", std::process::id()))
    }

    #[test]
    fn text_heuristic_accepts_ascii_and_utf8() {
        assert!(buffer_is_text(b"dump = 13\n1 2 3 4 5 6 7 8 9 10\n"));
        assert!(buffer_is_text("file = d\u{00e9}p\u{00f4}t.dmp\n".as_bytes()));
    }

    #[test]
    fn text_heuristic_rejects_binary() {
        assert!(!buffer_is_text(b"\x00\x01\x02"));
        assert!(!buffer_is_text(b"mostly text\x00"));
    }

    #[test]
    fn keyword_search_finds_substrings() {
        assert!(contains_keyword(b"ncol = 8\ndump = 13\n", "dump"));
        assert!(!contains_keyword(b"ncol = 8\n", "dump"));
        assert!(!contains_keyword(b"dum", "dump"));
    }

    #[test]
    fn short_files_rejected() {
        let path = scratch("short.txt");
        std::fs::write(&path, "dump").unwrap();
        assert!(load_text_file(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_files_rejected() {
        assert!(load_text_file(scratch("missing.txt")).is_err());
    }

    #[test]
    fn plausible_files_load_whole() {
        let path = scratch("deck.txt");
        let content = "[ t-userdefined ]\n  dump = 13\n  1 2 3 4 5 6 7 8 9 10 14 15 16\n";
        std::fs::write(&path, content).unwrap();

        let buffer = load_text_file(&path).unwrap();
        assert_eq!(buffer.len(), content.len());
        assert!(contains_keyword(&buffer, "dump"));
        std::fs::remove_file(&path).unwrap();
    }
}
