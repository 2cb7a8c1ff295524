//! # The Phitsmcpl crate
//!
//! Tools for converting binary PHITS dump files to and from the MCPL format
//!
//! ## Installation
//!
//! Direct install from github:
//!
//! ```shell
//! cargo install --git https://github.com/repositony/phitsmcpl.git
//! ```
//!
//! ## Overview
//!
//! The crate contains command line tools for moving Monte Carlo particle
//! data between the PHITS binary dump format and the portable MCPL particle
//! list format.
//!
//! | Command line | Description                                          |
//! | ------------ | ---------------------------------------------------- |
//! | `phits2mcpl` | Convert a binary PHITS dump file to MCPL             |
//! | `mcpl2phits` | Convert an MCPL file to a binary PHITS dump file     |
//! | `mcpltool`   | Inspect the header and particles of an MCPL file     |
//!
//! All tools are fully documented with detailed `--help` messages, including
//! examples for common use cases.
//!
//! ### Supported formats
//!
//! PHITS dump files must be binary, with the common 10-column configuration
//! or the 13-column configuration carrying polarisation:
//!
//! ```text
//! dump = 13
//! 1 2 3 4 5 6 7 8 9 10 14 15 16
//! ```
//!
//! Both 32-bit and 64-bit Fortran record markers are handled, and detected
//! automatically on the read side. MCPL files may be plain or gzipped.
//!
//! Species without a representation on the other side of a conversion (PDG
//! codes with no PHITS kf counterpart and vice versa) are skipped and
//! counted, never guessed at.
//!
//! ## Advanced use
//!
//! Anyone reading these docs is likely familiar with Rust, so between us the
//! command line tools are purely for colleagues and convenience. The crate
//! exposes everything they are built from:
//!
//! ```rust,ignore
//! use phitsmcpl::convert::{phits_to_mcpl, PhitsToMcplConfig};
//!
//! let summary = phits_to_mcpl(&PhitsToMcplConfig {
//!     input: "dump_data.dmp".into(),
//!     output: "output.mcpl".into(),
//!     double_precision: false,
//!     gzip: true,
//!     input_deck: None,
//!     dump_summary: None,
//!     progress: false,
//! })?;
//!
//! println!("{summary}");
//! ```
//!
//! As an overview:
//! - The [convert] module contains the conversion drivers for both
//! directions and their configuration.
//! - The [particle] module holds the canonical particle both formats are
//! coerced into.
//! - The [species] module translates particle type codes between the PHITS
//! kf and PDG numbering schemes.
//! - The [framing] module reads and writes the Fortran record markers that
//! wrap every dump record.
//! - The [dump] and [mcpl] modules own the two on-disk layouts and their
//! writers, with the matching readers in [readers].
//! - The [metadata] module loads and sanity checks the auxiliary text files
//! that can be embedded into MCPL headers.
//!
//! All of the useful functionality from the file readers and core data
//! structures are re-exported for convenience.

// Public facing modules
pub mod convert;
pub mod dump;
pub mod framing;
pub mod mcpl;
pub mod metadata;
pub mod particle;
pub mod species;
pub mod utils;

// note that docs are hidden to prevent confusing the current simple API
pub mod readers;

// Re-exports of useful data structures
#[doc(inline)]
pub use crate::convert::{mcpl_to_phits, phits_to_mcpl, ConvertSummary};

#[doc(inline)]
pub use crate::particle::Particle;

#[doc(inline)]
pub use crate::readers::{read_dump_file, read_mcpl_file, DumpReader, McplReader};
