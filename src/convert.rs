//! Conversion drivers between PHITS dump files and MCPL
//!
//! Both directions follow the same shape: validate the configuration before
//! any file is touched, open the source, initialise the destination with its
//! descriptive metadata, then stream particles through the type-code
//! translation and schema mapping one at a time.
//!
//! Particles whose species cannot be represented on the other side are
//! dropped and counted, never silently miscoded. Everything else is fatal:
//! a conversion either finishes cleanly or leaves no destination file behind
//! (partial outputs are removed on the error path).
//!
//! Progress and per-particle warnings go through the `log` macros so the
//! conversion logic stays quiet and testable; the command line tools decide
//! what actually reaches the terminal.

// internal modules
use crate::dump::DumpWriter;
use crate::framing::MarkerWidth;
use crate::mcpl::McplWriter;
use crate::metadata;
use crate::readers::{DumpReader, McplReader};
use crate::species;
use crate::utils::*;

// standard library
use std::path::{Path, PathBuf};

// external crates
use anyhow::{bail, Result};
use kdam::{Bar, BarBuilder, BarExt};
use log::{info, warn};
use serde::Serialize;

/// Header key for an embedded PHITS input deck
pub const INPUT_DECK_KEY: &str = "phits_input_deck";

/// Header key for an embedded dump summary file
pub const DUMP_SUMMARY_KEY: &str = "phits_dump_summary_file";

/// Word expected somewhere in any embedded auxiliary file
const METADATA_KEYWORD: &str = "dump";

/// Untranslatable codes reported individually before going quiet
const MAX_REPORTED_SKIPS: u64 = 100;

/// Options for the dump to MCPL direction
#[derive(Debug, Clone)]
pub struct PhitsToMcplConfig {
    /// Path to the binary PHITS dump file
    pub input: PathBuf,
    /// Path of the MCPL file to create
    pub output: PathBuf,
    /// Store floating point values as f64
    pub double_precision: bool,
    /// Gzip the output once written
    pub gzip: bool,
    /// PHITS input deck to embed in the header
    pub input_deck: Option<PathBuf>,
    /// Dump summary text file to embed in the header
    pub dump_summary: Option<PathBuf>,
    /// Show a progress bar on the terminal
    pub progress: bool,
}

/// Options for the MCPL to dump direction
#[derive(Debug, Clone)]
pub struct McplToPhitsConfig {
    /// Path to the MCPL file, gzipped or not
    pub input: PathBuf,
    /// Path of the dump file to create
    pub output: PathBuf,
    /// Fortran record marker width in bytes, 4 or 8
    pub marker_bytes: usize,
    /// Write 13-field records carrying polarisation
    pub polarisation: bool,
    /// Stop after this many particles (0 = no limit)
    pub limit: u64,
    /// Show a progress bar on the terminal
    pub progress: bool,
}

/// What a finished conversion pass produced
#[derive(Debug, Clone, Serialize)]
pub struct ConvertSummary {
    /// Final path of the destination, including any `.gz` suffix
    pub output: PathBuf,
    /// Particles written to the destination
    pub written: u64,
    /// Particles dropped for having no species on the other side
    pub skipped: u64,
}

impl std::fmt::Display for ConvertSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created {} with {} particles",
            self.output.display(),
            self.written
        )
    }
}

/// Convert a binary PHITS dump file to MCPL
///
/// Auxiliary metadata files are loaded and validated before the destination
/// is created, so a bad input deck aborts the pass with nothing on disk.
pub fn phits_to_mcpl(config: &PhitsToMcplConfig) -> Result<ConvertSummary> {
    if config.input == config.output {
        // basic test, easy to cheat
        bail!("Input and output files are identical");
    }

    let input_deck = config
        .input_deck
        .as_deref()
        .map(load_metadata_file)
        .transpose()?;
    let dump_summary = config
        .dump_summary
        .as_deref()
        .map(load_metadata_file)
        .transpose()?;

    let mut reader = DumpReader::open(&config.input)?;

    match write_mcpl(config, &mut reader, input_deck, dump_summary) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            // a partial destination is worse than none
            let _ = std::fs::remove_file(&config.output);
            Err(e)
        }
    }
}

/// Convert an MCPL file to a binary PHITS dump file
pub fn mcpl_to_phits(config: &McplToPhitsConfig) -> Result<ConvertSummary> {
    let marker = MarkerWidth::from_bytes(config.marker_bytes)?;
    if config.input == config.output {
        bail!("Input and output files are identical");
    }

    let mut reader = McplReader::open(&config.input)?;
    info!(
        "Opened MCPL file produced with \"{}\" (contains {} particles)",
        reader.source_name(),
        reader.nparticles()
    );

    match write_dump(config, marker, &mut reader) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            let _ = std::fs::remove_file(&config.output);
            Err(e)
        }
    }
}

/// The dump to MCPL particle loop, destination already safe to create
fn write_mcpl(
    config: &PhitsToMcplConfig,
    reader: &mut DumpReader,
    input_deck: Option<Vec<u8>>,
    dump_summary: Option<Vec<u8>>,
) -> Result<ConvertSummary> {
    let mut writer = McplWriter::create(&config.output)?;
    writer.set_source_name("PHITS")?;
    writer.add_comment(&f!(
        "Converted from PHITS with phits2mcpl (phitsmcpl v{})",
        env!("CARGO_PKG_VERSION")
    ))?;
    if config.double_precision {
        writer.enable_double_precision()?;
    }
    if reader.has_polarisation() {
        writer.enable_polarisation()?;
    }
    if let Some(buffer) = input_deck {
        writer.add_blob(INPUT_DECK_KEY, buffer)?;
    }
    if let Some(buffer) = dump_summary {
        writer.add_blob(DUMP_SUMMARY_KEY, buffer)?;
    }

    let mut progress = progress_bar(config.progress, reader.nparticles());
    let mut skipped = 0u64;

    while let Some(record) = reader.load()? {
        if let Some(bar) = progress.as_mut() {
            bar.update(1).unwrap();
        }
        if record.particle.pdgcode == 0 {
            warn!(
                "Ignored particle with no PDG code (raw phits kf code was {})",
                record.raw_code
            );
            skipped += 1;
            continue;
        }
        writer.add_particle(&record.particle)?;
    }

    let written = writer.nparticles();
    let output = if config.gzip {
        writer.close_and_gzip()?
    } else {
        writer.close()?
    };

    Ok(ConvertSummary {
        output,
        written,
        skipped,
    })
}

/// The MCPL to dump particle loop, destination already safe to create
fn write_dump(
    config: &McplToPhitsConfig,
    marker: MarkerWidth,
    reader: &mut McplReader,
) -> Result<ConvertSummary> {
    let mut writer = DumpWriter::create(&config.output, marker, config.polarisation)?;
    let mut progress = progress_bar(config.progress, reader.nparticles());
    let mut written = 0u64;
    let mut skipped = 0u64;

    while let Some(particle) = reader.load()? {
        if let Some(bar) = progress.as_mut() {
            bar.update(1).unwrap();
        }

        let kf = species::kf_from_pdg(particle.pdgcode);
        if kf == 0 {
            skipped += 1;
            if skipped <= MAX_REPORTED_SKIPS {
                warn!(
                    "Found PDG code ({}) in the MCPL file which can not be converted to a PHITS particle code",
                    particle.pdgcode
                );
                if skipped == MAX_REPORTED_SKIPS {
                    warn!("Suppressing future warnings regarding non-convertible PDG codes");
                }
            }
            continue;
        }

        if written == i32::MAX as u64 {
            warn!(
                "Writing more than {} (maximum value of 32 bit integers) particles in the \
                 PHITS dump file - it is not known whether PHITS will be able to deal with \
                 such files correctly",
                i32::MAX
            );
        }
        writer.write(kf, &particle)?;
        written += 1;

        if config.limit != 0 && written == config.limit {
            let remaining = reader.nparticles().saturating_sub(skipped + written);
            if remaining > 0 {
                info!(
                    "Output limit of {} particles reached. Ignoring remaining {remaining} \
                     particles in the MCPL file",
                    config.limit
                );
            }
            break;
        }
    }

    if skipped > 0 {
        warn!(
            "Ignored {skipped} particles in the input MCPL file since their PDG codes \
             could not be converted to PHITS codes"
        );
    }
    writer.close()?;

    Ok(ConvertSummary {
        output: config.output.clone(),
        written,
        skipped,
    })
}

/// Load an auxiliary file and make sure it plausibly belongs to a dump run
fn load_metadata_file(path: &Path) -> Result<Vec<u8>> {
    let buffer = metadata::load_text_file(path)?;
    if !metadata::contains_keyword(&buffer, METADATA_KEYWORD) {
        bail!(
            "File {} looks invalid as it does not contain the word \"{METADATA_KEYWORD}\"",
            path.display()
        );
    }
    Ok(buffer)
}

/// Terminal progress bar sized to the source particle count
fn progress_bar(enabled: bool, total: u64) -> Option<Bar> {
    if !enabled {
        return None;
    }
    BarBuilder::default().total(total as usize).build().ok()
}
