//! Command line tool to inspect MCPL files
//!
//! Very simple reader for MCPL particle lists, skipping the need to write a
//! script just to check what a file contains. Works on plain and gzipped
//! files alike.
//!
//! # Usage
//!
//! ```text
//! Usage: mcpltool <file> [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples,
//! default values, examples, and any important behaviour.
//!
//! ## Options
//!
//! By default a summary of the header and the first 10 particles are
//! printed.
//!
//! ```bash
//! # Print a summary of the header and leading particles
//! mcpltool particles.mcpl.gz
//! ```
//!
//! ### Show more (or fewer) particles
//!
//! ```bash
//! # List the first 50 particles
//! mcpltool particles.mcpl --limit 50
//! ```
//!
//! ### Convert the header to a JSON file
//!
//! For lovers of python and other languages there is a JSON output option
//! because it takes about 5 seconds for me to implement.
//!
//! ```bash
//! # Output a file named 'mcpl_header.json'
//! mcpltool particles.mcpl --json
//! ```
//!
//! ### Extract an embedded blob
//!
//! Anything embedded in the header (e.g. a PHITS input deck) can be
//! recovered byte-for-byte.
//!
//! ```bash
//! # Write the input deck to stdout
//! mcpltool particles.mcpl --blob phits_input_deck
//! ```
//!

// standard libraries
use std::fs::File;
use std::io::{BufWriter, Write};

// crate modules
use phitsmcpl::utils::f;
use phitsmcpl::McplReader;

// external crates
use anyhow::{anyhow, Result};
use clap::Parser;
use itertools::Itertools;
use log::*;
use serde::Serialize;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make 'Info' the default)
    let verbosity = cli.verbose as usize + 2;
    logging_init(verbosity, cli.quiet);

    info!("Reading {}", &cli.file);
    let mut reader = McplReader::open(&cli.file)?;

    // blob extraction mode writes raw bytes and nothing else
    if let Some(key) = &cli.blob {
        let blob = reader
            .blob(key)
            .ok_or_else(|| anyhow!("No blob with key \"{key}\" in {}", cli.file))?;
        std::io::stdout().write_all(&blob.data)?;
        return Ok(());
    }

    // Log a summary of the header to the terminal for reference
    if !cli.quiet {
        print_summary(&reader);
        print_particles(&mut reader, cli.limit)?;
    }

    if cli.json {
        write_json(&reader, &cli)?;
    }

    Ok(())
}

/// Inspect MCPL particle list files
///
/// Very simple reader for MCPL files, skipping the need to write a script
/// just to check simple properties. Handles gzipped files transparently.
///
/// Prints the header summary and leading particle records, and can extract
/// anything embedded in the header.
///
/// Examples
/// --------
///
///  Print a summary and the first 10 particles
///     $ mcpltool particles.mcpl.gz
///
///  List the first 50 particles
///     $ mcpltool particles.mcpl --limit 50
///
///  Convert the header to JSON
///     $ mcpltool particles.mcpl --json
///
///  Recover an embedded file
///     $ mcpltool particles.mcpl --blob phits_input_deck > phits.inp
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help(
        "Typical use: mcpltool particles.mcpl\n\nNOTE: --help shows more detail and examples"
    ),
    term_width(70),
    hide_possible_values(true),
    override_usage("mcpltool <file> [options]")
)]
struct Cli {
    // * Positional
    /// Path to MCPL file, gzipped or not
    #[arg(name = "file")]
    file: String,

    /// Number of particles to list (10 default)
    #[arg(help_heading("Inspection options"))]
    #[arg(short, long)]
    #[arg(value_name = "number")]
    #[arg(default_value_t = 10)]
    limit: u64,

    /// Generate a JSON file of the header ('mcpl_header.json' default)
    #[arg(help_heading("Inspection options"))]
    #[arg(short, long)]
    json: bool,

    /// Write an embedded blob to stdout
    #[arg(help_heading("Inspection options"))]
    #[arg(short, long)]
    #[arg(value_name = "key")]
    blob: Option<String>,

    /// Name of output file (excl. extension)
    ///
    /// Defaults to `mcpl_header.json` for the JSON format.
    #[arg(help_heading("Inspection options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    output: Option<String>,

    // * Flags
    /// Verbose logging (-v, -vv)
    ///
    /// If specified, the default log level of INFO is increased to DEBUG (-v)
    /// or TRACE (-vv). Errors and Warnings are always logged unless in quiet
    /// (-q) mode.
    #[arg(short, long)]
    #[arg(action = clap::ArgAction::Count)]
    verbose: u8,

    /// Supress all log output (overrules --verbose)
    #[arg(short, long)]
    quiet: bool,
}

/// Serialisable view of the header for the JSON output
#[doc(hidden)]
#[derive(Serialize)]
struct HeaderSummary {
    source_name: String,
    nparticles: u64,
    polarisation: bool,
    double_precision: bool,
    bytes_per_particle: usize,
    comments: Vec<String>,
    blobs: Vec<BlobSummary>,
}

#[doc(hidden)]
#[derive(Serialize)]
struct BlobSummary {
    key: String,
    bytes: usize,
}

impl From<&McplReader> for HeaderSummary {
    fn from(reader: &McplReader) -> Self {
        let header = reader.header();
        Self {
            source_name: header.source_name.clone(),
            nparticles: header.nparticles,
            polarisation: header.polarisation,
            double_precision: header.double_precision,
            bytes_per_particle: header.particle_bytes(),
            comments: header.comments.clone(),
            blobs: header
                .blobs
                .iter()
                .map(|blob| BlobSummary {
                    key: blob.key.clone(),
                    bytes: blob.data.len(),
                })
                .collect(),
        }
    }
}

/// Sets up logging at runtime to allow for multiple verbosity levels
#[doc(hidden)]
fn logging_init(verbosity: usize, quiet: bool) {
    stderrlog::new()
        .modules(vec![module_path!(), "phitsmcpl"])
        .quiet(quiet)
        .verbosity(verbosity)
        .show_level(false)
        .color(stderrlog::ColorChoice::Never)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .unwrap();
}

/// Creates a banner fot the command line
#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "Phitsmcpl :: MCPL Inspector");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
/// Write header summary to the terminal
fn print_summary(reader: &McplReader) {
    let header = reader.header();
    let mut s = "Summary of MCPL header\n".to_string();
    s += &f!("source     : \"{}\"\n", header.source_name);
    s += &f!("particles  : {}\n", header.nparticles);
    s += &f!(
        "storage    : {} bytes/particle ({}, polarisation {})\n",
        header.particle_bytes(),
        if header.double_precision { "f64" } else { "f32" },
        if header.polarisation { "on" } else { "off" }
    );

    s += &f!("comments   : {}\n", header.comments.len());
    for comment in &header.comments {
        s += &textwrap::indent(&textwrap::fill(comment, 66), "    ");
        s += "\n";
    }

    s += &f!("blobs      : {}", header.blobs.len());
    if !header.blobs.is_empty() {
        let keys = header
            .blobs
            .iter()
            .map(|blob| f!("\"{}\" ({} bytes)", blob.key, blob.data.len()))
            .join(", ");
        s += &f!(" -> {keys}");
    }
    println!("{s}")
}

#[doc(hidden)]
/// List the leading particle records as a table
fn print_particles(reader: &mut McplReader, limit: u64) -> Result<()> {
    if limit == 0 {
        return Ok(());
    }
    println!(
        "\n{:>7} {:>11} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "index", "pdgcode", "ekin[MeV]", "x[cm]", "y[cm]", "z[cm]", "u", "v", "w", "t[ms]"
    );
    let mut index = 0u64;
    while let Some(particle) = reader.load()? {
        println!("{index:>7} {particle}");
        index += 1;
        if index == limit {
            break;
        }
    }
    Ok(())
}

#[doc(hidden)]
/// Write header summary to json
fn write_json(reader: &McplReader, cli: &Cli) -> Result<()> {
    let output = match &cli.output {
        Some(o) => f!("{o}.json"),
        None => "mcpl_header.json".to_string(),
    };

    debug!("Writing JSON format to {}", output);
    let file: File = File::create(&output)?;
    let writer = BufWriter::new(file);
    Ok(serde_json::to_writer_pretty(writer, &HeaderSummary::from(reader))?)
}
