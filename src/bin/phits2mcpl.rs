//! Command line tool to convert PHITS dump files to MCPL
//!
//! Converts the Monte Carlo particles in a binary PHITS dump file (in a
//! suitable 10 or 13 column configuration) to the portable MCPL format.
//!
//! The output is gzipped by default, and the PHITS input deck and dump
//! summary text files can be embedded into the MCPL header so the particle
//! list carries its own provenance.
//!
//! # Usage
//!
//! ```text
//! Usage: phits2mcpl <dumpfile> [output] [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples,
//! default values, examples, and any important behaviour.
//!
//! ## Options
//!
//! By default particles are written to `output.mcpl` and gzipped.
//!
//! ```bash
//! # Convert a dump file with default settings
//! phits2mcpl dump_data.dmp
//! ```
//!
//! ### Keep full precision
//!
//! MCPL stores floating point values as f32 unless told otherwise.
//!
//! ```bash
//! # Store everything as f64 at the cost of file size
//! phits2mcpl dump_data.dmp --double
//! ```
//!
//! ### Embed the run configuration
//!
//! The input deck and summary files are checked for plausibility (they must
//! be text and mention the word "dump") before being embedded.
//!
//! ```bash
//! # Attach the input deck and dump summary to the header
//! phits2mcpl dump_data.dmp -c phits.inp -s dump_summary.out
//! ```
//!

// standard libraries
use std::path::PathBuf;

// crate modules
use phitsmcpl::convert::{phits_to_mcpl, PhitsToMcplConfig};
use phitsmcpl::utils::f;

// external crates
use anyhow::Result;
use clap::Parser;
use log::*;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make 'Info' the default)
    let verbosity = cli.verbose as usize + 2;
    logging_init(verbosity, cli.quiet);

    info!("Reading {}", cli.dumpfile.display());
    let config = PhitsToMcplConfig {
        input: cli.dumpfile,
        output: cli.output,
        double_precision: cli.double,
        gzip: !cli.nogzip,
        input_deck: cli.config,
        dump_summary: cli.summary,
        progress: !cli.quiet,
    };

    let summary = phits_to_mcpl(&config)?;
    if summary.skipped > 0 {
        warn!("Skipped {} particles with no PDG code", summary.skipped);
    }
    println!("{summary}");
    Ok(())
}

/// Convert a binary PHITS dump file to the MCPL format
///
/// Converts the Monte Carlo particles in the input dump file (binary PHITS
/// dump file format in suitable configuration) to MCPL format and stores in
/// the designated output file.
///
/// Both 10 column and 13 column (polarisation) dump files are supported,
/// with either 32-bit or 64-bit Fortran record markers. The layout is
/// detected automatically.
///
/// Examples
/// --------
///
///  Typical use
///     $ phits2mcpl dump_data.dmp
///
///  Choose an output name and keep it uncompressed
///     $ phits2mcpl dump_data.dmp particles.mcpl --nogzip
///
///  Embed the files that produced the dump
///     $ phits2mcpl dump_data.dmp -c phits.inp -s dump_summary.out
///
/// Notes
/// -----
///
/// Particles with a PHITS kf-code that has no PDG counterpart are skipped
/// with a warning and a running count. They are never guessed at.
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help(
        "Typical use: phits2mcpl dump_data.dmp\n\nNOTE: --help shows more detail and examples"
    ),
    term_width(70),
    hide_possible_values(true),
    override_usage("phits2mcpl <dumpfile> [output] [options]")
)]
struct Cli {
    // * Positional
    /// Path to binary PHITS dump file
    #[arg(name = "dumpfile")]
    dumpfile: PathBuf,

    /// Path of the MCPL file to create
    #[arg(name = "output")]
    #[arg(default_value = "output.mcpl")]
    output: PathBuf,

    /// Enable double-precision storage of floating point values
    #[arg(help_heading("Conversion options"))]
    #[arg(short, long)]
    double: bool,

    /// Do not gzip the output file
    #[arg(help_heading("Conversion options"))]
    #[arg(short, long)]
    nogzip: bool,

    /// Embed the configuration FILE (the input deck) used to produce
    /// the dumpfile in the MCPL header
    #[arg(help_heading("Conversion options"))]
    #[arg(short, long)]
    #[arg(value_name = "FILE")]
    config: Option<PathBuf>,

    /// Embed the dump summary text file, which was produced along with
    /// the dumpfile itself, in the MCPL header
    #[arg(help_heading("Conversion options"))]
    #[arg(short, long)]
    #[arg(value_name = "FILE")]
    summary: Option<PathBuf>,

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
    s += &f!("{:^70}\n", "Phitsmcpl :: PHITS -> MCPL");
    s += &f!("{:-<1$}", "", 70);
    s
}
