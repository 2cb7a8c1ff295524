//! Command line tool to convert MCPL files to PHITS dump files
//!
//! Converts the Monte Carlo particles in an MCPL file (plain or gzipped) to
//! the binary PHITS dump format, ready to be read back into a PHITS run.
//!
//! # Usage
//!
//! ```text
//! Usage: mcpl2phits <input> [output] [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples,
//! default values, examples, and any important behaviour.
//!
//! ## Options
//!
//! By default 13-field records (including polarisation) are written to
//! `phits.dmp` with 32-bit Fortran record markers.
//!
//! ```bash
//! # Convert an MCPL file with default settings
//! mcpl2phits particles.mcpl.gz
//! ```
//!
//! ### Drop the polarisation columns
//!
//! Saves roughly a fifth of the file size if the data is not needed.
//!
//! ```bash
//! # Write 10-field records instead
//! mcpl2phits particles.mcpl --nopol
//! ```
//!
//! ### Limit the number of particles
//!
//! ```bash
//! # Stop after the first million particles
//! mcpl2phits particles.mcpl --limit 1000000
//! ```
//!

// standard libraries
use std::path::PathBuf;

// crate modules
use phitsmcpl::convert::{mcpl_to_phits, McplToPhitsConfig};
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

    info!("Reading {}", cli.input.display());
    let config = McplToPhitsConfig {
        input: cli.input,
        output: cli.output,
        marker_bytes: if cli.f64_markers { 8 } else { 4 },
        polarisation: !cli.nopol,
        limit: cli.limit,
        progress: !cli.quiet,
    };

    let summary = mcpl_to_phits(&config)?;
    if !cli.quiet {
        print_phits_hint(config.polarisation);
    }
    println!("{summary}");
    Ok(())
}

/// Convert an MCPL file to the binary PHITS dump format
///
/// Converts the Monte Carlo particles in the input MCPL file to binary
/// PHITS dump file format and stores the result in the designated output
/// file.
///
/// The file can be read in PHITS using a configuration of (assuming the
/// filename is "phits.dmp"):
///
///     dump = 13
///     1 2 3 4 5 6 7 8 9 10 14 15 16
///     file = phits.dmp
///
/// Examples
/// --------
///
///  Typical use
///     $ mcpl2phits particles.mcpl.gz
///
///  Without polarisation columns (dump = 10)
///     $ mcpl2phits particles.mcpl --nopol
///
///  With 64-bit Fortran record markers
///     $ mcpl2phits particles.mcpl --f64-markers
///
/// Notes
/// -----
///
/// Particles with a PDG code that has no PHITS kf counterpart are skipped
/// with a warning and a running count. They are never guessed at.
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help(
        "Typical use: mcpl2phits particles.mcpl\n\nNOTE: --help shows more detail and examples"
    ),
    term_width(70),
    hide_possible_values(true),
    override_usage("mcpl2phits <input> [output] [options]")
)]
struct Cli {
    // * Positional
    /// Path to MCPL file, gzipped or not
    #[arg(name = "input")]
    input: PathBuf,

    /// Path of the PHITS dump file to create
    #[arg(name = "output")]
    #[arg(default_value = "phits.dmp")]
    output: PathBuf,

    /// Do not write polarisation info
    ///
    /// Saves ~22% in file size. The PHITS configuration reading the file
    /// must then be `dump = 10` with columns `1 2 3 4 5 6 7 8 9 10`.
    #[arg(help_heading("Conversion options"))]
    #[arg(short, long)]
    nopol: bool,

    /// Write Fortran records with 64 bit integer markers
    ///
    /// Note that the default (32 bit) is almost always the correct choice.
    #[arg(help_heading("Conversion options"))]
    #[arg(short, long)]
    f64_markers: bool,

    /// Limit the number of particles transferred to the PHITS file
    ///
    /// Defaults to 0, meaning no limit.
    #[arg(help_heading("Conversion options"))]
    #[arg(short, long)]
    #[arg(value_name = "LIMIT")]
    #[arg(default_value_t = 0)]
    limit: u64,

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
    s += &f!("{:^70}\n", "Phitsmcpl :: MCPL -> PHITS");
    s += &f!("{:-<1$}", "", 70);
    s
}

/// Remind the user what the matching PHITS input section looks like
#[doc(hidden)]
fn print_phits_hint(polarisation: bool) {
    let mut s = "The file can be read in PHITS with:\n".to_string();
    if polarisation {
        s += "    dump = 13\n";
        s += "    1 2 3 4 5 6 7 8 9 10 14 15 16\n";
    } else {
        s += "    dump = 10\n";
        s += "    1 2 3 4 5 6 7 8 9 10\n";
    }
    s += "    file = <filename>";
    info!("{s}");
}
