//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::run::PlaceArgs;
use crate::Verbosity;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function. This is achieved with the `parse` function, which parses the command line arguments from [`std::env::args`](https://doc.rust-lang.org/std/env/fn.args.html).
/// ```no_run
/// use clap::Parser;
/// let args = graft::Cli::parse();
/// ```
/// The command-line arguments from `std::env::args` are simply a vector of space separated strings. Here is a manual example of setting the command-line input:
/// ```rust
/// use clap::Parser;
/// use graft::cli::Command;
///
/// let input = ["graft", "place", "--tree", "tree.json", "--samples", "nextclade.json", "--reference", "reference.fasta", "--output", "placed.json", "-v", "debug"];
/// let args = graft::Cli::parse_from(input);
/// let Command::Place(place_args) = &args.command;
/// assert_eq!(place_args.output, std::path::PathBuf::from("placed.json"));
/// assert_eq!(args.verbosity, graft::Verbosity::Debug);
/// serde_json::to_string_pretty(&args)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
/// With the following pretty JSON representation:
/// ```json
/// {
///   "command": {
///     "Place": {
///       "tree": "tree.json",
///       "samples": "nextclade.json",
///       "reference": "reference.fasta",
///       "output": "placed.json",
///       "summary": null
///     }
///   },
///   "verbosity": "Debug"
/// }
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "graft", author, version)]
#[clap(about = "graft places new samples onto a reference phylogeny by their nucleotide substitutions.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the [place](crate::run::place) method.
    ///
    /// ```rust
    /// use graft::cli::Command;
    /// use graft::run::PlaceArgs;
    ///
    /// let command = Command::Place(PlaceArgs::default());
    /// match command {
    ///   Command::Place(args) => assert!(args.summary.is_none()),
    /// }
    /// ```
    #[clap(about = "Place samples onto a tree.")]
    Place(PlaceArgs),
}
