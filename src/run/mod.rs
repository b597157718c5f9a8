//! Run a [placement](crate::placement) from files on disk.


use crate::auspice::AuspiceTree;
use crate::placement::{locate_in_tree, Placement};
use crate::sequence::{Reference, Sample};
use crate::utils;
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use graft_phylo::ToNewick;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Place arguments.
#[derive(Clone, Debug, Default, Deserialize, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct PlaceArgs {
    /// Input tree, an Auspice v2 JSON document.
    #[clap(short = 't', long, required = true)]
    pub tree: PathBuf,

    /// Input sample records, a JSON list or an object with a 'results' list.
    #[clap(short = 's', long, required = true)]
    pub samples: PathBuf,

    /// Reference genome (FASTA), the first record is used.
    #[clap(short = 'r', long, required = true)]
    pub reference: PathBuf,

    /// Output tree.
    ///
    /// The format is chosen by the extension: json (Auspice), nwk (Newick), dot (graphviz).
    #[clap(short = 'o', long, required = true)]
    pub output: PathBuf,

    /// Output placement summary table (tsv or csv).
    #[clap(long)]
    pub summary: Option<PathBuf>,
}

/// Place all samples onto the tree and write the outputs.
///
/// ```rust
/// use graft::run::{place, PlaceArgs};
/// use std::fs::{read_to_string, write};
///
/// let dir = tempfile::tempdir()?;
/// let tree = r#"{"version": "v2", "meta": {}, "tree": {"name": "root"}}"#;
/// write(dir.path().join("tree.json"), tree)?;
/// write(dir.path().join("samples.json"), r#"[{"seqName": "s1", "mutations": [{"refNuc": "A", "pos": 0, "queryNuc": "C"}]}]"#)?;
/// write(dir.path().join("reference.fasta"), ">ref\nACGT\n")?;
///
/// let args = PlaceArgs {
///     tree: dir.path().join("tree.json"),
///     samples: dir.path().join("samples.json"),
///     reference: dir.path().join("reference.fasta"),
///     output: dir.path().join("placed.nwk"),
///     summary: Some(dir.path().join("summary.tsv")),
/// };
/// place(&args)?;
/// assert_eq!(read_to_string(dir.path().join("placed.nwk"))?, "(s1_clades:1)root;\n");
/// assert!(read_to_string(dir.path().join("summary.tsv"))?.contains("s1\tplaced\troot\t1\tA1C"));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn place(args: &PlaceArgs) -> Result<Placement, Report> {
    info!("Importing tree: {:?}", args.tree);
    let document = AuspiceTree::read(&args.tree)?;

    info!("Importing samples: {:?}", args.samples);
    let samples = Sample::read_all(&args.samples)?;

    info!("Importing reference: {:?}", args.reference);
    let reference = Reference::read(&args.reference)?;

    let placement = locate_in_tree(&samples, &document, &reference)?;

    info!("Exporting tree: {:?}", args.output);
    write_tree(&placement, &args.output)?;

    if let Some(path) = &args.summary {
        info!("Exporting summary: {path:?}");
        placement.summary.to_table()?.write(path)?;
    } else {
        info!("Placement summary:\n{}", placement.summary.to_table()?.to_markdown());
    }

    Ok(placement)
}

/// Write the placed tree, the format is chosen by the file extension.
fn write_tree<P>(placement: &Placement, path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let ext = utils::path_to_ext(path)?;
    match ext.as_str() {
        "json" => placement.tree.write(path)?,
        "nwk" | "newick" => write_text(&placement.phylogeny.to_newick()?, path)?,
        "dot" => write_text(&placement.phylogeny.to_dot()?, path)?,
        _ => Err(eyre!("Unknown tree output format: {ext:?}"))
            .suggestion("Please choose a format from: json, nwk, dot")?,
    }
    Ok(())
}

fn write_text<P>(text: &str, path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let mut file = File::create(path).wrap_err_with(|| format!("Unable to create file: {path:?}"))?;
    file.write_all(format!("{text}\n").as_bytes())
        .wrap_err_with(|| format!("Unable to write file: {path:?}"))?;
    Ok(())
}
