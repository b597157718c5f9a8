//! Nucleotide [substitutions](Substitution), query [samples](Sample), and the [reference](Reference) genome.

use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use noodles::fasta;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::default::Default;
use std::fmt::Debug;
use std::path::Path;
use std::str::FromStr;

/// Genome coordinate (0-based) to nucleotide, relative to the [`Reference`].
pub type MutationMap = BTreeMap<usize, char>;

// ----------------------------------------------------------------------------
// Substitution
// ----------------------------------------------------------------------------

/// A nucleotide [`Substitution`] from the `reference` base to the `alt` base.
///
/// Coordinates are stored 0-based and written 1-based, so `A1C` is the first base of the genome.
///
/// ## Examples
///
/// ```rust
/// use graft::sequence::Substitution;
///
/// let sub: Substitution = "C241T".parse()?;
/// assert_eq!(sub, Substitution { coord: 240, reference: 'C', alt: 'T' });
/// assert_eq!(sub.to_string(), "C241T");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Copy, Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Substitution {
    /// 0-based genome coordinate.
    #[serde(rename = "pos")]
    pub coord: usize,
    /// Ancestral base.
    #[serde(rename = "refNuc")]
    pub reference: char,
    /// Derived base.
    #[serde(rename = "queryNuc")]
    pub alt: char,
}

impl std::fmt::Display for Substitution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}{}", self.reference, self.coord + 1, self.alt)
    }
}

impl FromStr for Substitution {
    type Err = Report;

    /// Parse a [`Substitution`] from `<ancestral><1-based position><derived>` text.
    ///
    /// ```rust
    /// use graft::sequence::Substitution;
    ///
    /// assert!("".parse::<Substitution>().is_err());
    /// assert!("CT".parse::<Substitution>().is_err());
    /// assert!("C0T".parse::<Substitution>().is_err());
    /// assert!("C12xT".parse::<Substitution>().is_err());
    /// assert!("12T".parse::<Substitution>().is_err());
    /// assert_eq!("N5-".parse::<Substitution>()?.to_string(), "N5-");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_str(text: &str) -> Result<Self, Report> {
        let suggestion = "Mutations are formatted as <ancestral><position><derived>, ex. C241T";

        let mut chars = text.chars();
        let (reference, alt) = match (chars.next(), chars.next_back()) {
            (Some(reference), Some(alt)) => (reference, alt),
            _ => Err(eyre!("Mutation cannot be parsed: {text:?}").suggestion(suggestion))?,
        };
        let coord = chars.as_str();

        if reference.is_ascii_digit()
            || alt.is_ascii_digit()
            || coord.is_empty()
            || !coord.chars().all(|c| c.is_ascii_digit())
        {
            Err(eyre!("Mutation cannot be parsed: {text:?}").suggestion(suggestion))?
        }

        let coord: usize = coord
            .parse()
            .wrap_err_with(|| eyre!("Mutation position cannot be parsed: {text:?}"))?;
        if coord == 0 {
            Err(eyre!("Mutation cannot be parsed: {text:?}").suggestion("Positions are 1-based."))?
        }

        Ok(Substitution { coord: coord - 1, reference, alt })
    }
}

impl Ord for Substitution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coord.cmp(&other.coord)
    }
}

impl PartialOrd for Substitution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ----------------------------------------------------------------------------
// Sample
// ----------------------------------------------------------------------------

/// A query [`Sample`] produced by upstream sequence analysis.
///
/// Records use the field names of the analysis output, unknown fields are ignored.
///
/// ```rust
/// use graft::sequence::{Sample, Substitution};
///
/// let json = r#"{
///   "seqName": "sample_1",
///   "clade": "20A",
///   "QCStatus": "good",
///   "mutations": [{ "refNuc": "C", "pos": 240, "queryNuc": "T" }],
///   "totalMutations": 1
/// }"#;
/// let sample: Sample = serde_json::from_str(json)?;
/// assert_eq!(sample.mutations, [Substitution { coord: 240, reference: 'C', alt: 'T' }]);
/// assert!(sample.is_placeable());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Sample {
    #[serde(rename = "seqName")]
    pub name: String,
    #[serde(default)]
    pub clade: String,
    #[serde(rename = "QCStatus", default)]
    pub qc_status: String,
    /// Substitutions relative to the [`Reference`].
    #[serde(default)]
    pub mutations: Vec<Substitution>,
    /// Upstream analysis errors, a sample with any errors is never placed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Sample records are either a bare list, or nested under `results`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SampleFile {
    List(Vec<Sample>),
    Results { results: Vec<Sample> },
}

impl Sample {
    /// Returns a new [`Sample`] with no mutations or errors.
    pub fn new(name: &str) -> Self {
        Sample { name: name.to_string(), ..Default::default() }
    }

    /// Returns the base of the sample at every coordinate it lists a substitution for.
    ///
    /// A coordinate listed more than once keeps its last base.
    ///
    /// ```rust
    /// use graft::sequence::{MutationMap, Sample};
    ///
    /// let sample = Sample { mutations: vec!["G3T".parse()?, "A1C".parse()?, "A1G".parse()?], ..Sample::new("s1") };
    /// assert_eq!(sample.genotype(), MutationMap::from([(0, 'G'), (2, 'T')]));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn genotype(&self) -> MutationMap {
        self.mutations.iter().map(|sub| (sub.coord, sub.alt)).collect()
    }

    /// Returns true if the sample has no upstream errors.
    pub fn is_placeable(&self) -> bool {
        self.errors.is_empty()
    }

    /// Read all [`Sample`] records from a JSON file (optionally `.zst` compressed).
    ///
    /// ```rust
    /// use graft::sequence::Sample;
    /// use std::io::Write;
    ///
    /// let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    /// write!(file, r#"{{"results": [{{"seqName": "s1"}}, {{"seqName": "s2", "errors": ["bad"]}}]}}"#)?;
    /// let samples = Sample::read_all(&file.path())?;
    /// assert_eq!(samples.len(), 2);
    /// assert!(!samples[1].is_placeable());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read_all<P>(path: &P) -> Result<Vec<Sample>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let text = utils::read_to_string(path)?;
        let samples = match serde_json::from_str::<SampleFile>(&text)
            .wrap_err_with(|| eyre!("Failed to parse sample records: {path:?}"))
            .suggestion("Expected a JSON list of records, or an object with a 'results' list.")?
        {
            SampleFile::List(samples) => samples,
            SampleFile::Results { results } => results,
        };
        Ok(samples)
    }
}

// ----------------------------------------------------------------------------
// Reference
// ----------------------------------------------------------------------------

/// The [`Reference`] genome that all substitutions are relative to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reference {
    pub id: String,
    pub sequence: Vec<char>,
}

impl FromStr for Reference {
    type Err = Report;

    /// Returns an in-memory [`Reference`] from a sequence of bases, kept in the case given.
    ///
    /// ```rust
    /// use graft::sequence::Reference;
    /// let reference: Reference = "ACGT".parse()?;
    /// assert_eq!(reference.base(0), Some('A'));
    /// assert_eq!(reference.base(3), Some('T'));
    /// assert_eq!(reference.base(4), None);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_str(sequence: &str) -> Result<Self, Report> {
        let sequence = sequence.trim().chars().collect_vec();
        if sequence.is_empty() {
            Err(eyre!("Reference sequence is empty."))?
        }
        Ok(Reference { id: String::from("reference"), sequence })
    }
}

impl Reference {
    /// Returns the base at a 0-based coordinate, or [`None`] if it is past the end of the sequence.
    pub fn base(&self, coord: usize) -> Option<char> {
        self.sequence.get(coord).copied()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Read the first record of a FASTA file (optionally `.zst` compressed) as the [`Reference`].
    ///
    /// Bases are kept in the case of the file, soft-masked (lowercase) regions included.
    ///
    /// ```rust
    /// use graft::sequence::Reference;
    /// use std::io::Write;
    ///
    /// let mut file = tempfile::Builder::new().suffix(".fasta").tempfile()?;
    /// writeln!(file, ">MN908947.3\nACGT\nacgt\n>other\nTTTT")?;
    /// let reference = Reference::read(&file.path())?;
    /// assert_eq!(reference.id, "MN908947.3");
    /// assert_eq!(reference.len(), 8);
    /// assert_eq!(reference.base(3), Some('T'));
    /// assert_eq!(reference.base(4), Some('a'));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(path: &P) -> Result<Reference, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let text = utils::read_to_string(path)?;
        let mut reader = fasta::Reader::new(text.as_bytes());

        // parse just the first record from the reference
        // 1. raise error if record iterator doesn't work
        // 2. raise error if first record is not proper fasta format.
        let record = reader
            .records()
            .next()
            .ok_or_else(|| eyre!("Unable to read reference records: {path:?}"))?
            .wrap_err_with(|| eyre!("Unable to read first fasta record: {path:?}"))?;

        let sequence = record.sequence().as_ref().iter().map(|b| *b as char).collect_vec();
        if sequence.is_empty() {
            Err(eyre!("Reference sequence is empty: {path:?}"))?
        }

        Ok(Reference { id: record.name().to_string(), sequence })
    }
}
