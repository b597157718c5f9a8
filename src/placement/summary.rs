use crate::sequence::Substitution;
use crate::utils::table::Table;
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whether a sample was attached to the tree.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, PartialEq, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Placed,
    /// The sample had upstream errors.
    Skipped,
}

/// The outcome of placing one sample.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PlacementRecord {
    pub sample: String,
    pub status: Status,
    /// Name of the node the sample was attached to.
    pub attached_to: Option<String>,
    /// Distance between the sample and the node it was attached to.
    pub distance: Option<usize>,
    /// Substitutions on the new leaf's branch, `;` separated in tables.
    pub private_substitutions: Vec<Substitution>,
}

impl PlacementRecord {
    pub fn skipped(sample: &str) -> Self {
        PlacementRecord { sample: sample.to_string(), status: Status::Skipped, ..Default::default() }
    }
}

/// One [`PlacementRecord`] per input sample, in input order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PlacementSummary {
    pub records: Vec<PlacementRecord>,
}

impl PlacementSummary {
    pub fn new() -> Self {
        PlacementSummary::default()
    }

    /// Returns the number of samples attached to the tree.
    pub fn placed(&self) -> usize {
        self.records.iter().filter(|r| r.status == Status::Placed).count()
    }

    /// Returns the number of samples skipped because of upstream errors.
    pub fn skipped(&self) -> usize {
        self.records.iter().filter(|r| r.status == Status::Skipped).count()
    }

    /// Convert the summary into a [`Table`], one row per sample.
    ///
    /// ```rust
    /// use graft::placement::{PlacementRecord, PlacementSummary, Status};
    ///
    /// let mut summary = PlacementSummary::new();
    /// summary.records.push(PlacementRecord {
    ///     sample: "s1".to_string(),
    ///     status: Status::Placed,
    ///     attached_to: Some("A".to_string()),
    ///     distance: Some(1),
    ///     private_substitutions: vec!["G3A".parse()?, "T4C".parse()?],
    /// });
    /// summary.records.push(PlacementRecord::skipped("s2"));
    ///
    /// let table = summary.to_table()?;
    /// assert_eq!(table.get("private_substitutions")?, [&"G3A;T4C", &""]);
    /// assert_eq!(table.get("status")?, [&"placed", &"skipped"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn to_table(&self) -> Result<Table<String>, Report> {
        let mut table = Table::new();
        table.headers = ["sample", "status", "attached_to", "distance", "private_substitutions"]
            .into_iter()
            .map(String::from)
            .collect();

        for record in &self.records {
            let row = vec![
                record.sample.clone(),
                record.status.to_string(),
                record.attached_to.clone().unwrap_or_default(),
                record.distance.map(|d| d.to_string()).unwrap_or_default(),
                record.private_substitutions.iter().join(";"),
            ];
            table.add_row(row)?;
        }

        Ok(table)
    }
}
