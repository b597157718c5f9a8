use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use std::cmp::PartialEq;
use std::default::Default;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A row-based [`Table`] of generic data.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T>
where
    T: PartialEq + ToString,
{
    /// Names of the table columns.
    pub headers: Vec<T>,
    /// Rows of table values.
    pub rows: Vec<Vec<T>>,
}

impl<T> Default for Table<T>
where
    T: PartialEq + ToString,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Table<T>
where
    T: PartialEq + ToString,
{
    /// Returns a new [`Table`] with empty headers and rows.
    ///
    /// ```rust
    /// let mut table = graft::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(vec!["A", "B", "C"])?;
    /// # assert_eq!(table.rows, vec![vec!["A", "B", "C"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new() -> Self {
        Table { headers: Vec::new(), rows: Vec::new() }
    }

    /// Add a new row to the table, which must have one value per header.
    ///
    /// ```rust
    /// let mut table = graft::Table::new();
    /// table.headers = vec!["1", "2"];
    /// assert!(table.add_row(vec!["A"]).is_err());
    /// ```
    pub fn add_row(&mut self, row: Vec<T>) -> Result<(), Report> {
        if row.len() != self.headers.len() {
            Err(eyre!(
                "Row has {} values but the table has {} headers.",
                row.len(),
                self.headers.len()
            ))?
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns the column index of `header`.
    pub fn header_position(&self, header: &str) -> Result<usize, Report> {
        self.headers
            .iter()
            .position(|h| h.to_string() == header)
            .ok_or_else(|| eyre!("Column '{header}' was not found in table."))
    }

    /// Returns all values of the column `header`.
    ///
    /// ```rust
    /// let mut table = graft::Table::new();
    /// table.headers = vec!["name", "status"];
    /// table.add_row(vec!["s1", "placed"])?;
    /// table.add_row(vec!["s2", "skipped"])?;
    /// assert_eq!(table.get("status")?, [&"placed", &"skipped"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get(&self, header: &str) -> Result<Vec<&T>, Report> {
        let header_i = self.header_position(header)?;
        Ok(self.rows.iter().map(|row| &row[header_i]).collect())
    }

    /// Write to a delimited file, the delimiter is chosen by the file extension.
    ///
    /// ```rust
    /// let mut table = graft::Table::new();
    /// table.headers = vec!["name", "status"];
    /// table.add_row(vec!["s1", "placed"])?;
    ///
    /// let file = tempfile::Builder::new().suffix(".tsv").tempfile()?;
    /// table.write(&file.path())?;
    /// assert_eq!(std::fs::read_to_string(file.path())?, "name\tstatus\ns1\tplaced\n");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        // Parse line delimiter from file extension
        let delim = utils::get_delimiter(path)?.to_string();

        let mut file =
            File::create(path).wrap_err_with(|| format!("Unable to create file: {path:?}"))?;

        // write headers
        let line = format!("{}\n", self.headers.iter().map(T::to_string).join(&delim));
        file.write_all(line.as_bytes())
            .wrap_err_with(|| format!("Unable to write table headers: {line}"))?;

        // write regular rows
        for row in &self.rows {
            let line = format!("{}\n", row.iter().map(T::to_string).join(&delim));
            file.write_all(line.as_bytes())
                .wrap_err_with(|| format!("Unable to write table rows: {line}"))?;
        }

        Ok(())
    }

    /// Convert table to markdown format
    ///
    /// ```rust
    /// let mut table = graft::Table::new();
    /// table.headers = vec!["name", "status"];
    /// table.add_row(vec!["s1", "placed"])?;
    /// let expected = "| name | status |\n|------|--------|\n|  s1  | placed |\n";
    /// assert_eq!(table.to_markdown(), expected);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn to_markdown(&self) -> String {
        // get the maximum width of each column, +2 to add space on either side
        let col_widths = self
            .headers
            .iter()
            .enumerate()
            .map(|(col_i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[col_i].to_string().len())
                    .chain([header.to_string().len()])
                    .max()
                    .unwrap_or_default()
                    + 2
            })
            .collect_vec();

        let mut markdown = String::from("|");
        // frame in between headers and rows
        let mut header_frame = String::from("|");

        // Create the header line
        for (header, col_width) in self.headers.iter().zip(col_widths.iter()) {
            let cell = format!("{:^width$}|", header.to_string(), width = col_width);
            markdown.push_str(&cell);

            let frame = format!("{}|", "-".repeat(*col_width));
            header_frame.push_str(&frame);
        }
        markdown.push('\n');
        markdown.push_str(&header_frame);
        markdown.push('\n');

        // Create the row lines
        for row in &self.rows {
            markdown.push('|');
            for (value, col_width) in row.iter().zip(col_widths.iter()) {
                let cell = format!("{:^width$}|", value.to_string(), width = col_width);
                markdown.push_str(&cell);
            }
            markdown.push('\n');
        }

        markdown
    }
}
