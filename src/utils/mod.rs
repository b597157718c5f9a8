pub mod table;
pub mod verbosity;

use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use std::fmt::Debug;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use zstd::stream::read::Decoder;

pub enum Decompress {
    Zst,
}

impl FromStr for Decompress {
    type Err = Report;
    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            "zst" => Ok(Decompress::Zst),
            _ext => Err(eyre!("Decompression for {_ext:?} is not implemented yet.")),
        }
    }
}

/// Returns the file extension of a path, without the leading `.`.
///
/// ## Examples
///
/// ```rust
/// use graft::utils::path_to_ext;
/// assert_eq!(path_to_ext(&"tree.json")?, "json");
/// assert_eq!(path_to_ext(&"out/tree.nwk")?, "nwk");
/// assert!(path_to_ext(&"tree").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn path_to_ext<P>(path: &P) -> Result<String, Report>
where
    P: AsRef<Path> + Debug,
{
    let ext = path
        .as_ref()
        .extension()
        .wrap_err_with(|| format!("Failed to get file extension: {path:?}"))?
        .to_str()
        .wrap_err_with(|| format!("Failed to convert file extension to str: {path:?}"))?;
    Ok(ext.to_string())
}

/// Reads a file into a [`String`], decompressing it first if the extension is known.
///
/// - `.zst` files are decompressed in memory with [zstd](https://facebook.github.io/zstd/).
/// - Any other file is read as plain text.
///
/// ## Examples
///
/// ```rust
/// use graft::utils::read_to_string;
/// use std::io::Write;
///
/// let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
/// write!(file, "{{}}")?;
/// assert_eq!(read_to_string(&file.path())?, "{}");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn read_to_string<P>(path: &P) -> Result<String, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = std::fs::File::open(path).wrap_err(format!("Failed to open: {path:?}"))?;

    let compression = path_to_ext(path).ok().and_then(|ext| Decompress::from_str(&ext).ok());
    let mut buffer = String::new();
    match compression {
        Some(Decompress::Zst) => {
            let mut decoder =
                Decoder::new(file).wrap_err(format!("Failed to decode: {path:?}"))?;
            decoder
                .read_to_string(&mut buffer)
                .wrap_err(format!("Failed to decompress: {path:?}"))?;
        }
        None => {
            let mut reader = std::io::BufReader::new(file);
            reader.read_to_string(&mut buffer).wrap_err(format!("Failed to read: {path:?}"))?;
        }
    }

    Ok(buffer)
}

/// Get delimiter based on file extension.
///
/// - `.tsv` => `\t`
/// - `.txt` => `\t`
/// - `.csv` => `,`
///
/// Note that `.txt` is assumed to be tab-delimited!
///
/// ```rust
/// use graft::utils::get_delimiter;
///
/// assert_eq!(get_delimiter(&"file.tsv")?, '\t');
/// assert_eq!(get_delimiter(&"file.csv")?, ',');
/// assert_eq!(get_delimiter(&"file.txt")?, '\t');
/// assert!(get_delimiter(&"file").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn get_delimiter<P>(path: &P) -> Result<char, Report>
where
    P: AsRef<Path> + Debug,
{
    // convert extension to the expected delimiter
    match path_to_ext(path)?.as_str() {
        "tsv" | "txt" => Ok('\t'),
        "csv" => Ok(','),
        _ext => {
            Err(eyre!("Unknown file extension: {_ext:?}").suggestion("Options: tsv, csv, or txt"))
        }
    }
}
