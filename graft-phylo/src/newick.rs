//! Helpers for writing [Newick](https://en.wikipedia.org/wiki/Newick_format) strings.

use itertools::Itertools;

/// Characters that are not allowed in an unquoted Newick label.
const RESERVED: &[char] = &['(', ')', '[', ']', ':', ';', ',', '\''];

/// Returns a Newick-safe node label.
///
/// Labels containing whitespace or reserved characters are wrapped in single quotes,
/// with any inner single quote doubled.
///
/// ## Examples
///
/// ```rust
/// use graft_phylo::newick::quote_label;
/// assert_eq!(quote_label("B.1.1.7"), "B.1.1.7");
/// assert_eq!(quote_label("USA/CA-1/2020"), "USA/CA-1/2020");
/// assert_eq!(quote_label("sample 1"), "'sample 1'");
/// assert_eq!(quote_label("a:b"), "'a:b'");
/// assert_eq!(quote_label("it's"), "'it''s'");
/// ```
pub fn quote_label(label: &str) -> String {
    match label.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
        true => format!("'{}'", label.replace('\'', "''")),
        false => label.to_string(),
    }
}

/// Returns the Newick text of an internal node from its label and already formatted children.
///
/// ## Examples
///
/// ```rust
/// use graft_phylo::newick::join_clade;
/// let children = vec!["A:1".to_string(), "B:2".to_string()];
/// assert_eq!(join_clade(&children, "C"), "(A:1,B:2)C");
/// assert_eq!(join_clade(&[], "A"), "A");
/// ```
pub fn join_clade(children: &[String], label: &str) -> String {
    match children.is_empty() {
        true => label.to_string(),
        false => format!("({}){label}", children.iter().join(",")),
    }
}
