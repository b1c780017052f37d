//! Pair enumeration over categorical metadata.
//!
//! A [`Matcher`] finds every unordered pair of rows that agree on a set of
//! `sameby` columns and disagree on every one of a set of `diffby` columns.
//! Positive pairs (e.g. replicates of the same line) and negative pairs
//! (e.g. different lines on the same plate) are both expressed this way.
//!
//! Metadata values are encoded once into integer codes whose order follows
//! the sorted order of the text values, so pair groups come out in ascending
//! key order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ncp_profile::Metadata;

use crate::{MapError, Pair};

/// Categorical codes of one metadata column; `None` is a missing value.
#[derive(Debug, Clone)]
struct EncodedColumn {
    codes: Vec<Option<usize>>,
    labels: Vec<String>,
}

impl EncodedColumn {
    fn encode(values: &[Option<String>]) -> Self {
        let labels = values
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let lookup = labels
            .iter()
            .enumerate()
            .map(|(code, label)| (label.as_str(), code))
            .collect::<HashMap<_, _>>();
        let codes = values
            .iter()
            .map(|v| v.as_deref().and_then(|label| lookup.get(label).copied()))
            .collect();
        Self { codes, labels }
    }
}

/// Pairs grouped by the values of the `sameby` columns.
///
/// With no `sameby` columns every pair falls into the single group keyed by
/// the empty vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSet {
    groups: BTreeMap<Vec<String>, Vec<Pair>>,
}

impl PairSet {
    #[must_use]
    pub fn groups(&self) -> &BTreeMap<Vec<String>, Vec<Pair>> {
        &self.groups
    }

    #[must_use]
    pub fn get(&self, key: &[String]) -> Option<&[Pair]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Total number of pairs over all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All pairs in group key order, then in `(i, j)` order within a group.
    #[must_use]
    pub fn flatten(&self) -> Vec<Pair> {
        self.groups.values().flatten().copied().collect()
    }
}

/// Pair finder over a fixed metadata table.
#[derive(Debug, Clone)]
pub struct Matcher {
    n_rows: usize,
    columns: HashMap<String, EncodedColumn>,
}

impl Matcher {
    /// Encodes every metadata column.
    #[must_use]
    pub fn new(metadata: &Metadata) -> Self {
        let columns = metadata
            .names()
            .iter()
            .filter_map(|name| {
                let values = metadata.column(name)?;
                Some((name.clone(), EncodedColumn::encode(values)))
            })
            .collect();
        Self {
            n_rows: metadata.len(),
            columns,
        }
    }

    fn column(&self, name: &str) -> Result<&EncodedColumn, MapError> {
        self.columns.get(name).ok_or_else(|| MapError::UnknownColumn {
            column: name.to_owned(),
            operation: "pair matching",
        })
    }

    /// Finds all pairs `(i, j)`, `i < j`, that share every `sameby` value and
    /// differ on every `diffby` column.
    ///
    /// Rows missing a `sameby` value belong to no group. On `diffby` columns
    /// two missing values count as equal, so such pairs are not returned.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownColumn`] if a named column does not exist.
    pub fn get_all_pairs<S>(&self, sameby: &[S], diffby: &[S]) -> Result<PairSet, MapError>
    where
        S: AsRef<str>,
    {
        let same = sameby
            .iter()
            .map(|c| self.column(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let diff = diffby
            .iter()
            .map(|c| self.column(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut members: BTreeMap<Vec<usize>, Vec<usize>> = BTreeMap::new();
        for row in 0..self.n_rows {
            let key = same
                .iter()
                .map(|column| column.codes[row])
                .collect::<Option<Vec<_>>>();
            if let Some(key) = key {
                members.entry(key).or_default().push(row);
            }
        }

        let differs = |i: usize, j: usize| {
            diff.iter().all(|column| column.codes[i] != column.codes[j])
        };

        let mut groups = BTreeMap::new();
        for (key, rows) in members {
            let mut pairs = vec![];
            for (a, &i) in rows.iter().enumerate() {
                for &j in &rows[a + 1..] {
                    if differs(i, j) {
                        pairs.push((i, j));
                    }
                }
            }
            if pairs.is_empty() {
                continue;
            }
            let labels = key
                .iter()
                .zip(&same)
                .map(|(&code, column)| column.labels[code].clone())
                .collect();
            groups.insert(labels, pairs);
        }

        Ok(PairSet { groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(columns: &[(&str, &[Option<&str>])]) -> Metadata {
        Metadata::new(columns.iter().map(|(name, values)| {
            (
                (*name).to_owned(),
                values.iter().map(|v| v.map(str::to_owned)).collect(),
            )
        }))
        .unwrap()
    }

    fn lines_and_plates() -> Metadata {
        metadata(&[
            (
                "line",
                &[Some("A"), Some("A"), Some("B"), Some("B"), Some("C")],
            ),
            (
                "plate",
                &[Some("P1"), Some("P2"), Some("P1"), Some("P2"), Some("P1")],
            ),
        ])
    }

    #[test]
    fn test_positive_pairs_share_line_and_differ_in_plate() {
        let matcher = Matcher::new(&lines_and_plates());
        let pairs = matcher.get_all_pairs(&["line"], &["plate"]).unwrap();
        assert_eq!(pairs.get(&["A".to_owned()]), Some(&[(0, 1)][..]));
        assert_eq!(pairs.get(&["B".to_owned()]), Some(&[(2, 3)][..]));
        // a single-member group yields no pairs
        assert_eq!(pairs.get(&["C".to_owned()]), None);
        assert_eq!(pairs.flatten(), [(0, 1), (2, 3)]);
    }

    #[test]
    fn test_negative_pairs_share_plate_and_differ_in_line() {
        let matcher = Matcher::new(&lines_and_plates());
        let pairs = matcher.get_all_pairs(&["plate"], &["line"]).unwrap();
        assert_eq!(
            pairs.get(&["P1".to_owned()]),
            Some(&[(0, 2), (0, 4), (2, 4)][..])
        );
        assert_eq!(pairs.get(&["P2".to_owned()]), Some(&[(1, 3)][..]));
        let line = &matcher.columns["line"].codes;
        let plate = &matcher.columns["plate"].codes;
        for &(i, j) in &pairs.flatten() {
            assert!(i < j);
            assert_eq!(plate[i], plate[j]);
            assert_ne!(line[i], line[j]);
        }
    }

    #[test]
    fn test_empty_sameby_is_single_group() {
        let matcher = Matcher::new(&lines_and_plates());
        let pairs = matcher.get_all_pairs::<&str>(&[], &["line"]).unwrap();
        assert_eq!(pairs.groups().len(), 1);
        // 10 pairs of 5 rows minus the 2 same-line pairs
        assert_eq!(pairs.len(), 8);
    }

    #[test]
    fn test_empty_diffby_returns_all_group_pairs() {
        let matcher = Matcher::new(&lines_and_plates());
        let pairs = matcher.get_all_pairs::<&str>(&["plate"], &[]).unwrap();
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn test_missing_values() {
        let metadata = metadata(&[
            ("line", &[Some("A"), Some("A"), None, None]),
            ("plate", &[None, None, Some("P1"), Some("P2")]),
        ]);
        let matcher = Matcher::new(&metadata);
        // rows without a line belong to no group; same-line rows share a missing plate
        let pairs = matcher.get_all_pairs(&["line"], &["plate"]).unwrap();
        assert!(pairs.is_empty());
        let pairs = matcher.get_all_pairs::<&str>(&[], &["plate"]).unwrap();
        assert_eq!(pairs.flatten(), [(0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_group_keys_sorted() {
        let metadata = metadata(&[("line", &[Some("z"), Some("a"), Some("z"), Some("a")])]);
        let matcher = Matcher::new(&metadata);
        let pairs = matcher.get_all_pairs::<&str>(&["line"], &[]).unwrap();
        let keys = pairs.groups().keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, [vec!["a".to_owned()], vec!["z".to_owned()]]);
        assert_eq!(pairs.flatten(), [(1, 3), (0, 2)]);
    }

    #[test]
    fn test_unknown_column() {
        let matcher = Matcher::new(&lines_and_plates());
        assert_eq!(
            matcher.get_all_pairs(&["well"], &["plate"]),
            Err(MapError::UnknownColumn {
                column: "well".into(),
                operation: "pair matching",
            })
        );
    }
}
