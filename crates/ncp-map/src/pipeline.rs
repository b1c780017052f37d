//! End-to-end mAP driver.
//!
//! [`run_pipeline`] chains the stages of this crate on a [`ProfileTable`]:
//! positive and negative pairs are matched on metadata, their similarities
//! ranked per query, every query scored with average precision and its
//! p-value read from the shared null distribution of its signature. The
//! scores are joined back onto the metadata rows, so every input row gets a
//! [`MapRecord`], scored or not.

use std::collections::BTreeMap;

use ncp_profile::ProfileTable;
use ncp_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

use crate::{
    MapError, Signature,
    average_precision::compute_ap,
    matcher::Matcher,
    null_model::{NullDistributionCache, compute_p_values_with},
    rank_list::build_rank_lists,
    similarity::{DEFAULT_BATCH_SIZE, pairwise_cosine},
};

/// Parameters of a mAP run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub pos_sameby: Vec<String>,
    #[serde(default)]
    pub pos_diffby: Vec<String>,
    #[serde(default)]
    pub neg_sameby: Vec<String>,
    pub neg_diffby: Vec<String>,
    #[serde(default = "default_null_size")]
    pub null_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub seed: u64,
    /// Metadata columns to summarize mean average precision by; empty means
    /// one summary over all queries.
    #[serde(default)]
    pub aggregate_by: Vec<String>,
    /// p-value below which a query counts as significant in summaries.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_null_size() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_threshold() -> f64 {
    0.05
}

impl MapConfig {
    /// Creates a configuration with default sampling parameters.
    #[must_use]
    pub fn new<S>(pos_sameby: &[S], pos_diffby: &[S], neg_sameby: &[S], neg_diffby: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        let owned = |columns: &[S]| columns.iter().map(|c| c.as_ref().to_owned()).collect();
        Self {
            pos_sameby: owned(pos_sameby),
            pos_diffby: owned(pos_diffby),
            neg_sameby: owned(neg_sameby),
            neg_diffby: owned(neg_diffby),
            null_size: default_null_size(),
            batch_size: default_batch_size(),
            seed: 0,
            aggregate_by: vec![],
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Scored,
    /// The row takes part in no positive or negative pair.
    NoPairs,
    /// The row has negatives but no positive to retrieve.
    NoPositives,
}

/// Score of one input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRecord {
    pub row: usize,
    /// Metadata of the row, kept under its own key so column names never
    /// clash with the score fields.
    pub metadata: BTreeMap<String, Option<String>>,
    pub average_precision: Option<f64>,
    pub p_value: Option<f64>,
    pub n_pos: usize,
    pub n_neg: usize,
    pub status: QueryStatus,
}

/// Number of queries sharing a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignatureCount {
    #[serde(flatten)]
    pub signature: Signature,
    pub queries: usize,
}

/// Mean average precision of the scored queries of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: BTreeMap<String, Option<String>>,
    pub n_queries: usize,
    pub mean_average_precision: f64,
    /// Fraction of the group's queries with a p-value below the threshold.
    pub fraction_significant: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapResult {
    pub records: Vec<MapRecord>,
    pub signatures: Vec<SignatureCount>,
    pub groups: Vec<GroupSummary>,
}

impl MapResult {
    /// Records of the queries that received a score.
    pub fn scored(&self) -> impl Iterator<Item = &MapRecord> + '_ {
        self.records
            .iter()
            .filter(|r| r.status == QueryStatus::Scored)
    }
}

/// Runs pair matching, ranking, scoring and significance testing on `table`.
///
/// # Errors
///
/// Fails if a configured column is missing, if `null_size` or `batch_size`
/// is zero, or if a profile taking part in a pair has a non-finite feature.
pub fn run_pipeline(table: &ProfileTable, config: &MapConfig) -> Result<MapResult, MapError> {
    let matcher = Matcher::new(&table.metadata);
    let cache = NullDistributionCache::new(config.null_size, config.seed)?;

    let pos_pairs = matcher
        .get_all_pairs(&config.pos_sameby, &config.pos_diffby)?
        .flatten();
    let neg_pairs = matcher
        .get_all_pairs(&config.neg_sameby, &config.neg_diffby)?
        .flatten();
    tracing::info!(
        positive = pos_pairs.len(),
        negative = neg_pairs.len(),
        "pairs matched"
    );

    let pos_sims = pairwise_cosine(&table.features, &pos_pairs, config.batch_size)?;
    let neg_sims = pairwise_cosine(&table.features, &neg_pairs, config.batch_size)?;
    tracing::info!(
        pairs = pos_sims.len() + neg_sims.len(),
        "similarities computed"
    );

    let rank_lists = build_rank_lists(&pos_pairs, &neg_pairs, &pos_sims, &neg_sims)?;
    let (ap_scores, signatures) = compute_ap(&rank_lists.relevance, &rank_lists.counts)?;
    tracing::info!(queries = rank_lists.len(), "average precision computed");

    let p_values = compute_p_values_with(&cache, &ap_scores, &signatures)?;
    tracing::info!(
        distributions = cache.generated(),
        "p-values computed"
    );

    let mut records = (0..table.len())
        .map(|row| MapRecord {
            row,
            metadata: table.metadata.row(row),
            average_precision: None,
            p_value: None,
            n_pos: 0,
            n_neg: 0,
            status: QueryStatus::NoPairs,
        })
        .collect::<Vec<_>>();
    for (k, &query) in rank_lists.queries.iter().enumerate() {
        let record = &mut records[query];
        record.n_pos = signatures[k].n_pos;
        record.n_neg = signatures[k].n_neg;
        record.average_precision = ap_scores[k];
        record.p_value = p_values[k];
        record.status = if ap_scores[k].is_some() {
            QueryStatus::Scored
        } else {
            QueryStatus::NoPositives
        };
    }

    let signatures = count_signatures(&records);
    let groups = summarize(&records, &config.aggregate_by, config.threshold, table)?;
    Ok(MapResult {
        records,
        signatures,
        groups,
    })
}

fn count_signatures(records: &[MapRecord]) -> Vec<SignatureCount> {
    let mut counts = BTreeMap::<Signature, usize>::new();
    for record in records.iter().filter(|r| r.status == QueryStatus::Scored) {
        *counts
            .entry(Signature::new(record.n_pos, record.n_neg))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(signature, queries)| SignatureCount { signature, queries })
        .collect()
}

fn summarize(
    records: &[MapRecord],
    aggregate_by: &[String],
    threshold: f64,
    table: &ProfileTable,
) -> Result<Vec<GroupSummary>, MapError> {
    let columns = aggregate_by
        .iter()
        .map(|name| {
            table
                .metadata
                .column(name)
                .map(|values| (name, values))
                .ok_or_else(|| MapError::UnknownColumn {
                    column: name.clone(),
                    operation: "mAP aggregation",
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups = BTreeMap::<Vec<Option<&str>>, Vec<&MapRecord>>::new();
    for record in records.iter().filter(|r| r.status == QueryStatus::Scored) {
        let key = columns
            .iter()
            .map(|(_, values)| values[record.row].as_deref())
            .collect();
        groups.entry(key).or_default().push(record);
    }

    let summaries = groups
        .into_iter()
        .filter_map(|(key, members)| {
            let stats = DescriptiveStats::new(members.iter().filter_map(|r| r.average_precision))?;
            let significant = members
                .iter()
                .filter(|r| r.p_value.is_some_and(|p| p < threshold))
                .count();
            #[expect(clippy::cast_precision_loss)]
            let fraction_significant = significant as f64 / members.len() as f64;
            Some(GroupSummary {
                key: columns
                    .iter()
                    .zip(key)
                    .map(|((name, _), value)| ((*name).clone(), value.map(str::to_owned)))
                    .collect(),
                n_queries: members.len(),
                mean_average_precision: stats.mean,
                fraction_significant,
            })
        })
        .collect();
    Ok(summaries)
}
