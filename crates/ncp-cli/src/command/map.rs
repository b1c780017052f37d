use std::path::PathBuf;

use anyhow::Context as _;
use ncp_map::pipeline::{MapConfig, run_pipeline};
use ncp_profile::config::TableConfig;
use serde::Deserialize;

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct MapArg {
    /// Profile tables (JSON), concatenated in the given order
    #[arg(long, required = true)]
    pub(crate) profiles: Vec<PathBuf>,
    /// Job configuration (JSON) with `table` and `map` sections
    #[arg(long)]
    config: PathBuf,
    /// Output file path; stdout if omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct MapJob {
    #[serde(default)]
    table: TableConfig,
    map: MapConfig,
}

pub(crate) fn run(arg: &MapArg) -> anyhow::Result<()> {
    let MapArg {
        profiles,
        config,
        output,
    } = arg;

    let job = util::read_json_file::<MapJob, _>("map config", config)?;
    let table = util::load_profiles(profiles, &job.table)?;
    let result = run_pipeline(&table, &job.map).context("Failed to compute mAP")?;

    let scored = result.scored().count();
    let significant = result
        .scored()
        .filter(|r| r.p_value.is_some_and(|p| p < job.map.threshold))
        .count();
    tracing::info!(
        queries = result.records.len(),
        scored,
        significant,
        "mAP computed"
    );

    Output::save_json(&result, output.clone())?;
    Ok(())
}
