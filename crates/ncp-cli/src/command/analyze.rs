use std::{fs, path::PathBuf};

use anyhow::Context as _;
use ncp_analysis::orchestrator::{AnalysisConfig, perform_analysis};
use ncp_profile::config::TableConfig;
use serde::Deserialize;

use crate::util::{self, Output};

const SUMMARY_FILE: &str = "summary_results.json";
const REPORT_FILE: &str = "analysis_report.json";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    /// Profile tables (JSON), concatenated in the given order
    #[arg(long, required = true)]
    profiles: Vec<PathBuf>,
    /// Job configuration (JSON) with `table` and `analysis` sections
    #[arg(long)]
    config: PathBuf,
    /// Directory the result tables are written to
    #[arg(long)]
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct AnalyzeJob {
    #[serde(default)]
    table: TableConfig,
    analysis: AnalysisConfig,
}

pub(crate) fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let AnalyzeArg {
        profiles,
        config,
        output_dir,
    } = arg;

    let job = util::read_json_file::<AnalyzeJob, _>("analysis config", config)?;
    let table = util::load_profiles(profiles, &job.table)?;
    let report = perform_analysis(&table, &job.analysis).context("Analysis failed")?;

    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;
    for category in &report.categories {
        let path = output_dir.join(category.test_results_file());
        Output::save_json(&category.tests, Some(path))?;
    }
    Output::save_json(&report.summary(), Some(output_dir.join(SUMMARY_FILE)))?;
    Output::save_json(&report, Some(output_dir.join(REPORT_FILE)))?;

    for row in report.summary() {
        tracing::info!(
            category = %row.category,
            accuracy = row.accuracy_mean,
            significant = row.num_significant_features,
            "category done"
        );
    }
    Ok(())
}
