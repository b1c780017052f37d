use clap::{Parser, Subcommand};

use self::{analyze::AnalyzeArg, map::MapArg};

mod analyze;
mod map;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Score how well each profile retrieves its replicates (mAP with p-values)
    Map(#[clap(flatten)] MapArg),
    /// Classify and test features per category
    Analyze(#[clap(flatten)] AnalyzeArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Map(arg) => map::run(&arg)?,
        Mode::Analyze(arg) => analyze::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_command_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_map() {
        let args = CommandArgs::try_parse_from([
            "ncp",
            "map",
            "--profiles",
            "a.json",
            "--profiles",
            "b.json",
            "--config",
            "map.json",
        ])
        .unwrap();
        let Mode::Map(arg) = args.mode else {
            panic!("expected map");
        };
        assert_eq!(arg.profiles.len(), 2);
        assert!(arg.output.is_none());
    }

    #[test]
    fn test_analyze_requires_output_dir() {
        assert!(
            CommandArgs::try_parse_from([
                "ncp",
                "analyze",
                "--profiles",
                "a.json",
                "--config",
                "analysis.json",
            ])
            .is_err()
        );
    }
}
