//! CLI command definitions and parsing
use crate::retrieval::SearchMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    version,
    about = "Ranked search and search-quality evaluation for a digitized book archive",
    long_about = "Folio runs a title query and a page-level query against the archive's search \
                  engine, fuses and rescores the two hit lists, and caps each category so one \
                  collection cannot crowd out the rest. A built-in evaluation suite scores the \
                  ranking with standard IR metrics and keeps a history of runs."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/folio/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the archive
    Search {
        /// Search query text
        query: String,

        /// Earliest publication year (needs --end-year)
        #[arg(long)]
        start_year: Option<i32>,

        /// Latest publication year (needs --start-year)
        #[arg(long)]
        end_year: Option<i32>,

        /// Which queries to run
        #[arg(short, long, default_value_t = SearchMode::Both)]
        mode: SearchMode,

        /// Do not cap results per category
        #[arg(long)]
        no_diversity: bool,

        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Record that a result was chosen for a query
    Like {
        /// Document id of the chosen result
        doc_id: String,

        /// Query the result was found with
        query: String,
    },

    /// Show the ranking for one query, scored against expected titles
    Analyze {
        /// Search query text
        query: String,

        /// Expected title (repeatable)
        #[arg(short, long = "expect", value_name = "TITLE")]
        expected: Vec<String>,

        /// Show the analysis in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run and track the search quality suite
    Eval {
        #[command(subcommand)]
        action: EvalAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum EvalAction {
    /// Run the suite; exit code reflects the quality grade
    Run {
        /// Do not append the run to the history
        #[arg(long)]
        no_save: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recorded runs
    History,

    /// Compare two recorded runs by index (0 = oldest)
    Compare {
        old: usize,
        new: usize,
    },

    /// Pass-rate and score movement between the last two runs
    Trend,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_search_flags() {
        let cli = Cli::parse_from([
            "folio",
            "search",
            "Палех",
            "--start-year",
            "1920",
            "--end-year",
            "1950",
            "--mode",
            "page",
            "--no-diversity",
        ]);
        match cli.command {
            Commands::Search {
                query,
                start_year,
                end_year,
                mode,
                no_diversity,
                ..
            } => {
                assert_eq!(query, "Палех");
                assert_eq!((start_year, end_year), (Some(1920), Some(1950)));
                assert_eq!(mode, SearchMode::Page);
                assert!(no_diversity);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_eval_compare_and_repeated_expect() {
        let cli = Cli::parse_from(["folio", "eval", "compare", "0", "3"]);
        assert!(matches!(
            cli.command,
            Commands::Eval {
                action: EvalAction::Compare { old: 0, new: 3 }
            }
        ));

        let cli = Cli::parse_from(["folio", "analyze", "метро", "--expect", "Метро", "--expect", "Метрополитен"]);
        match cli.command {
            Commands::Analyze { expected, .. } => assert_eq!(expected.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
