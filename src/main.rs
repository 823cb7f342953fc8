use folio::cli::{Cli, Commands, ConfigAction, EvalAction};
use folio::config::Config;
use folio::error::{FolioError, Result};
use folio::evaluation::{analysis_report, summary_report};
use folio::history::{analyze_trends, comparison_report, history_report, HistoryStore};
use folio::service::{SearchParams, SearchResponse, SearchService};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            query,
            start_year,
            end_year,
            mode,
            no_diversity,
            limit,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            let params = SearchParams::new(query)
                .with_years(start_year, end_year)
                .with_mode(mode)
                .with_diversity(config.ranking.diversity && !no_diversity)
                .with_limit(limit);
            cmd_search(&config, &params, json)?;
        }
        Commands::Like { doc_id, query } => {
            let config = load_config(cli.config, cli.profile)?;
            let service = SearchService::from_config(&config)?;
            service.like(&query, &doc_id)?;
            println!("✓ Recorded '{}' for '{}'", doc_id, query);
        }
        Commands::Analyze {
            query,
            expected,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_analyze(&config, &query, &expected, json)?;
        }
        Commands::Eval { action } => {
            let config = load_config(cli.config, cli.profile)?;
            let code = cmd_eval(&config, action)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "folio=debug" } else { "folio=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| FolioError::Io {
        source: e,
        context: "Failed to start async runtime".to_string(),
    })
}

fn cmd_search(config: &Config, params: &SearchParams, json: bool) -> Result<()> {
    let service = SearchService::from_config(config)?;
    let response = runtime()?.block_on(service.search(params))?;

    if json {
        println!("{}", to_json(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &SearchResponse) {
    println!(
        "'{}': {} results (title hits {}, page hits {})",
        response.original_query, response.total, response.title_hits, response.page_hits
    );
    if response.variants.len() > 1 {
        println!("  variants: {}", response.variants.join(" | "));
    }
    if !response.publication_types.is_empty() {
        println!("  types: {}", response.publication_types.join(", "));
    }
    if let Some(kind) = response.degraded {
        println!("  ⚠ {} query failed; showing partial results", kind);
    }

    for (i, result) in response.results.iter().enumerate() {
        println!(
            "\n{:>3}. {} [{:.1}, {}]",
            i + 1,
            result.preview(100),
            result.score,
            result.provenance
        );
        let mut facts = vec![format!("id {}", result.id), result.category().to_string()];
        if let Some(year) = &result.meta.book_year {
            facts.push(year.clone());
        }
        println!("     {}", facts.join(" · "));
        for page in result.matched_pages.iter().take(3) {
            let snippet: String = page.snippet.chars().take(140).collect();
            match page.page {
                Some(n) => println!("     p.{}: {}", n, snippet),
                None => println!("     {}", snippet),
            }
        }
    }
}

fn cmd_analyze(config: &Config, query: &str, expected: &[String], json: bool) -> Result<()> {
    let service = SearchService::from_config(config)?;
    let analysis = runtime()?.block_on(service.analyze(query, expected))?;

    if json {
        println!("{}", to_json(&analysis)?);
    } else {
        print!("{}", analysis_report(&analysis));
    }
    Ok(())
}

/// Returns the process exit code
fn cmd_eval(config: &Config, action: EvalAction) -> Result<i32> {
    match action {
        EvalAction::Run { no_save, json } => {
            let service = SearchService::from_config(config)?;
            println!("Running {} search quality tests...", service.suite().len());
            let summary = runtime()?.block_on(service.run_metrics());

            if json {
                println!("{}", to_json(&summary)?);
            } else {
                print!("{}", summary_report(&summary));
            }

            let code = summary.grade().exit_code();
            if !no_save {
                let entry = service.record_run(summary)?;
                println!(
                    "✓ Saved run {} ({}@{})",
                    entry.id,
                    entry.short_commit(),
                    entry.branch
                );
            }
            Ok(code)
        }
        EvalAction::History => {
            let history = HistoryStore::from_config(&config.storage).load();
            if history.is_empty() {
                println!("No recorded runs in {}", config.storage.history_path().display());
            } else {
                print!("{}", history_report(&history));
            }
            Ok(0)
        }
        EvalAction::Compare { old, new } => {
            let comparison = HistoryStore::from_config(&config.storage).compare(old, new)?;
            print!("{}", comparison_report(&comparison));
            Ok(0)
        }
        EvalAction::Trend => {
            let history = HistoryStore::from_config(&config.storage).load();
            match analyze_trends(&history) {
                Some(trend) => println!("Since the previous run: {}", trend),
                None => println!("Need at least two recorded runs for a trend"),
            }
            Ok(0)
        }
    }
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            println!("{}", to_json(&config)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Engine: {} ({})", config.engine.url, config.engine.index);
            println!("  Rescoring policy: {}", config.ranking.policy);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            let config_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&config_dir).map_err(|e| FolioError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", config_dir),
            })?;

            let (suite_path, tables_path) = install_templates(&config_dir, force)?;

            let mut config = Config::default();
            config.evaluation.suite_file = Some(suite_path);
            config.evaluation.tables_file = Some(tables_path);
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
            println!("✓ Evaluation files installed");
            println!("  - suite.toml: search quality test cases");
            println!("  - tables.toml: query categories and publication types");
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = if !path.exists() {
        tracing::warn!("Config file not found, using defaults. Run 'folio config init' to create one.");
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        config
    } else if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)?
    } else {
        Config::load(&path)?
    };

    expand_paths(&mut config)?;
    Ok(config)
}

/// Write the default suite and classifier tables next to the config file
fn install_templates(config_dir: &Path, force: bool) -> Result<(PathBuf, PathBuf)> {
    let suite_path = config_dir.join("suite.toml");
    let tables_path = config_dir.join("tables.toml");

    for (path, content) in [
        (&suite_path, include_str!("../config-templates/suite.toml")),
        (&tables_path, include_str!("../config-templates/tables.toml")),
    ] {
        if force || !path.exists() {
            std::fs::write(path, content).map_err(|e| FolioError::Io {
                source: e,
                context: format!("Failed to write {:?}", path),
            })?;
        }
    }

    Ok((suite_path, tables_path))
}

fn expand_paths(config: &mut Config) -> Result<()> {
    config.storage.data_dir = expand_path(&config.storage.data_dir)?;
    for path in [
        &mut config.storage.interaction_log,
        &mut config.storage.history_file,
        &mut config.evaluation.suite_file,
        &mut config.evaluation.tables_file,
    ]
    .into_iter()
    .flatten()
    {
        *path = expand_path(path)?;
    }
    Ok(())
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| FolioError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| FolioError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| FolioError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })
}
