//! @ai:module:intent CLI entry point for the enginsights metrics engine
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on aggregate, loader, output, config

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use enginsights::{loader, output, Engine, EngineConfig, GroupKey, OutputFormat, ScopeSelection};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_CONFIG_FILE: &str = "enginsights.toml";

#[derive(Parser)]
#[command(name = "enginsights")]
#[command(author, version, about = "Pull-request engineering metrics per individual, team, and org")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize PR metrics for one scope
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Aggregation scope: individual, team, or org
        #[arg(long, short)]
        scope: String,

        /// Author (individual scope) or team (team scope) to narrow to
        #[arg(long)]
        selected: Option<String>,

        /// Grouping key: author, team, repository, org, or all
        #[arg(long, short)]
        group_by: Option<String>,

        /// Only PRs created within this many days (overrides config)
        #[arg(long)]
        lookback_days: Option<u32>,

        /// Reference time for the lookback window (RFC 3339)
        #[arg(long)]
        now: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// List selectable values among filtered PRs
    Options {
        #[command(flatten)]
        input: InputArgs,

        /// Which values to list
        #[arg(long, short, value_enum, default_value = "authors")]
        kind: OptionKind,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print derived per-PR metrics before any filtering
    Derive {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value = "json-pretty")]
        format: Format,
    },

    /// Initialize default configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// PR table: .json, .jsonl, .csv, or a directory of them (overrides config)
    #[arg(long)]
    prs: Option<PathBuf>,

    /// Author-to-team mapping table (overrides config)
    #[arg(long)]
    teams: Option<PathBuf>,

    /// Config file (defaults to ./enginsights.toml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
    Markdown,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
            Format::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OptionKind {
    Authors,
    Teams,
    Repositories,
    Orgs,
}

impl OptionKind {
    fn label(&self) -> &'static str {
        match self {
            OptionKind::Authors => "authors",
            OptionKind::Teams => "teams",
            OptionKind::Repositories => "repositories",
            OptionKind::Orgs => "orgs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match init_tracing().and_then(|_| run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// @ai:intent Install the stderr log subscriber
/// @ai:effects io
fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("enginsights=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Summary {
            input,
            scope,
            selected,
            group_by,
            lookback_days,
            now,
            format,
        } => {
            let mut config = load_or_default_config(input.config.as_deref())?;
            if let Some(days) = lookback_days {
                config = config.with_lookback_days(days);
            }

            let engine = load_engine(&input, &config)?;
            let engine = match now {
                Some(now) => engine.at(parse_now(&now)?),
                None => engine,
            };

            let selection = ScopeSelection::parse(&scope, selected)?;
            let group_by = match group_by {
                Some(key) => key.parse::<GroupKey>()?,
                None => selection.scope().default_group_key(),
            };

            let summary = engine.summarize(&selection, group_by)?;
            println!("{}", output::format_summary(&summary, format.into()));
            Ok(())
        }

        Commands::Options {
            input,
            kind,
            format,
        } => {
            let config = load_or_default_config(input.config.as_deref())?;
            let engine = load_engine(&input, &config)?;

            let values = match kind {
                OptionKind::Authors => engine.available_authors(),
                OptionKind::Teams => engine.available_teams()?,
                OptionKind::Repositories => engine.available_repositories(),
                OptionKind::Orgs => engine.available_orgs(),
            };
            println!("{}", output::format_options(kind.label(), &values, format.into()));
            Ok(())
        }

        Commands::Derive { input, format } => {
            let config = load_or_default_config(input.config.as_deref())?;
            let engine = load_engine(&input, &config)?;
            println!("{}", output::format_derived(engine.derived(), format.into()));
            Ok(())
        }

        Commands::Init { output } => init_config(&output),
    }
}

/// @ai:intent Load both tables and build an engine session
/// @ai:effects fs:read
fn load_engine(input: &InputArgs, config: &EngineConfig) -> Result<Engine> {
    let prs_path = input.prs.as_deref().unwrap_or(&config.paths.prs);
    let teams_path = input.teams.as_deref().unwrap_or(&config.paths.teams);

    let prs = loader::load_prs(prs_path)?;
    let teams = loader::load_teams(teams_path)?;

    match Engine::new(&prs, teams.as_ref(), config) {
        Ok(engine) => Ok(engine),
        Err(e) if e.is_schema_error() => Err(anyhow::Error::new(e)
            .context(format!("PR table does not match the expected schema: {}", prs_path.display()))),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("Failed to build engine from {}", prs_path.display()))),
    }
}

/// @ai:intent Parse the --now reference time
/// @ai:effects pure
fn parse_now(value: &str) -> Result<DateTime<Utc>> {
    let now = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("--now must be an RFC 3339 timestamp, got {:?}", value))?;
    Ok(now.with_timezone(&Utc))
}

/// @ai:intent Load configuration or use defaults
/// @ai:effects fs:read
fn load_or_default_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load(p)
            .with_context(|| format!("Failed to load config: {}", p.display())),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);

            if default_path.exists() {
                EngineConfig::load(&default_path)
                    .with_context(|| format!("Failed to load config: {}", default_path.display()))
            } else {
                Ok(EngineConfig::default())
            }
        }
    }
}

/// @ai:intent Write the default configuration file
/// @ai:effects fs:write
fn init_config(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!("Config file already exists: {}", output.display());
    }

    EngineConfig::default().save(output)?;
    tracing::info!("Created default config: {}", output.display());
    Ok(())
}
