//! CLI for inspecting alert states, annotations, rule lists and query parts
//!
//! Run `alertdef --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::io::Read;
use std::path::{Path, PathBuf};

use alerting::catalog::{self, SelectOption};
use alerting::rules::STATE_FILTERS;
use alerting::{
    create_reducer_part, get_state_display_model, Annotation, AlertRule, ModelConfig, QueryPart,
    QueryPartModel, QueryRefIds, RuleListQuery, StateFilter,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "alertdef")]
#[command(about = "Inspect alert states, annotations, rule lists and query parts")]
#[command(version)]
struct Cli {
    /// Output format: json, text
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file
    #[arg(short, long, env = "ALERTING_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the display descriptor for a state token
    State {
        /// State token, e.g. alerting, no_data
        token: String,
    },

    /// Summarise an alert annotation
    Summary {
        /// Annotation JSON file, or - for stdin
        input: PathBuf,
    },

    /// Build the rule list from an alerts API response
    Rules {
        /// JSON array of rules, or - for stdin
        input: PathBuf,

        /// State filter: all, ok, not_ok, alerting, no_data, paused, pending
        #[arg(long, default_value = "all")]
        filter: String,

        /// Search expression matched against name, state and info
        #[arg(short, long, default_value = "")]
        search: String,

        /// Sort by state urgency
        #[arg(long)]
        sort: bool,
    },

    /// Build a query part and check its params
    Part {
        /// Part type: query, or a reducer such as avg
        part_type: String,

        /// Param values, in order
        params: Vec<String>,

        /// Query reference IDs defined on the panel
        #[arg(long, value_delimiter = ',')]
        refs: Vec<String>,
    },

    /// List the built-in option tables
    Options,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "Using config");

    match cli.command {
        Commands::State { token } => run_state(&token, cli.format),
        Commands::Summary { input } => run_summary(&input, &config, cli.format),
        Commands::Rules {
            input,
            filter,
            search,
            sort,
        } => run_rules(&input, &filter, search, sort, &config, cli.format),
        Commands::Part {
            part_type,
            params,
            refs,
        } => run_part(&part_type, params, refs, cli.format),
        Commands::Options => run_options(cli.format),
    }
}

fn load_config(path: Option<&Path>) -> Result<ModelConfig> {
    let Some(path) = path else {
        return ModelConfig::from_env().context("Failed to load config from environment");
    };

    let mut config = ModelConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    config
        .apply_overrides(|var| std::env::var(var).ok())
        .context("Invalid config override")?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
    }
}

fn run_state(token: &str, format: OutputFormat) -> Result<()> {
    let display = get_state_display_model(token)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&display)?),
        OutputFormat::Text => println!(
            "{} (icon: {}, class: {})",
            display.text, display.icon_class, display.severity_class
        ),
    }
    Ok(())
}

fn run_summary(input: &Path, config: &ModelConfig, format: OutputFormat) -> Result<()> {
    let annotation: Annotation =
        serde_json::from_str(&read_input(input)?).context("Annotation is not valid JSON")?;
    let summary = annotation.summary_with(&config.match_separator);

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "shape": annotation.payload().shape(),
                "summary": summary,
            })
        ),
        OutputFormat::Text => println!("{summary}"),
    }
    Ok(())
}

fn run_rules(
    input: &Path,
    filter: &str,
    search: String,
    sort: bool,
    config: &ModelConfig,
    format: OutputFormat,
) -> Result<()> {
    let rules: Vec<AlertRule> =
        serde_json::from_str(&read_input(input)?).context("Rules are not a valid JSON array")?;

    let query = RuleListQuery {
        filter: StateFilter::from_token(filter),
        search,
        case_insensitive: config.search_case_insensitive,
        sort: sort.then_some(config.unknown_state_sort),
    };
    let items = query.apply(rules, chrono::Utc::now())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No alert rules match");
            }
            for item in items {
                let age = if item.state_age.is_empty() {
                    String::new()
                } else {
                    format!(" for {}", item.state_age)
                };
                println!("[{}] {}{age}", item.state_text, item.rule.name);
                if let Some(info) = &item.info {
                    println!("  {info}");
                }
            }
        }
    }
    Ok(())
}

fn run_part(part_type: &str, params: Vec<String>, refs: Vec<String>, format: OutputFormat) -> Result<()> {
    let part = if part_type == "query" {
        QueryPart::new(catalog::alert_query_def(), &params)
    } else if catalog::is_reducer(part_type) {
        create_reducer_part(&QueryPartModel {
            part_type: part_type.to_string(),
            params,
        })
    } else {
        anyhow::bail!("Unknown part type '{part_type}'. Use query or a reducer type");
    };

    let errors = if refs.is_empty() {
        part.validate()
    } else {
        part.validate_with(&QueryRefIds(refs))
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "model": part.to_model(),
                "rendered": part.render(),
                "errors": errors,
            }))?
        ),
        OutputFormat::Text => {
            println!("{part}");
            for error in &errors {
                println!("  {error}");
            }
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("{} invalid param(s)", errors.len());
    }
    Ok(())
}

fn run_options(format: OutputFormat) -> Result<()> {
    let tables: [(&str, &[SelectOption]); 7] = [
        ("conditionTypes", catalog::CONDITION_TYPES),
        ("evalFunctions", catalog::EVAL_FUNCTIONS),
        ("evalOperators", catalog::EVAL_OPERATORS),
        ("reducerTypes", catalog::REDUCER_TYPES),
        ("noDataModes", catalog::NO_DATA_MODES),
        ("executionErrorModes", catalog::EXECUTION_ERROR_MODES),
        ("stateFilters", STATE_FILTERS),
    ];

    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = tables
                .iter()
                .map(|(name, options)| Ok(((*name).to_string(), serde_json::to_value(options)?)))
                .collect::<Result<_, serde_json::Error>>()?;
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            for (name, options) in tables {
                println!("{name}:");
                for option in options {
                    println!("  {:<16} {}", option.value, option.text);
                }
            }
        }
    }
    Ok(())
}
