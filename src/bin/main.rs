//! Quarry CLI - Fetch report definitions over a dataset
//!
//! Usage:
//!   quarry list     [--dataset <file.json> | --demo]
//!   quarry headers  [--dataset <file.json> | --demo] <report>
//!   quarry fetch    [--dataset <file.json> | --demo] <report> [--viewer <user>] [--output table|json]
//!   quarry validate [--dataset <file.json> | --demo]
//!   quarry link     [--dataset <file.json> | --demo] <report> <column> <sub-report>
//!
//! Examples:
//!   quarry fetch --demo Organisations
//!   quarry fetch --demo Organisations --viewer ned
//!   quarry fetch -d crm.json Contacts --date-field birthday --period previous_year
//!   quarry link --demo Contacts 2 Organisations

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use quarry::config::Settings;
use quarry::engine::{DateRange, FetchContext, FetchEngine, Period, SubReportLinker};
use quarry::entity::Backend;
use quarry::memory::{fixtures, Dataset, MemoryStore};
use quarry::model::{ReportDefinition, ReportId, ReportStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - Materialize report definitions into rows")]
#[command(version)]
struct Cli {
    /// Path to a quarry.toml settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the reports stored in a dataset
    List {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the flattened headers of a report
    Headers {
        #[command(flatten)]
        source: SourceArgs,

        /// Report name or id
        report: String,
    },

    /// Fetch the rows of a report
    Fetch {
        #[command(flatten)]
        source: SourceArgs,

        /// Report name or id
        report: String,

        /// Fetch as this user (unrestricted if not specified)
        #[arg(long)]
        viewer: Option<String>,

        /// Date attribute restricting the base entities
        #[arg(long)]
        date_field: Option<String>,

        /// First day of the date range (YYYY-MM-DD)
        #[arg(long, requires = "date_field")]
        start: Option<NaiveDate>,

        /// Last day of the date range (YYYY-MM-DD)
        #[arg(long, requires = "date_field")]
        end: Option<NaiveDate>,

        /// Named period instead of --start/--end (current_year, last_30_days, ...)
        #[arg(long, requires = "date_field", conflicts_with_all = ["start", "end"])]
        period: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Check every sub-report link of a dataset
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Link a column to a sub-report and print the resulting headers
    Link {
        #[command(flatten)]
        source: SourceArgs,

        /// Report name or id
        report: String,

        /// Column position
        column: u32,

        /// Sub-report name or id
        sub_report: String,

        /// Expand the sub-report into rows
        #[arg(long)]
        expand: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Dataset JSON file (defaults to [data] path in the settings)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Use the built-in demo dataset
    #[arg(long, conflicts_with = "dataset")]
    demo: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// JSON object with headers and rows
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings);

    match cli.command {
        Commands::List { source } => cmd_list(&settings, source),
        Commands::Headers { source, report } => cmd_headers(&settings, source, &report),
        Commands::Fetch {
            source,
            report,
            viewer,
            date_field,
            start,
            end,
            period,
            output,
        } => {
            let context = match fetch_context(viewer, date_field, start, end, period) {
                Ok(c) => c,
                Err(message) => {
                    eprintln!("{}", message);
                    return ExitCode::FAILURE;
                }
            };
            cmd_fetch(&settings, source, &report, &context, output)
        }
        Commands::Validate { source } => cmd_validate(&settings, source),
        Commands::Link {
            source,
            report,
            column,
            sub_report,
            expand,
        } => cmd_link(&settings, source, &report, column, &sub_report, expand),
    }
}

/// `RUST_LOG` wins over the `[log] filter` setting.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_backend(settings: &Settings, source: SourceArgs) -> Result<MemoryStore, String> {
    if source.demo {
        return fixtures::demo_store().map_err(|e| format!("Demo dataset error: {}", e));
    }

    let path = match source.dataset {
        Some(path) => path,
        None => settings
            .data
            .resolved_path()
            .map_err(|e| format!("Configuration error: {}", e))?
            .ok_or("No dataset given: pass a file, --demo, or set [data] path")?,
    };

    let dataset = Dataset::from_file(&path)
        .map_err(|e| format!("Error loading dataset '{}': {}", path.display(), e))?;
    MemoryStore::new(dataset).map_err(|e| format!("Invalid dataset '{}': {}", path.display(), e))
}

/// Find a report by id or, failing that, by name.
fn find_report<'s>(store: &'s ReportStore, key: &str) -> Result<&'s ReportDefinition, String> {
    key.trim_start_matches('#')
        .parse()
        .ok()
        .and_then(|id| store.get(ReportId(id)))
        .or_else(|| store.find(key))
        .ok_or_else(|| format!("Unknown report '{}'", key))
}

fn fetch_context(
    viewer: Option<String>,
    date_field: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    period: Option<String>,
) -> Result<FetchContext, String> {
    let mut context = match viewer {
        Some(user) => FetchContext::for_user(user),
        None => FetchContext::unrestricted(),
    };

    if let Some(field) = date_field {
        let range = match period {
            Some(name) => {
                let period =
                    Period::parse(&name).ok_or_else(|| format!("Unknown period '{}'", name))?;
                DateRange::for_period(field, period, Local::now().date_naive())
            }
            None => DateRange::new(field, start, end),
        };
        context = context.with_date_range(range);
    }
    Ok(context)
}

fn cmd_list(settings: &Settings, source: SourceArgs) -> ExitCode {
    let backend = match load_backend(settings, source) {
        Ok(b) => b,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let store = backend.reports();

    if store.is_empty() {
        println!("No reports defined.");
        return ExitCode::SUCCESS;
    }

    println!("Reports:");
    for report in store.iter() {
        println!("  {} {} (on: {})", report.id, report.name, report.entity_kind);
        for column in report.columns() {
            let link = match column.sub_report {
                Some(id) if column.selected => format!(" -> {} (expanded)", id),
                Some(id) => format!(" -> {}", id),
                None => String::new(),
            };
            println!(
                "    {}. {} [{} {}]{}",
                column.order, column.title, column.kind, column.name, link
            );
        }
    }
    ExitCode::SUCCESS
}

fn cmd_headers(settings: &Settings, source: SourceArgs, report: &str) -> ExitCode {
    let backend = match load_backend(settings, source) {
        Ok(b) => b,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let store = backend.reports();
    let report = match find_report(&store, report) {
        Ok(r) => r,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let engine = FetchEngine::with_settings(Backend::uniform(&backend), &store, settings);
    for title in engine.headers(report) {
        println!("{}", title);
    }
    ExitCode::SUCCESS
}

fn cmd_fetch(
    settings: &Settings,
    source: SourceArgs,
    report: &str,
    context: &FetchContext,
    output: OutputFormat,
) -> ExitCode {
    let backend = match load_backend(settings, source) {
        Ok(b) => b,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let store = backend.reports();
    let report = match find_report(&store, report) {
        Ok(r) => r,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let engine = FetchEngine::with_settings(Backend::uniform(&backend), &store, settings);
    let table = engine.table(report, context);

    match output {
        OutputFormat::Table => print!("{}", table.to_text()),
        OutputFormat::Json => match serde_json::to_string_pretty(&table) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing rows: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn cmd_validate(settings: &Settings, source: SourceArgs) -> ExitCode {
    let backend = match load_backend(settings, source) {
        Ok(b) => b,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let store = backend.reports();

    match store.validate(&backend, &backend) {
        Ok(()) => {
            println!("OK: {} report(s) are valid", store.len());
            ExitCode::SUCCESS
        }
        Err(errors) => {
            eprintln!("Validation errors:");
            for error in &errors {
                eprintln!("  {}", error);
            }
            ExitCode::FAILURE
        }
    }
}

fn cmd_link(
    settings: &Settings,
    source: SourceArgs,
    report: &str,
    column: u32,
    sub_report: &str,
    expand: bool,
) -> ExitCode {
    let backend = match load_backend(settings, source) {
        Ok(b) => b,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let mut store = backend.reports();
    let ids = find_report(&store, report).and_then(|r| {
        find_report(&store, sub_report).map(|s| (r.id, s.id))
    });
    let (report, candidate) = match ids {
        Ok(ids) => ids,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let linker = SubReportLinker::new(&backend, &backend);
    let result = linker.link(&mut store, report, column, candidate).and_then(|()| {
        match store.get_mut(report) {
            Some(def) if expand => def.set_selected(column, true),
            _ => Ok(()),
        }
    });
    if let Err(e) = result {
        eprintln!("Link error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(def) = store.get(report) else {
        return ExitCode::FAILURE;
    };
    let engine = FetchEngine::with_settings(Backend::uniform(&backend), &store, settings);
    println!("Linked column {} of {} to {}", column, report, candidate);
    for title in engine.headers(def) {
        println!("  {}", title);
    }
    ExitCode::SUCCESS
}
