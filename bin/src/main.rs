//! CLI for the fd-panel factor pipeline.
//!
//! This binary lists and describes the factor groups, and builds a monthly
//! factor panel from per-symbol CSV files laid out as
//! `<data-dir>/<source kind>/<symbol>.csv`.

use clap::{Parser, Subcommand};
use fd_panel::{
    FactorCategory, FactorRegistry, PanelBuilder, PanelError, PipelineConfig, SourceKind,
    SourceTable, SymbolSource, dates::parse_date,
};
use polars::prelude::*;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    process,
};

/// Universe file column holding the symbols.
const UNIVERSE_COLUMN: &str = "stock_codes";

#[derive(Parser)]
#[command(name = "fd-panel")]
#[command(about = "Monthly equity factor tables and panels", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all factor groups
    List,
    /// Show information about a factor group
    Info {
        /// Group name
        group: String,
    },
    /// Build a factor panel from per-symbol CSV files
    Build {
        /// Directory with one subdirectory per source kind
        #[arg(long)]
        data_dir: PathBuf,
        /// CSV file listing the symbols in a `stock_codes` column
        #[arg(long)]
        universe: PathBuf,
        /// First date of the panel (YYYYMMDD or YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last date of the panel (YYYYMMDD or YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Output CSV path for the panel
        #[arg(long)]
        output: PathBuf,
        /// JSON pipeline configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also write each symbol's factor table into this directory
        #[arg(long)]
        factor_dir: Option<PathBuf>,
        /// Write the panel without standardization
        #[arg(long)]
        raw: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error("DataFrame error: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Options of the `build` command.
struct BuildArgs {
    data_dir: PathBuf,
    universe: PathBuf,
    start: String,
    end: String,
    output: PathBuf,
    config: Option<PathBuf>,
    factor_dir: Option<PathBuf>,
    raw: bool,
}

/// Source tables read from `<data_dir>/<kind>/<symbol>.csv`.
///
/// A missing file is an error for the kinds the factor groups read and is
/// skipped for the others.
#[derive(Debug, Clone)]
struct CsvSource {
    data_dir: PathBuf,
}

impl CsvSource {
    const fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn path(&self, kind: SourceKind, symbol: &str) -> PathBuf {
        self.data_dir
            .join(kind.to_string())
            .join(format!("{symbol}.csv"))
    }
}

impl SymbolSource for CsvSource {
    fn load(&self, symbol: &str) -> fd_panel::Result<Vec<SourceTable>> {
        let mut tables = Vec::new();
        for kind in SourceKind::ALL {
            let path = self.path(kind, symbol);
            if !path.exists() {
                if kind.is_required() {
                    return Err(PanelError::MissingSource(kind));
                }
                log::debug!("{symbol}: no {kind} file, skipping");
                continue;
            }
            tables.push(SourceTable::new(kind, read_csv(&path)?)?);
        }
        Ok(tables)
    }
}

fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Symbols of the universe file, in file order.
fn universe_symbols(df: &DataFrame) -> Result<Vec<String>, CliError> {
    let column = df
        .column(UNIVERSE_COLUMN)
        .map_err(|_| PanelError::MissingColumn(UNIVERSE_COLUMN.to_string()))?
        .cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let registry = FactorRegistry::with_defaults();

    let result = match cli.command {
        Commands::List => {
            list_groups(&registry);
            Ok(())
        }
        Commands::Info { group } => {
            show_group_info(&registry, &group);
            Ok(())
        }
        Commands::Build {
            data_dir,
            universe,
            start,
            end,
            output,
            config,
            factor_dir,
            raw,
        } => build_panel(BuildArgs {
            data_dir,
            universe,
            start,
            end,
            output,
            config,
            factor_dir,
            raw,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// List all factor groups by category.
fn list_groups(registry: &FactorRegistry) {
    let mut by_category: HashMap<FactorCategory, Vec<_>> = HashMap::new();
    for info in registry.all_info() {
        by_category.entry(info.category).or_default().push(info);
    }

    println!(
        "Factor groups ({} groups, {} columns)\n",
        registry.len(),
        registry.output_columns().len()
    );

    let mut categories: Vec<_> = by_category.into_iter().collect();
    categories.sort_by_key(|(c, _)| c.to_string());

    for (category, groups) in categories {
        println!("{category}:");
        for info in groups {
            println!("  {} - {}", info.name, info.description);
            println!("    {}", info.output_columns.join(", "));
        }
        println!();
    }
}

/// Show detailed information about one factor group.
fn show_group_info(registry: &FactorRegistry, name: &str) {
    let all_info = registry.all_info();

    let Some(info) = all_info.iter().find(|g| g.name == name) else {
        eprintln!("Error: Factor group '{name}' not found");
        eprintln!("\nAvailable groups:");
        for info in &all_info {
            eprintln!("  {}", info.name);
        }
        process::exit(1);
    };

    println!("Group: {}", info.name);
    println!("Category: {}", info.category);
    println!("Description: {}", info.description);
    println!("Input frequency: {:?}", info.frequency);
    println!("Lookback: {} periods", info.lookback);
    println!("Required columns:");
    for col in &info.required_columns {
        println!("  - {col}");
    }
    println!("Output columns:");
    for col in &info.output_columns {
        println!("  - {col}");
    }
}

/// Build the panel and write it, and optionally every factor table.
fn build_panel(args: BuildArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;
    config.panel.start_date = parse_date(&args.start)?;
    config.panel.end_date = parse_date(&args.end)?;

    let symbols = universe_symbols(&read_csv(&args.universe)?)?;
    log::info!("building panel for {} symbols", symbols.len());

    let builder = PanelBuilder::new(CsvSource::new(args.data_dir), config)?;
    let panel = builder.build(&symbols)?;

    if let Some(dir) = &args.factor_dir {
        fs::create_dir_all(dir)?;
        for (symbol, table) in panel.factor_tables() {
            write_csv(&dir.join(format!("{symbol}.csv")), &mut table.clone())?;
        }
    }

    let mut output = if args.raw {
        panel.frame().clone()
    } else {
        panel.standardized()?
    };
    write_csv(&args.output, &mut output)?;

    println!(
        "Wrote {} rows for {} symbols to {}",
        output.height(),
        symbols.len() - panel.skipped().len(),
        args.output.display()
    );
    for (symbol, reason) in panel.skipped() {
        eprintln!("  skipped {symbol}: {reason}");
    }
    Ok(())
}
