//! bondledger CLI - Bond Portfolio Tracker
//!
//! Command-line interface for editing a bond ledger and moving it in and out
//! of spreadsheets.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bondledger_core::{JsonFileStore, Ledger, LedgerConfig, LedgerFilter};
use bondledger_excel::ExcelExporter;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{parse_assignment, OutputFormat};

#[derive(Parser)]
#[command(name = "bondledger")]
#[command(author, version, about = "Bond portfolio tracker", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ./bondledger.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the saved ledger
    #[arg(long, value_name = "DIR", env = "BONDLEDGER_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a bond
    Add {
        /// Bond name
        #[arg(short, long)]
        bond: String,

        /// Extra column values, e.g. --field MaturityDate=2027-03-15
        #[arg(short, long = "field", value_name = "HEADER=VALUE", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },

    /// Set one cell of a bond
    Set {
        /// Row index as shown by `list`
        index: usize,

        /// Column header, e.g. Platform or Mar-2024
        header: String,

        /// New value
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// List bonds ordered by maturity
    List {
        /// Filter by bond name
        #[arg(long, default_value = "")]
        bond: String,

        /// Filter by platform
        #[arg(long, default_value = "")]
        platform: String,

        /// Filter by ISIN
        #[arg(long, default_value = "")]
        isin: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show one bond with its month grid
    Show {
        index: usize,
    },

    /// Ledger totals
    Totals {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Export the ledger to an XLSX workbook
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Replace the ledger with the first sheet of a workbook
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write an empty workbook with the full header row
    Template {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Remove every bond and the saved ledger
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        println!("bondledger - Bond Portfolio Tracker");
        println!("Run with --help for usage information");
        return Ok(());
    };

    let cwd = std::env::current_dir().context("resolving working directory")?;
    let config = LedgerConfig::discover(cli.config.as_deref(), &cwd)?;
    let schema = config.schema()?;
    let dir = cli.data_dir.unwrap_or_else(|| config.storage.dir.clone());
    let store = JsonFileStore::new(dir, config.storage.namespace.clone());
    debug!(path = %store.path().display(), "opening ledger");

    let mut ledger = Ledger::open(schema, store)?;
    let exporter = ExcelExporter::from_config(&config.export);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Add { bond, fields } => commands::add(&mut ledger, &bond, &fields, &mut out),
        Commands::Set {
            index,
            header,
            value,
        } => commands::set(&mut ledger, index, &header, &value, &mut out),
        Commands::List {
            bond,
            platform,
            isin,
            format,
        } => {
            let filter = LedgerFilter {
                bond,
                platform,
                isin,
            };
            commands::list(&ledger, &filter, format, &mut out)
        }
        Commands::Show { index } => commands::show(&ledger, index, &mut out),
        Commands::Totals { format } => commands::totals(&ledger, format, &mut out),
        Commands::Export { file } => commands::export(&ledger, &exporter, &file, &mut out),
        Commands::Import { file } => commands::import(&mut ledger, &file, &mut out),
        Commands::Template { file } => commands::template(&ledger, &exporter, &file, &mut out),
        Commands::Clear => commands::clear(&mut ledger, &mut out),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the `-v` level
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
