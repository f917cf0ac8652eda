//! sift - a catalog endpoint driven from the command line.
//!
//! Each subcommand maps onto one CRUD operation and prints the response
//! envelope (`status` plus `body`) as JSON:
//!
//! ```text
//! sift list 'name=h*&price=>=20&ordering=-price'
//! sift get 3
//! sift create '{"sku": "GD-010", "name": "Rake", "price": 14.5}'
//! sift patch 3 '{"stock": 25}'
//! sift delete 3
//! sift explain 'category__parent__name=hardware&bogus=1'
//! ```
//!
//! Records live in memory, seeded with a sample catalog. Pass `--data` to
//! keep them in a JSON file between runs. Set `RUST_LOG=debug` to see how
//! filters are resolved.

mod catalog;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sifter_crud::{CrudConfig, CrudResponse};
use sifter_query::{FilterSpec, OrderTerm, PageDescriptor, QueryParams};

use crate::catalog::Catalog;

/// Query and edit a sample product catalog.
#[derive(Parser)]
#[command(name = "sift")]
#[command(version)]
#[command(about = "Query and edit a sample product catalog")]
struct Cli {
    /// YAML configuration (page sizes, parameter names, default ordering)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON file holding the records; created on the first write
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Base URL used for pagination links
    #[arg(long, global = true, default_value = "http://localhost/items/")]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List items matching a query string
    List {
        /// Query string, e.g. "name=h*&ordering=-price&page=2"
        #[arg(default_value = "")]
        query: String,
    },

    /// Show one item
    Get { id: String },

    /// Create an item from a JSON object
    Create { payload: String },

    /// Replace an item's fields (every required field must be given)
    Update { id: String, payload: String },

    /// Change some of an item's fields
    Patch { id: String, payload: String },

    /// Delete an item
    Delete { id: String },

    /// Show how a query string is interpreted, without running it
    Explain {
        #[arg(default_value = "")]
        query: String,
    },
}

#[derive(Serialize)]
struct Explanation {
    satisfiable: bool,
    filters: FilterSpec,
    ordering: Vec<OrderTerm>,
    page: PageDescriptor,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CrudConfig::from_path(path)?,
        None => CrudConfig::default(),
    };
    let items = catalog::load(cli.data.as_deref())?;
    let catalog = catalog::catalog(items, config)?;

    let (response, writes) = match &cli.command {
        Commands::List { query } => (
            catalog.list(&cli.base_url, &QueryParams::parse(query)),
            false,
        ),
        Commands::Get { id } => (catalog.retrieve(id), false),
        Commands::Create { payload } => (catalog.create(parse_payload(payload)?), true),
        Commands::Update { id, payload } => (catalog.update(id, parse_payload(payload)?), true),
        Commands::Patch { id, payload } => {
            (catalog.partial_update(id, parse_payload(payload)?), true)
        }
        Commands::Delete { id } => (catalog.destroy(id), true),
        Commands::Explain { query } => {
            print_json(&explain(&catalog, query))?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    if writes && response.is_success() {
        if let Some(path) = &cli.data {
            catalog::save(&catalog, path)?;
        }
    }
    print_json(&response)?;
    Ok(exit_code(&response))
}

fn parse_payload(raw: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(raw).context("payload is not valid JSON")
}

fn explain(catalog: &Catalog, query: &str) -> Explanation {
    let params = QueryParams::parse(query);
    let filters = catalog.filter_spec(&params);
    Explanation {
        satisfiable: filters.is_satisfiable(),
        ordering: catalog.ordering(&params),
        page: PageDescriptor::from_params(&params, &catalog.config().page_settings()),
        filters,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(response: &CrudResponse) -> ExitCode {
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
