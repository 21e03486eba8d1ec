//! notebase CLI - check and recompute formula/rollup catalogs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notebase::prelude::*;
use notebase::preview_formula;
use serde_json::json;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "notebase")]
#[command(
    author,
    version,
    about = "Formula and rollup recompute for Notion-like databases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every formula and report evaluation order and errors
    Check {
        /// Catalog JSON file (`{"dataSources": [...]}`)
        catalog: PathBuf,
    },

    /// Recompute formulas and rollups, writing the results as JSON
    Recompute {
        /// Catalog JSON file
        catalog: PathBuf,

        /// Data source to recompute (default: all)
        #[arg(short, long)]
        data_source: Option<String>,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip rollup properties
        #[arg(long)]
        no_rollups: bool,

        /// Cap the values reported by `original` rollups
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Evaluate a formula, optionally against a row of a catalog
    Eval {
        /// Formula text
        formula: String,

        /// Catalog JSON file providing the schema
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Data source whose schema the formula is evaluated against
        #[arg(short, long, requires = "catalog")]
        data_source: Option<String>,

        /// Row the formula reads properties from
        #[arg(short, long, requires = "data_source")]
        row: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebase=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { catalog } => check(&catalog),
        Commands::Recompute {
            catalog,
            data_source,
            output,
            no_rollups,
            limit,
        } => recompute(
            &catalog,
            data_source.as_deref(),
            output.as_deref(),
            no_rollups,
            limit,
        ),
        Commands::Eval {
            formula,
            catalog,
            data_source,
            row,
        } => eval(
            &formula,
            catalog.as_deref(),
            data_source.as_deref(),
            row.as_deref(),
        ),
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let catalog =
        Catalog::from_json(&json).with_context(|| format!("Failed to load '{}'", path.display()))?;
    info!(
        path = %path.display(),
        data_sources = catalog.data_sources().count(),
        "loaded catalog"
    );
    Ok(catalog)
}

fn check(path: &Path) -> Result<()> {
    let catalog = load_catalog(path)?;
    let mut total_errors = 0;

    for source in catalog.data_sources() {
        let Some(runtime) = catalog.runtime(&source.id) else {
            continue;
        };
        println!("Data source: {} ({})", source.name, source.id);
        println!("  Formulas: {}", runtime.formula_count());

        let order: Vec<&str> = runtime.order().collect();
        if !order.is_empty() {
            println!("  Order: {}", order.join(" -> "));
        }

        for (id, error) in runtime.structural_errors() {
            println!("  Error: {}: {}", id, error);
            total_errors += 1;
        }
    }

    eprintln!("{} formula errors", total_errors);
    Ok(())
}

fn recompute(
    path: &Path,
    data_source: Option<&str>,
    output: Option<&Path>,
    no_rollups: bool,
    limit: Option<usize>,
) -> Result<()> {
    let catalog = load_catalog(path)?;
    let options = RecomputeOptions {
        rollup: RollupOptions {
            original_value_limit: limit,
        },
        include_rollups: !no_rollups,
    };

    let ids: Vec<String> = match data_source {
        Some(id) => vec![id.to_string()],
        None => catalog.data_sources().map(|s| s.id.clone()).collect(),
    };

    let mut sources = Vec::with_capacity(ids.len());
    for id in &ids {
        let recomputed = catalog
            .recompute(id, &options)
            .with_context(|| format!("Failed to recompute '{}'", id))?;
        let stats = &recomputed.stats;
        eprintln!(
            "{}: recomputed {} rows ({} formula errors, {} rollups)",
            id, stats.rows_recomputed, stats.errors, stats.rollups_computed
        );
        sources.push(recomputation_json(&recomputed));
    }

    let document = serde_json::to_string_pretty(&json!({ "dataSources": sources }))
        .context("Failed to serialize results")?;

    if let Some(output_path) = output {
        std::fs::write(output_path, &document)
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!("Wrote {} data sources to '{}'", ids.len(), output_path.display());
    } else {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", document).context("Failed to write to stdout")?;
    }

    Ok(())
}

fn recomputation_json(recomputed: &Recomputation) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = recomputed
        .rows
        .iter()
        .map(|result| {
            let rollups: serde_json::Map<String, serde_json::Value> = recomputed
                .rollups
                .iter()
                .filter(|entry| entry.row_id == result.row.id)
                .map(|entry| (entry.property_id.clone(), rollup_json(&entry.result)))
                .collect();
            json!({
                "id": result.row.id,
                "databaseProperties": result.row.database_properties,
                "formulaErrors": result.row.formula_errors,
                "rollups": rollups,
            })
        })
        .collect();

    json!({
        "id": recomputed.data_source_id,
        "rows": rows,
    })
}

fn rollup_json(result: &RollupResult) -> serde_json::Value {
    json!({
        "state": result.state.as_str(),
        "calculation": result.calculation.to_string(),
        "values": result.values,
        "count": result.count,
        "totalCount": result.total_count,
        "countFraction": result.count_fraction,
        "percent": result.percent,
        "message": result.message,
    })
}

fn eval(
    formula: &str,
    catalog: Option<&Path>,
    data_source: Option<&str>,
    row: Option<&str>,
) -> Result<()> {
    let result = match (catalog, data_source) {
        (Some(path), Some(id)) => {
            let catalog = load_catalog(path)?;
            catalog
                .preview(id, row, formula)
                .with_context(|| format!("Failed to evaluate against '{}'", id))?
        }
        _ => preview_formula(
            &[],
            notebase::PREVIEW_PROPERTY_ID,
            formula,
            &Row::default(),
            &RuntimeOptions::default(),
        ),
    };

    match result.error {
        Some(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
        None => println!("{}", result.value.to_text()),
    }
    Ok(())
}
