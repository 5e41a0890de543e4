//! Command-line entry point for FireTrack core.
//!
//! # Responsibility
//! - Expose recurrence math and schema-tolerant lookups for local checks.
//! - Print deterministic `key=value` lines.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use firetrack_core::service::customer_service::CustomerService;
use firetrack_core::{
    init_logging_from_config, next_from_anchor, open_db, parse_when, seed_core_documents,
    seed_core_schema, sqlite_accessor, CoreConfig, Frequency, RequestContext,
};
use log::info;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "firetrack.toml";

#[derive(Parser, Debug)]
#[command(name = "firetrack", version)]
#[command(about = "FireTrack compliance core tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check core linkage.
    Ping,
    /// Next occurrence of a recurring inspection.
    NextDue {
        #[arg(long)]
        frequency: String,
        #[arg(long)]
        anchor: String,
    },
    /// Split scheduling input into an instant or a required date.
    ParseWhen { raw: String },
    /// Resolve a customer by name, creating it when missing.
    EnsureCustomer {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// JSON request body; its `customer_name` wins over the argument.
        #[arg(long)]
        body: Option<String>,
        name: Option<String>,
    },
    /// Whether a kind defines a field in this install.
    HasField {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        kind: String,
        field: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    for line in run(cli.command)? {
        println!("{line}");
    }
    Ok(())
}

fn run(command: Command) -> Result<Vec<String>> {
    match command {
        Command::Ping => Ok(vec![
            format!("firetrack_core ping={}", firetrack_core::ping()),
            format!("firetrack_core version={}", firetrack_core::core_version()),
        ]),
        Command::NextDue { frequency, anchor } => {
            let code = Frequency::parse(&frequency)
                .map(Frequency::as_str)
                .unwrap_or("unknown");
            let next = next_from_anchor(Some(anchor.as_str()), Some(frequency.as_str()));
            Ok(vec![
                format!("frequency={code}"),
                format!("next_due={}", display_or_none(next)),
            ])
        }
        Command::ParseWhen { raw } => {
            let when = parse_when(&raw);
            Ok(vec![
                format!("instant={}", display_or_none(when.instant)),
                format!("required_date={}", display_or_none(when.required_date)),
            ])
        }
        Command::EnsureCustomer { config, body, name } => {
            let context = RequestContext::new("cli").with_json_body(body.as_deref().unwrap_or(""));
            let Some(customer_name) = context.param("customer_name", name.as_deref()) else {
                bail!("Customer name required");
            };
            let conn = open_configured(&config)?;
            let customers = CustomerService::new(sqlite_accessor(&conn));
            let customer = customers
                .ensure_customer(&customer_name)
                .context("ensure customer failed")?;
            Ok(vec![format!("customer={customer}")])
        }
        Command::HasField {
            config,
            kind,
            field,
        } => {
            let conn = open_configured(&config)?;
            let access = sqlite_accessor(&conn);
            Ok(vec![
                format!("kind_exists={}", access.kind_exists(&kind)),
                format!("field_exists={}", access.field_exists(&kind, &field)),
            ])
        }
    }
}

fn open_configured(config_path: &Path) -> Result<Connection> {
    let config = CoreConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    init_logging_from_config(&config).context("failed to start logging")?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    if config.seed_schema {
        seed_core_schema(&conn).context("failed to seed schema")?;
        seed_core_documents(&conn).context("failed to seed reference documents")?;
    }
    info!(
        "event=cli_open module=cli status=ok seeded={}",
        config.seed_schema
    );
    Ok(conn)
}

fn display_or_none<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |value| value.to_string())
}
