//! sqlwarden - read-only SQL execution with one-shot self-correction.

mod cli;

use anyhow::Context;
use cli::{Cli, Command};
use sqlwarden::config::Config;
use sqlwarden::db::{DatabaseClient, SqliteClient};
use sqlwarden::error::WardenError;
use sqlwarden::integrity;
use sqlwarden::llm::create_client;
use sqlwarden::logging;
use sqlwarden::query::QueryPipeline;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

/// Exit status when `validate` rejects a statement.
const EXIT_REJECTED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<WardenError>() {
                Some(warden) => error!("{}: {}", warden.category(), warden.message()),
                None => error!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref(), cli.llm)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    match cli.command {
        Command::Query {
            database,
            sql,
            verify_integrity,
        } => run_query(&config, &database, sql, verify_integrity).await,
        Command::Validate { sql } => {
            let verdict = config.query.classifier()?.validate(&sql);
            println!("{verdict}");
            Ok(if verdict.is_allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_REJECTED)
            })
        }
        Command::Schema { database } => {
            let db = SqliteClient::open(&database)?;
            let schema = db.introspect_schema().await?;
            print!("{}", schema.format_for_llm());
            Ok(ExitCode::SUCCESS)
        }
        Command::Hash { database } => {
            let digest = integrity::fingerprint(&database)?;
            println!("{}  {}", digest, database.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_query(
    config: &Config,
    database: &Path,
    sql: String,
    verify_integrity: bool,
) -> anyhow::Result<ExitCode> {
    let before = if verify_integrity {
        let digest = integrity::fingerprint(database)?;
        info!("SHA-256 before run: {digest}");
        Some(digest)
    } else {
        None
    };

    let db = SqliteClient::open(database)?.with_max_rows(config.query.max_rows);
    let llm = create_client(&config.llm)?;
    info!("Correction provider: {}", config.llm.provider);

    let pipeline = QueryPipeline::new(&db, llm.as_ref()).with_classifier(config.query.classifier()?);
    let report = pipeline.submit(sql).await;

    if let Some(before) = before {
        let after = integrity::verify_unchanged(&before, database)?;
        info!("SHA-256 after run: {after}");
    }

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
