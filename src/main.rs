use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use literacy_fidelity_engine::logging::{self, Verbosity};
use literacy_fidelity_engine::rate_limiter::RateLimiter;
use literacy_fidelity_engine::{
    db, report, Engine, EngineConfig, EngineReport, ReportPeriod, Scope, Snapshot,
};

#[derive(Parser)]
#[command(name = "fidelity-engine")]
#[command(about = "Fidelity scoring and performance rollups for literacy program field data", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,
    /// JSON engine config (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ScopeArgs {
    /// country, region, district, sub-county or school
    #[arg(long, default_value = "country")]
    level: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    since: Option<NaiveDate>,
    #[arg(long)]
    until: Option<NaiveDate>,
    /// Cost period label, e.g. 2026 or 2026-Q1
    #[arg(long)]
    period: Option<String>,
    /// Read records and costs from a JSON snapshot instead of Postgres
    #[arg(long)]
    snapshot: Option<PathBuf>,
    #[arg(long, default_value = "cli")]
    caller: String,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl ScopeArgs {
    fn scope(&self) -> anyhow::Result<Scope> {
        Ok(Scope::parse(&self.level, self.name.as_deref())?)
    }

    fn period(&self) -> ReportPeriod {
        ReportPeriod {
            label: self.period.clone(),
            start: self.since,
            end: self.until,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import activity records or cost entries from CSV
    #[command(group(
        ArgGroup::new("source")
            .args(["records", "costs"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        records: Option<PathBuf>,
        #[arg(long)]
        costs: Option<PathBuf>,
    },
    /// Hierarchical scorecard rollup
    Tree(ScopeArgs),
    /// Composite fidelity score with child rankings
    Fidelity(ScopeArgs),
    /// Baseline to endline learning gains
    Gains(ScopeArgs),
    /// Cost per school, teacher and learner
    Cost(ScopeArgs),
    /// Completeness, outliers and duplicates
    Quality(ScopeArgs),
    /// Write a markdown report covering every view
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid snapshot {}", path.display()))
}

async fn analyze(engine: &Engine, args: &ScopeArgs) -> anyhow::Result<EngineReport> {
    let scope = args.scope()?;
    let period = args.period();
    let snapshot = match &args.snapshot {
        Some(path) => read_snapshot(path)?,
        None => {
            let pool = connect().await?;
            Snapshot {
                records: db::fetch_records(&pool, &scope, &period).await?,
                costs: db::fetch_cost_entries(&pool, &scope, &period).await?,
            }
        }
    };
    Ok(engine
        .analyze_for(&args.caller, &scope, &period, &snapshot)
        .await?)
}

fn emit<T: Serialize>(json: bool, value: &T, render: impl FnOnce(&mut String, &T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        let mut output = String::new();
        render(&mut output, value);
        print!("{output}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet));

    let config = EngineConfig::load(cli.config.as_deref())?;
    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let engine = Engine::new(config).with_rate_limiter(limiter);

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&connect().await?).await?;
            println!("Seed data inserted ({inserted} rows).");
        }
        Commands::Import { records, costs } => {
            let pool = connect().await?;
            if let Some(path) = records {
                let inserted = db::import_records_csv(&pool, &path).await?;
                println!("Inserted {inserted} records from {}.", path.display());
            }
            if let Some(path) = costs {
                let inserted = db::import_costs_csv(&pool, &path).await?;
                println!("Inserted {inserted} cost entries from {}.", path.display());
            }
        }
        Commands::Tree(args) => {
            let result = analyze(&engine, &args).await?;
            emit(args.json, &result.tree, |out, tree| report::render_tree(out, tree, 0))?;
        }
        Commands::Fidelity(args) => {
            let result = analyze(&engine, &args).await?;
            emit(args.json, &result.fidelity, report::render_fidelity)?;
        }
        Commands::Gains(args) => {
            let result = analyze(&engine, &args).await?;
            emit(args.json, &result.gains, report::render_gains)?;
        }
        Commands::Cost(args) => {
            let result = analyze(&engine, &args).await?;
            emit(args.json, &result.cost, report::render_cost)?;
        }
        Commands::Quality(args) => {
            let result = analyze(&engine, &args).await?;
            emit(args.json, &result.quality, report::render_quality)?;
        }
        Commands::Report { scope, out } => {
            let result = analyze(&engine, &scope).await?;
            let markdown = report::build_report(&result);
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
