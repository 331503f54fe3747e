use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exam_results_engine::db::{self, PgStudentStore};
use exam_results_engine::leaderboard::LEADERBOARD_SIZE;
use exam_results_engine::report;
use exam_results_engine::stats::{EnhancedOptions, MIN_ESTABLISHMENT_SIZE};
use exam_results_engine::store::{self, LocationQuery, MemoryStudentStore};
use exam_results_engine::{
    CachedResults, ExamScope, ExamType, GroupOrder, ResultsService, ScopeFilter, SessionType,
    StatisticsOptions, StudentLookup, StudentStore,
};

#[derive(Parser)]
#[command(name = "exam-results")]
#[command(about = "Exam result rankings and statistics", long_about = None)]
struct Cli {
    /// Read results from a CSV file instead of DATABASE_URL
    #[arg(long, global = true)]
    from_csv: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = 5)]
    max_connections: u32,
    #[arg(long, global = true, default_value_t = 300)]
    cache_ttl_secs: u64,
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Total,
    Rate,
    Encounter,
}

impl From<Order> for GroupOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Total => GroupOrder::ByTotal,
            Order::Rate => GroupOrder::ByRate,
            Order::Encounter => GroupOrder::Encounter,
        }
    }
}

#[derive(Args)]
struct ScopeArgs {
    #[arg(long, default_value_t = 2025)]
    year: i32,
    #[arg(long, default_value = "BAC")]
    exam_type: ExamType,
    /// NORMALE or COMPLEMENTAIRE, BAC only
    #[arg(long)]
    session: Option<SessionType>,
}

impl ScopeArgs {
    fn scope(&self) -> anyhow::Result<ExamScope> {
        Ok(ExamScope::new(self.year, self.exam_type, self.session)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small sample population
    Seed,
    /// Import results from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank one student at establishment, region and national scope
    Rank {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        matricule: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        establishment: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        sub_region: Option<String>,
    },
    /// Aggregate statistics for a scope
    Stats {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        establishment: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        sessionnaire_threshold: Option<f64>,
        #[arg(long, value_enum, default_value_t = Order::Total)]
        order: Order,
    },
    /// Establishment podiums and rate-ordered breakdowns
    Enhanced {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = MIN_ESTABLISHMENT_SIZE)]
        min_establishment_size: usize,
    },
    /// Top admitted students
    Leaderboard {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = LEADERBOARD_SIZE)]
        limit: usize,
    },
    /// Regions and their establishments
    Regions {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn connect(max_connections: u32) -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance (or pass --from-csv)")?;

    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn open_store(cli: &Cli) -> anyhow::Result<Arc<dyn StudentStore>> {
    if let Some(path) = &cli.from_csv {
        let records = store::csv::read_records(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        info!(records = records.len(), "loaded results into memory");
        return Ok(Arc::new(MemoryStudentStore::from_records(records)));
    }
    let pool = connect(cli.max_connections).await?;
    Ok(Arc::new(PgStudentStore::new(pool)))
}

fn emit<T: Serialize>(format: Format, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Text => print!("{}", text(value)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Commands::InitDb => {
            let pool = connect(cli.max_connections).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
            return Ok(());
        }
        Commands::Seed => {
            let pool = connect(cli.max_connections).await?;
            let written = db::seed(&pool).await?;
            println!("Seeded {written} students.");
            return Ok(());
        }
        Commands::Import { csv } => {
            let pool = connect(cli.max_connections).await?;
            let written = db::import_csv(&pool, csv).await?;
            println!("Imported {written} students from {}.", csv.display());
            return Ok(());
        }
        _ => {}
    }

    let store = open_store(&cli).await?;
    let results = CachedResults::new(
        ResultsService::new(store),
        Duration::from_secs(cli.cache_ttl_secs),
    );

    match &cli.command {
        Commands::Rank {
            scope,
            matricule,
            name,
            establishment,
            region,
            sub_region,
        } => {
            let scope = scope.scope()?;
            let lookup = StudentLookup::choose(
                &scope,
                matricule.clone(),
                LocationQuery {
                    full_name: name.clone(),
                    establishment: establishment.clone(),
                    region: region.clone(),
                    sub_region: sub_region.clone(),
                },
            )?;
            let ranking = results.rank_student(&scope, &lookup).await?;
            emit(cli.format, &ranking, report::render_rank)?;
        }
        Commands::Stats {
            scope,
            establishment,
            region,
            section,
            sessionnaire_threshold,
            order,
        } => {
            let scope = scope.scope()?;
            let filter = ScopeFilter {
                establishment: establishment.clone(),
                region: region.clone(),
                section: section.clone().into(),
            };
            let options = StatisticsOptions {
                sessionnaire_threshold: *sessionnaire_threshold,
                order: (*order).into(),
            };
            let stats = results.statistics(&scope, &filter, &options).await?;
            emit(cli.format, &stats, report::render_statistics)?;
        }
        Commands::Enhanced {
            scope,
            min_establishment_size,
        } => {
            let scope = scope.scope()?;
            let options = EnhancedOptions {
                min_establishment_size: *min_establishment_size,
                ..EnhancedOptions::default()
            };
            let enhanced = results.enhanced_statistics(&scope, &options).await?;
            emit(cli.format, &enhanced, report::render_enhanced)?;
        }
        Commands::Leaderboard { scope, limit } => {
            let scope = scope.scope()?;
            let board = results.leaderboard(&scope, *limit).await?;
            emit(cli.format, &board, report::render_leaderboard)?;
        }
        Commands::Regions { scope } => {
            let scope = scope.scope()?;
            let directory = results.region_directory(&scope).await?;
            emit(cli.format, &directory, report::render_regions)?;
        }
        Commands::Report { scope, out } => {
            let scope = scope.scope()?;
            let stats = results
                .statistics(&scope, &ScopeFilter::all(), &StatisticsOptions::default())
                .await?;
            let enhanced = results
                .enhanced_statistics(&scope, &EnhancedOptions::default())
                .await?;
            let report = report::build_report(
                &scope,
                chrono::Utc::now().date_naive(),
                &stats,
                &enhanced,
            );
            std::fs::write(out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::InitDb | Commands::Seed | Commands::Import { .. } => {}
    }

    Ok(())
}
