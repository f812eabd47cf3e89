use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{info, warn};

use devspec::config::Settings;
use devspec::db::{self, RecordStore, SqliteStore};
use devspec::model::{Action, DeviceQuery, Origin};
use devspec::sources::{SourceLoader, SourceLocation};
use devspec::upsert::{for_display, Pipeline};
use devspec::SpecSource;

#[derive(Parser)]
#[command(name = "devspec", about = "Merge official and unofficial device specs into one record")]
struct Cli {
    /// SQLite database (overrides DEVSPEC_DB_PATH / devspec.toml)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DeviceArgs {
    /// Brand hint, e.g. "Samsung"
    #[arg(long, default_value = "")]
    brand: String,
    /// Model hint, e.g. "Galaxy A34"
    #[arg(long, default_value = "")]
    model: String,
    /// Official payload: JSON file or URL template with {brand}/{model}
    #[arg(long)]
    official: Option<String>,
    /// Unofficial payload: JSON file or URL template with {brand}/{model}
    #[arg(long)]
    unofficial: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the devices table
    Init,
    /// Load both origins, merge, and upsert one device
    Ingest {
        #[command(flatten)]
        device: DeviceArgs,
        /// Update this row instead of looking up by brand/model
        #[arg(long)]
        id: Option<i64>,
    },
    /// Merge and enrich without writing anything
    Preview {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Ingest every entry of a JSON worklist, one after another
    Batch {
        /// JSON array of {brand, model, official?, unofficial?, id?}
        worklist: PathBuf,
    },
    /// Print a stored device
    Show {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Record counts
    Stats,
    /// List (brand, model) pairs stored more than once
    Duplicates,
}

#[derive(Debug, Deserialize)]
struct WorkItem {
    #[serde(default)]
    brand: String,
    #[serde(default)]
    model: String,
    official: Option<String>,
    unofficial: Option<String>,
    id: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Init => {
            open_store(&settings)?;
            println!("Schema ready at {}", settings.db_path.display());
            Ok(())
        }
        Commands::Ingest { device, id } => {
            let pipeline = Pipeline::new(open_store(&settings)?, &settings.heuristics)?;
            let loader = SourceLoader::new();
            let query = DeviceQuery::new(&device.brand, &device.model);
            let (official, unofficial) =
                load_origins(&loader, device.official.as_deref(), device.unofficial.as_deref(), &query).await;
            let outcome = pipeline.run(id, &official, &unofficial, &query)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Commands::Preview { device } => {
            // never opened: preview must not create or touch the database
            let pipeline = Pipeline::new(NoStore, &settings.heuristics)?;
            let loader = SourceLoader::new();
            let query = DeviceQuery::new(&device.brand, &device.model);
            let (official, unofficial) =
                load_origins(&loader, device.official.as_deref(), device.unofficial.as_deref(), &query).await;
            match pipeline.prepare(&official, &unofficial, &query) {
                Some(prepared) => println!("{}", serde_json::to_string_pretty(&prepared)?),
                None => println!("No data from either origin."),
            }
            Ok(())
        }
        Commands::Batch { worklist } => run_batch(&settings, &worklist).await,
        Commands::Show { id, brand, model } => {
            let store = open_store(&settings)?;
            let row = match (id, brand, model) {
                (Some(id), _, _) => store.find_by_id(id)?,
                (None, Some(brand), Some(model)) => store.find_by_brand_model(&brand, &model)?,
                _ => bail!("pass --id, or both --brand and --model"),
            };
            match row {
                Some(row) => println!("{}", serde_json::to_string_pretty(&for_display(row))?),
                None => println!("No such device."),
            }
            Ok(())
        }
        Commands::Stats => {
            let store = open_store(&settings)?;
            let s = db::get_stats(store.connection())?;
            println!("Total:      {}", s.total);
            println!("Unresolved: {}", s.unresolved);
            if !s.by_brand.is_empty() {
                println!("\n{:<20} | {:>6}", "Brand", "Rows");
                println!("{}", "-".repeat(29));
                for (brand, count) in &s.by_brand {
                    println!("{:<20} | {:>6}", truncate(brand, 20), count);
                }
            }
            Ok(())
        }
        Commands::Duplicates => {
            let store = open_store(&settings)?;
            let groups = db::find_duplicates(store.connection())?;
            if groups.is_empty() {
                println!("No duplicate (brand, model) pairs.");
                return Ok(());
            }
            for g in &groups {
                let ids: Vec<String> = g.ids.iter().map(|id| id.to_string()).collect();
                println!("{} {}: ids {}", g.brand, g.model, ids.join(", "));
            }
            println!("\n{} duplicated pairs", groups.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_store(settings: &Settings) -> Result<SqliteStore> {
    let store = SqliteStore::open(&settings.db_path)
        .with_context(|| format!("Failed to open {}", settings.db_path.display()))?;
    store.init_schema()?;
    Ok(store)
}

async fn load_origins(
    loader: &SourceLoader,
    official: Option<&str>,
    unofficial: Option<&str>,
    query: &DeviceQuery,
) -> (SpecSource, SpecSource) {
    let official = official.map(SourceLocation::parse);
    let unofficial = unofficial.map(SourceLocation::parse);
    tokio::join!(
        loader.load(Origin::Official, official.as_ref(), query),
        loader.load(Origin::Unofficial, unofficial.as_ref(), query),
    )
}

async fn run_batch(settings: &Settings, worklist: &std::path::Path) -> Result<()> {
    let text = tokio::fs::read_to_string(worklist)
        .await
        .with_context(|| format!("Failed to read {}", worklist.display()))?;
    let items: Vec<WorkItem> =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", worklist.display()))?;
    if items.is_empty() {
        println!("Worklist is empty.");
        return Ok(());
    }

    let pipeline = Pipeline::new(open_store(settings)?, &settings.heuristics)?;
    let loader = SourceLoader::new();

    let pb = ProgressBar::new(items.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut counts = BatchCounts::default();
    for item in &items {
        let query = DeviceQuery::new(&item.brand, &item.model);
        let (official, unofficial) =
            load_origins(&loader, item.official.as_deref(), item.unofficial.as_deref(), &query).await;
        match pipeline.run(item.id, &official, &unofficial, &query) {
            Ok(outcome) => match outcome.action {
                Action::Insert => counts.inserted += 1,
                Action::Update => counts.updated += 1,
                Action::NoOp => counts.skipped += 1,
            },
            Err(e) => {
                warn!(brand = %item.brand, model = %item.model, "{:#}", anyhow::Error::from(e));
                counts.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        inserted = counts.inserted,
        updated = counts.updated,
        skipped = counts.skipped,
        failed = counts.failed,
        "batch finished"
    );
    counts.print(items.len());
    Ok(())
}

#[derive(Default)]
struct BatchCounts {
    inserted: usize,
    updated: usize,
    skipped: usize,
    failed: usize,
}

impl BatchCounts {
    fn print(&self, total: usize) {
        println!(
            "{} items: {} inserted, {} updated, {} skipped, {} failed.",
            total, self.inserted, self.updated, self.skipped, self.failed,
        );
    }
}

/// Store for `preview`, which never reaches persistence.
struct NoStore;

impl RecordStore for NoStore {
    fn find_by_brand_model(
        &self,
        _: &str,
        _: &str,
    ) -> Result<Option<devspec::DeviceRecord>, devspec::StoreError> {
        Ok(None)
    }
    fn find_by_id(&self, _: i64) -> Result<Option<devspec::DeviceRecord>, devspec::StoreError> {
        Ok(None)
    }
    fn insert(&self, _: &db::NewDevice) -> Result<devspec::DeviceRecord, devspec::StoreError> {
        Err(unavailable(devspec::error::StoreOp::Insert))
    }
    fn update(&self, _: i64, _: &db::DeviceChanges) -> Result<devspec::DeviceRecord, devspec::StoreError> {
        Err(unavailable(devspec::error::StoreOp::Update))
    }
}

fn unavailable(op: devspec::error::StoreOp) -> devspec::StoreError {
    devspec::StoreError::Unavailable {
        op,
        message: "preview does not write".into(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
