// ABOUTME: CarbSense command-line interface
// ABOUTME: Lookup by name or barcode, history and favorites management
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use carbsense::cache::memory::InMemoryNutritionCache;
use carbsense::cache::NutritionCache;
use carbsense::config::AppConfig;
use carbsense::database::Database;
use carbsense::history::memory::InMemoryQueryHistory;
use carbsense::history::QueryHistory;
use carbsense::llm::gemini::GeminiClient;
use carbsense::llm::AiAnalyzer;
use carbsense::logging::LoggingConfig;
use carbsense::models::{DiabetesType, FoodResolution, HistoryEntry};
use carbsense::providers::http_client::{initialize_shared_client, shared_client};
use carbsense::providers::{BarcodeSource, OffClient, OfflineDataset, ResolveTier, UsdaClient};
use carbsense::services::FoodResolutionService;

#[derive(Parser)]
#[command(name = "carbsense")]
#[command(about = "Food nutrition lookup with diabetes suitability verdicts")]
#[command(version)]
struct Cli {
    /// SQLite database URL (defaults to a per-user data file)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Keep all state in memory, nothing persisted
    #[arg(long, global = true)]
    in_memory: bool,

    /// Load the offline dataset from a JSON file instead of the bundled one
    #[arg(long, global = true, value_name = "PATH")]
    offline_dataset: Option<PathBuf>,

    /// Emit results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a food by name and print its verdict
    Lookup {
        /// Food name to look up
        query: String,
        /// Diabetes type the verdict is tailored to
        #[arg(short = 't', long, default_value = "type_2")]
        diabetes_type: String,
    },
    /// Resolve a product barcode and print its verdict
    Barcode {
        /// Product barcode digits
        code: String,
        /// Diabetes type the verdict is tailored to
        #[arg(short = 't', long, default_value = "type_2")]
        diabetes_type: String,
    },
    /// List past lookups, favorites first
    History,
    /// List favorite lookups
    Favorites,
    /// Set or clear the favorite flag on a history entry
    Favorite {
        /// History entry id
        id: i64,
        /// Clear the flag instead of setting it
        #[arg(long)]
        unset: bool,
    },
    /// Delete all history entries
    ClearHistory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging.level = "debug".into();
    }
    logging.init()?;
    let config = AppConfig::from_env();

    initialize_shared_client(
        config.http_timeout.as_secs(),
        config.http_connect_timeout.as_secs(),
    );

    let (cache, history) = build_stores(&cli, &config).await?;
    let service = build_service(&cli, &config, cache, history).await?;

    match cli.command {
        Commands::Lookup {
            query,
            diabetes_type,
        } => {
            let diabetes_type: DiabetesType = diabetes_type.parse().map_err(|e| anyhow!("{e}"))?;
            let resolution = service
                .resolve_by_name(&query, diabetes_type)
                .await
                .map_err(|e| anyhow!("{e}"))?;
            print_resolution(&resolution, cli.json)?;
        }
        Commands::Barcode {
            code,
            diabetes_type,
        } => {
            let diabetes_type: DiabetesType = diabetes_type.parse().map_err(|e| anyhow!("{e}"))?;
            let resolution = service
                .resolve_by_barcode(&code, diabetes_type)
                .await
                .map_err(|e| anyhow!("{e}"))?;
            print_resolution(&resolution, cli.json)?;
        }
        Commands::History => {
            let entries = service.history().await.map_err(|e| anyhow!("{e}"))?;
            print_entries(&entries, cli.json)?;
        }
        Commands::Favorites => {
            let entries = service.favorites().await.map_err(|e| anyhow!("{e}"))?;
            print_entries(&entries, cli.json)?;
        }
        Commands::Favorite { id, unset } => {
            service
                .set_favorite(id, !unset)
                .await
                .map_err(|e| anyhow!("{e}"))?;
            println!(
                "Entry {id} {}",
                if unset { "unfavorited" } else { "favorited" }
            );
        }
        Commands::ClearHistory => {
            service.clear_history().await.map_err(|e| anyhow!("{e}"))?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Build the cache and history stores: SQLite unless --in-memory is set
async fn build_stores(
    cli: &Cli,
    config: &AppConfig,
) -> Result<(Arc<dyn NutritionCache>, Arc<dyn QueryHistory>)> {
    if cli.in_memory {
        debug!("using in-memory stores");
        return Ok((
            Arc::new(InMemoryNutritionCache::new(config.cache.clone())),
            Arc::new(InMemoryQueryHistory::new(config.history.clone())),
        ));
    }

    let database_url = match cli
        .database_url
        .clone()
        .or_else(|| config.database_url.clone())
    {
        Some(url) => url,
        None => default_database_url()?,
    };

    let db = Database::new(&database_url, config.cache.clone(), config.history.clone())
        .await
        .map_err(|e| anyhow!("{e}"))?;
    Ok((Arc::new(db.clone()), Arc::new(db)))
}

/// Per-user default database location under the platform data directory
fn default_database_url() -> Result<String> {
    let mut path: PathBuf = dirs::data_dir().ok_or_else(|| anyhow!("no data directory found"))?;
    path.push("carbsense");
    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    path.push("carbsense.db");
    Ok(format!("sqlite:{}", path.display()))
}

/// Assemble the resolution chain from configuration
async fn build_service(
    cli: &Cli,
    config: &AppConfig,
    cache: Arc<dyn NutritionCache>,
    history: Arc<dyn QueryHistory>,
) -> Result<FoodResolutionService> {
    let client = shared_client().clone();

    let off = OffClient::new(client.clone(), config.off_base_url.clone());
    let barcode_source: Arc<dyn BarcodeSource> = Arc::new(off.clone());

    let offline = match &cli.offline_dataset {
        Some(path) => OfflineDataset::from_path(path)
            .await
            .map_err(|e| anyhow!("{e}"))?,
        None => OfflineDataset::bundled().map_err(|e| anyhow!("{e}"))?,
    };
    let mut tiers: Vec<Box<dyn ResolveTier>> = vec![Box::new(offline), Box::new(off)];
    if let Some(api_key) = &config.fdc_api_key {
        tiers.push(Box::new(UsdaClient::new(
            client.clone(),
            config.usda_base_url.clone(),
            api_key.clone(),
        )));
    } else {
        debug!("FDC_API_KEY not set, USDA tier disabled");
    }

    let ai = match &config.gemini_api_key {
        Some(api_key) => AiAnalyzer::new(Arc::new(GeminiClient::new(
            client,
            config.gemini_base_url.clone(),
            api_key.clone(),
            config.gemini_model.clone(),
        ))),
        None => {
            debug!("GEMINI_API_KEY not set, AI fallback limited to static estimates");
            AiAnalyzer::without_model()
        }
    };

    Ok(
        FoodResolutionService::new(cache, history, tiers, Some(barcode_source), ai)
            .with_cache_ttl(config.cache.ttl),
    )
}

fn print_resolution(resolution: &FoodResolution, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resolution)?);
        return Ok(());
    }

    let item = &resolution.item;
    let decision = &resolution.decision;
    println!("{} [{}]", item.name, item.source);
    if let Some(brand) = &item.brand {
        println!("  Brand: {brand}");
    }
    println!(
        "  Per 100g: carbs {}, sugars {}, fiber {} (net carbs {:.1})",
        fmt_grams(item.carbs_per_100g),
        fmt_grams(item.sugars_per_100g),
        fmt_grams(item.fiber_per_100g),
        item.net_carbs_per_100g()
    );
    println!("  Verdict: {}", decision.category);
    println!("  Reason: {}", decision.reason);
    println!("  Portion: {}", decision.portion_text);
    if !decision.alternatives.is_empty() {
        println!("  Alternatives: {}", decision.alternatives.join(", "));
    }
    Ok(())
}

fn print_entries(entries: &[HistoryEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }
    for entry in entries {
        let star = if entry.is_favorite { "*" } else { " " };
        println!(
            "{star} [{}] {} ({}) {} - {}",
            entry.id, entry.display_name, entry.diabetes_type, entry.suitability, entry.created_at
        );
    }
    Ok(())
}

fn fmt_grams(value: Option<f64>) -> String {
    value.map_or_else(|| "?".to_owned(), |v| format!("{v:.1}g"))
}
