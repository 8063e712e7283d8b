use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use talentbase::config::Config;
use talentbase::enrich::{CompanyDetector, HttpCompanyDetector, NoopDetector};
use talentbase::etl::importer::{FileReport, Importer};
use talentbase::logging::init_logging;
use talentbase::server::{self, AppState};
use talentbase::storage::{DatabaseStore, InMemoryStore, ProfileStore};

#[derive(Parser)]
#[command(name = "talentbase")]
#[command(about = "Profile spreadsheet importer with a search API")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Listen port (overrides TALENTBASE_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Keep documents in memory instead of SQLite (development only)
        #[arg(long)]
        in_memory: bool,
    },
    /// Import a single CSV/Excel file
    Import {
        /// Path of the file to import
        file: PathBuf,
        /// Category label applied to every imported record
        #[arg(long)]
        category: Option<String>,
    },
    /// Import every CSV/Excel file in a folder
    ImportFolder {
        /// Folder holding the exported spreadsheets
        folder: PathBuf,
        /// Category label; derived from file names when omitted
        #[arg(long)]
        category: Option<String>,
    },
}

fn build_detector(config: &Config) -> Arc<dyn CompanyDetector> {
    match &config.company_inference_url {
        Some(url) => {
            info!("company inference enabled via {url}");
            Arc::new(HttpCompanyDetector::new(
                url.clone(),
                config.company_inference_token.clone(),
            ))
        }
        None => Arc::new(NoopDetector),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    init_logging();

    let config = Config::from_env();
    let detector = build_detector(&config);

    match cli.command {
        Commands::Serve { port, in_memory } => {
            let store: Arc<dyn ProfileStore> = if in_memory {
                Arc::new(InMemoryStore::new())
            } else {
                Arc::new(DatabaseStore::open(&config.database_path)?)
            };
            let state = AppState { store, detector };
            server::run(state, port.unwrap_or(config.port)).await?;
        }
        Commands::Import { file, category } => {
            let store = Arc::new(DatabaseStore::open(&config.database_path)?);
            let importer = Importer::new(store, detector);
            let stats = importer.import_file(&file, category.as_deref()).await?;
            println!(
                "Imported {}: inserted {}, updated {}",
                file.display(),
                stats.inserted,
                stats.updated
            );
        }
        Commands::ImportFolder { folder, category } => {
            let store = Arc::new(DatabaseStore::open(&config.database_path)?);
            let importer = Importer::new(store, detector);
            let results = importer.import_folder(&folder, category.as_deref()).await?;
            if results.is_empty() {
                println!(
                    "No files were processed. Make sure your files have a .csv, .xlsx or .xls extension."
                );
            }
            for (file_name, report) in &results {
                match report {
                    FileReport::Imported(stats) => println!(
                        "  - {file_name} (Category: {}): Inserted {}, Updated {}",
                        stats.category.as_deref().unwrap_or("None"),
                        stats.inserted,
                        stats.updated
                    ),
                    FileReport::Failed { error } => {
                        println!("  - {file_name}: FAILED ({error})")
                    }
                }
            }
        }
    }

    Ok(())
}
