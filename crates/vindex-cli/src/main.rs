//! vindex CLI - Command-line interface for the vector index.
//!
//! The in-memory provider only lives for one invocation; point the config at
//! Pinecone or ChromaDB for an index that persists across runs.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use vindex_core::{AppConfig, Filter};
use vindex_mcp::{DeleteSourceParams, IndexContentParams, IndexToolServer, QueryParams};

/// vindex - Multi-backend vector index for RAG tooling
#[derive(Parser)]
#[command(name = "vindex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (default: ~/.config/vindex/config.toml, then ./vindex.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file or directory
    Index {
        /// Path to file or directory to index
        path: PathBuf,

        /// Recursively process directories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Query the index
    Query {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Restrict results to one source
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Show index status
    Status,

    /// Delete every chunk of one source
    Delete {
        /// Source identifier used at index time
        source: String,
    },

    /// List all indexed chunk ids
    Ids,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_default()?,
    };

    let server = IndexToolServer::create(config.vector_db.clone()).await?;

    match cli.command {
        Commands::Index { path, recursive } => {
            index(&server, &path, recursive).await?;
        }
        Commands::Query {
            query,
            top_k,
            source,
        } => {
            run_query(&server, &query, top_k, source).await;
        }
        Commands::Status => {
            print_result(server.status().await);
        }
        Commands::Delete { source } => {
            print_result(server.delete_source(DeleteSourceParams { source }).await);
        }
        Commands::Ids => {
            print_result(server.list_ids().await);
        }
    }

    Ok(())
}

async fn index(
    server: &IndexToolServer,
    path: &PathBuf,
    recursive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = collect_files(path, recursive)?;

    if files.is_empty() {
        println!("No supported files found at: {}", path.display());
        return Ok(());
    }

    println!("Indexing {} file(s)...", files.len());

    let mut success_count = 0;
    let mut error_count = 0;

    for file_path in files {
        let content = match fs::read_to_string(&file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("  Error reading {}: {}", file_path.display(), e);
                error_count += 1;
                continue;
            }
        };

        let params = IndexContentParams {
            source: file_path.display().to_string(),
            content,
            language: None,
        };

        let result = server.index_content(params).await;
        if result.success {
            println!("  {} - OK", file_path.display());
            success_count += 1;
        } else {
            eprintln!("  {} - Error: {}", file_path.display(), result.message);
            error_count += 1;
        }
    }

    println!(
        "\nComplete: {} succeeded, {} failed",
        success_count, error_count
    );

    Ok(())
}

async fn run_query(server: &IndexToolServer, query: &str, top_k: usize, source: Option<String>) {
    let filter = source.map(|s| {
        let mut filter = Filter::new();
        filter.insert("source".to_string(), json!(s));
        filter
    });

    let params = QueryParams {
        query: query.to_string(),
        top_k,
        filter,
    };

    print_result(server.query(params).await);
}

fn print_result(result: vindex_mcp::ToolResult) {
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

fn collect_files(path: &PathBuf, recursive: bool) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();

    if path.is_file() {
        if is_supported_file(path) {
            files.push(path.clone());
        }
    } else if path.is_dir() {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();

            if entry_path.is_file() && is_supported_file(&entry_path) {
                files.push(entry_path);
            } else if entry_path.is_dir() && recursive {
                files.extend(collect_files(&entry_path, recursive)?);
            }
        }
    }

    Ok(files)
}

fn is_supported_file(path: &PathBuf) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(
        ext,
        "rs" | "py"
            | "js"
            | "ts"
            | "tsx"
            | "jsx"
            | "go"
            | "md"
            | "txt"
            | "json"
            | "yaml"
            | "yml"
            | "toml"
    )
}
