//! # Ragmill CLI (`ragmill`)
//!
//! Commands for database initialization, document ingestion, vector
//! search, and retrieval-augmented question answering.
//!
//! ```bash
//! ragmill --config ./config/ragmill.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragmill init` | Create the SQLite database and run schema migrations |
//! | `ragmill ingest <path>` | Extract, chunk, embed, and store documents |
//! | `ragmill search "<query>"` | Print the nearest stored chunks |
//! | `ragmill ask "<message>"` | Answer with retrieved context and history |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ragmill::chat::{run_ask, AskOptions};
use ragmill::config::load_config;
use ragmill::embedding::create_embedder;
use ragmill::generate::GenerationClient;
use ragmill::ingest::{run_ingest, IngestOptions};
use ragmill::retrieve::retrieve;
use ragmill::store::SqliteStore;
use ragmill::{db, migrate};

/// Ragmill — a local-first retrieval-augmented generation pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ragmill.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ragmill",
    about = "Ragmill — document ingestion and retrieval-augmented generation over SQLite",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragmill.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest a file or directory.
    ///
    /// Extracts text per format (PDF, DOCX, plain text), chunks it,
    /// embeds each chunk, and stores the vectors. Unreadable or corrupt
    /// documents are skipped with a warning; re-ingesting unchanged
    /// content inserts nothing new.
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,
    },

    /// Print the stored chunks nearest to a query.
    Search {
        /// The query string.
        query: String,

        /// Number of results (defaults to retrieval.k from config).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Answer a question using retrieved context and conversation history.
    ///
    /// Requires a `[generation]` section in the config.
    Ask {
        /// The user message.
        message: String,

        /// Conversation id — history is kept separately per user.
        #[arg(long, default_value_t = 0)]
        user: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ragmill=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Ingest { path } => {
            let store = SqliteStore::new(pool.clone(), cfg.embedding.dims);
            let embedder = create_embedder(&cfg.embedding)?;
            let report = run_ingest(&store, embedder, &path, &IngestOptions::from(&cfg)).await?;
            println!(
                "Ingested {} documents ({} skipped): {} chunks, {} embedded, {} failed, {} newly stored",
                report.documents,
                report.skipped_documents,
                report.chunks,
                report.embedded,
                report.failed_chunks,
                report.inserted
            );
        }
        Commands::Search { query, k } => {
            let store = SqliteStore::new(pool.clone(), cfg.embedding.dims);
            let embedder = create_embedder(&cfg.embedding)?;
            let k = k.unwrap_or(cfg.retrieval.k);
            let results = retrieve(&store, embedder.as_ref(), &query, k).await;
            if results.is_empty() {
                println!("No results.");
            } else {
                for (i, content) in results.iter().enumerate() {
                    println!("{}. {}", i + 1, content);
                }
            }
        }
        Commands::Ask { message, user } => {
            let generation = cfg.generation.as_ref().ok_or_else(|| {
                anyhow::anyhow!("ask requires a [generation] section in the config")
            })?;
            let store = SqliteStore::new(pool.clone(), cfg.embedding.dims);
            let embedder = create_embedder(&cfg.embedding)?;
            let client = GenerationClient::new(generation)?;
            let options = AskOptions {
                user_id: user,
                k: cfg.retrieval.k,
                history_window: cfg.history.window,
            };
            let reply = run_ask(
                &pool,
                &store,
                embedder.as_ref(),
                &client,
                &options,
                &message,
            )
            .await?;
            println!("{}", reply);
        }
    }

    Ok(())
}
