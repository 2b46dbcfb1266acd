//! # Nutribot CLI (`nutribot`)
//!
//! The `nutribot` binary is the primary interface for the response
//! engine. It provides commands for one-shot chat, an interactive REPL,
//! knowledge-base management, corpus refresh, match statistics, and
//! starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! nutribot --config ./config/nutribot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nutribot chat "<message>"` | Generate a single reply |
//! | `nutribot repl` | Interactive chat session |
//! | `nutribot ingest <file>` | Load knowledge documents from a JSON file |
//! | `nutribot corpus refresh` | Force an immediate corpus reload |
//! | `nutribot stats` | Show intent match statistics |
//! | `nutribot clear` | Empty the knowledge base |
//! | `nutribot serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot reply with a caller profile
//! nutribot chat "what should I eat today?" --profile plan_type=weight_loss
//!
//! # Load documents (embeddings computed server-side if configured)
//! nutribot ingest ./data/nutrition_docs.json
//!
//! # Start the HTTP server
//! nutribot serve --config ./config/nutribot.toml
//! ```

mod analytics;
mod cascade;
mod classifier;
mod config;
mod corpus;
mod embedding;
mod error;
mod matcher;
mod models;
mod retrieval;
mod rules;
mod server;
mod similarity;
mod stats;
mod text;
mod vector_store;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::cascade::ResponseEngine;
use crate::models::{ChatContext, Document};

/// Nutribot CLI — a retrieval-augmented response engine for
/// nutrition-advice chat.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/nutribot.example.toml` for a full example. A missing
/// file falls back to defaults (seed corpus, memory-only store).
#[derive(Parser)]
#[command(
    name = "nutribot",
    about = "Nutribot — a retrieval-augmented response engine for nutrition-advice chat",
    version,
    long_about = "Nutribot answers messages through a confidence-driven fallback cascade: \
    knowledge-base retrieval over a cosine vector store, a profile-aware rule engine, an \
    optional learned classifier, lexical intent matching over a TTL-cached corpus, and an \
    always-available default."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/nutribot.toml`. Engine thresholds, corpus and
    /// store paths, embedding provider, and server settings are read from
    /// this file.
    #[arg(long, global = true, default_value = "./config/nutribot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Generate a single reply and print it.
    Chat {
        /// The user message.
        message: String,

        /// Profile fields as `key=value` pairs (e.g. `plan_type=weight_loss`).
        #[arg(long = "profile", value_parser = parse_key_val)]
        profile: Vec<(String, String)>,

        /// Session identifier; a random one is generated when omitted.
        #[arg(long)]
        session: Option<String>,
    },

    /// Interactive chat session on stdin/stdout.
    ///
    /// One session identifier is kept for the whole run, so match
    /// statistics and analytics group the turns together. Exit with
    /// `quit` or end-of-input.
    Repl {
        /// Profile fields as `key=value` pairs.
        #[arg(long = "profile", value_parser = parse_key_val)]
        profile: Vec<(String, String)>,
    },

    /// Load knowledge documents from a JSON file.
    ///
    /// The file holds an array of documents (`id`, `text`, optional
    /// `metadata` and `embedding`). Documents without embeddings are
    /// embedded with the configured provider.
    Ingest {
        /// Path to the JSON document file.
        file: PathBuf,
    },

    /// Manage the intent corpus.
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Show intent match statistics.
    Stats,

    /// Empty the knowledge base and delete its snapshot.
    Clear,

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// the chat and management API endpoints.
    Serve,
}

/// Corpus management subcommands.
#[derive(Subcommand)]
enum CorpusAction {
    /// Force an immediate corpus reload, resetting the cache TTL.
    Refresh,
}

/// Parse a `key=value` pair for `--profile` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn context_from(profile: Vec<(String, String)>, session: Option<String>) -> ChatContext {
    let mut ctx = ChatContext::for_session(
        session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    );
    ctx.profile.extend(profile);
    ctx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nutribot=info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Chat {
            message,
            profile,
            session,
        } => {
            let engine = ResponseEngine::from_config(&cfg)?;
            let ctx = context_from(profile, session);
            let reply = engine.generate_response(&message, &ctx, &[]).await?;
            println!("{}", reply.text);
            println!(
                "  [{} | confidence {:.2} | {} ms | {} document(s)]",
                reply.method.as_str(),
                reply.confidence,
                reply.elapsed_ms,
                reply.documents_found
            );
        }
        Commands::Repl { profile } => {
            let engine = ResponseEngine::from_config(&cfg)?;
            let ctx = context_from(profile, None);
            run_repl(&engine, &ctx).await?;
        }
        Commands::Ingest { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let docs: Vec<Document> = serde_json::from_str(&content)
                .with_context(|| format!("invalid document JSON in {}", file.display()))?;

            let engine = ResponseEngine::from_config(&cfg)?;
            let stored = engine.ingest(docs).await?;
            println!("Stored {} document(s).", stored);
        }
        Commands::Corpus { action } => match action {
            CorpusAction::Refresh => {
                let engine = ResponseEngine::from_config(&cfg)?;
                let corpus = engine.refresh_corpus_cache().await?;
                println!("Corpus refreshed: {} intent(s).", corpus.intents.len());
            }
        },
        Commands::Stats => {
            let engine = ResponseEngine::from_config(&cfg)?;
            let rows = engine.match_statistics();
            if rows.is_empty() {
                println!("No matches recorded yet.");
            } else {
                println!("{:<24} {:>8} {:>12}", "intent", "matches", "avg conf");
                for row in rows {
                    println!(
                        "{:<24} {:>8} {:>12.2}",
                        row.intent_name, row.match_count, row.avg_confidence
                    );
                }
            }
        }
        Commands::Clear => {
            let engine = ResponseEngine::from_config(&cfg)?;
            engine.clear_knowledge_base().await?;
            println!("Knowledge base cleared.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Line-oriented REPL. Invalid input is reported and the session continues.
async fn run_repl(engine: &ResponseEngine, ctx: &ChatContext) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut history = Vec::new();

    println!("Nutribot ready. Type a question, or 'quit' to exit.");
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("quit") || message.eq_ignore_ascii_case("exit") {
            break;
        }

        match engine.generate_response(message, ctx, &history).await {
            Ok(reply) => {
                println!("{}", reply.text);
                history.push(models::ChatMessage {
                    role: "user".to_string(),
                    text: message.to_string(),
                });
                history.push(models::ChatMessage {
                    role: "assistant".to_string(),
                    text: reply.text,
                });
            }
            Err(e) => println!("Cannot answer that: {}", e),
        }
    }

    Ok(())
}
