//! folio CLI
//!
//! Commands:
//!   chat    - Interactive Q&A over documents (default)
//!   extract - Print the knowledge base built from documents
//!   ask     - Ask a single question and exit
//!   init    - Configure the answering backend
//!   info    - Show configuration

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use folio::{
    answerer_from_config, load_files, run_init, run_repl, show_status, show_welcome,
    ChatSession, Config, Dispatcher, DocumentFormat, InitResult, KnowledgeBase, ProgressTracker,
    SubmitOutcome,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Ask questions about your PDF, DOCX and text documents")]
#[command(version)]
struct Cli {
    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat about documents (loads the given files or directories first)
    Chat {
        paths: Vec<PathBuf>,
    },

    /// Extract documents and print the knowledge base
    Extract {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask one question about documents
    Ask {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// The question
        #[arg(short, long)]
        question: String,
    },

    /// Run initialization flow (re-configure the answering backend)
    Init,

    /// Show configuration
    Info,
}

/// Log to stderr so it never mixes with chat output on stdout.
fn init_tracing(verbose: bool) {
    let default = if verbose { "folio=debug" } else { "folio=warn" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => run_chat(&[]).await,
        Some(Commands::Chat { paths }) => run_chat(&paths).await,
        Some(Commands::Extract { paths, output }) => run_extract(&paths, output).await,
        Some(Commands::Ask { paths, question }) => run_ask(&paths, &question).await,
        Some(Commands::Init) => {
            let existing = Config::load()?;
            if existing.is_none() {
                show_welcome();
            }
            match run_init(existing.as_ref())? {
                InitResult::Configured(_) => {
                    println!("{} Saved {}", "✓".green(), Config::path()?.display());
                }
                InitResult::Cancelled => println!("Cancelled. Configuration unchanged."),
            }
            Ok(())
        }
        Some(Commands::Info) => {
            show_status(&Config::load_or_default()?);
            Ok(())
        }
    }
}

async fn run_chat(paths: &[PathBuf]) -> Result<()> {
    if !Config::exists() {
        show_welcome();
        if let InitResult::Cancelled = run_init(None)? {
            println!("Continuing with default settings.");
        }
    }

    let config = Config::load_or_default()?;
    let answerer = answerer_from_config(&config.answering)
        .context("Failed to set up the answering backend")?;
    let dispatcher = Dispatcher::from_config(&config.pdf);

    run_repl(dispatcher, answerer, paths).await
}

async fn build_knowledge(paths: &[PathBuf], dispatcher: &Dispatcher) -> Result<KnowledgeBase> {
    let files = load_files(paths)?;
    if files.is_empty() {
        bail!(
            "No supported documents found ({})",
            DocumentFormat::supported_extensions().join(", ")
        );
    }

    let progress = ProgressTracker::new(files.len());
    let kb = KnowledgeBase::build_with_progress(&files, dispatcher, &progress)
        .await
        .inspect_err(|_| progress.abandon())?;

    eprintln!("{} {}", "✓".green(), kb.summary());
    Ok(kb)
}

async fn run_extract(paths: &[PathBuf], output: Option<PathBuf>) -> Result<()> {
    let config = Config::load_or_default()?;
    let dispatcher = Dispatcher::from_config(&config.pdf);
    let kb = build_knowledge(paths, &dispatcher).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, kb.text())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Wrote {}", "✓".green(), path.display());
        }
        None => println!("{}", kb.text()),
    }
    Ok(())
}

async fn run_ask(paths: &[PathBuf], question: &str) -> Result<()> {
    let config = Config::load_or_default()?;
    let answerer = answerer_from_config(&config.answering)
        .context("Failed to set up the answering backend")?;
    let dispatcher = Dispatcher::from_config(&config.pdf);

    let files = load_files(paths)?;
    let mut session = ChatSession::new();
    session
        .process(&files, &dispatcher)
        .await
        .context("Failed to process the documents")?;

    match session.submit(question, answerer.as_ref()).await {
        SubmitOutcome::Answered(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        SubmitOutcome::Apologized(reply) => bail!("{}", reply.content),
        SubmitOutcome::Rejected(reason) => bail!("{}", reason.message()),
    }
}
