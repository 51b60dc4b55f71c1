use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rag_chatbot::server::{self, AppState};
use rag_chatbot::{IngestReport, Pipeline, Settings};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "ragbot")]
#[command(about = "Chat with your documents (PDF, DOCX, CSV, XLSX) using Ollama and Qdrant")]
struct Cli {
    /// Keep vectors in process memory instead of Qdrant.
    #[arg(long, global = true)]
    in_memory: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file or folder, then answer questions on stdin.
    Chat {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// Serve the upload-and-chat HTTP API.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command.unwrap_or(Commands::Chat { path: None }) {
        Commands::Chat { path } => chat(&settings, cli.in_memory, path).await,
        Commands::Serve { bind } => {
            let pipeline = Pipeline::connect(&settings, cli.in_memory).await?;
            let state = Arc::new(AppState::new(pipeline, settings.upload_dir.clone()));
            let bind = bind.unwrap_or_else(|| settings.bind_addr.clone());
            server::serve(&bind, state).await
        }
    }
}

async fn chat(settings: &Settings, in_memory: bool, path: Option<PathBuf>) -> Result<()> {
    println!("Welcome to the AI ChatBot. Type 'exit' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let path = match path {
        Some(p) => p,
        None => {
            prompt("Enter folder path to upload files: ").await?;
            match lines.next_line().await? {
                Some(line) => PathBuf::from(line.trim()),
                None => return Ok(()),
            }
        }
    };

    let pipeline = Pipeline::connect(settings, in_memory).await?;
    let report = pipeline.ingest(&path).await?;
    print_report(&report);

    loop {
        prompt("YOU: ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        let response = match pipeline.answer(query).await {
            Ok(response) => response,
            Err(e) => {
                println!("Bot Response: error: {e:#}");
                continue;
            }
        };
        println!("Bot Response: {response}");
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
    }
    Ok(())
}

async fn prompt(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!(
        "Loaded {} document(s); stored {} of {} chunk(s).",
        report.documents, report.chunks_stored, report.chunks_produced
    );
    for path in &report.skipped {
        println!("  skipped (unsupported format): {}", path.display());
    }
    for failure in &report.failures {
        println!("  failed: {}: {}", failure.path.display(), failure.error);
    }
}
