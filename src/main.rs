use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqna::{api, config, logging, processing::PipelineService};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "docqna",
    about = "Question answering over PDF folders stored in Google Drive"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Ingest every PDF of a Drive folder and print the counters.
    Ingest {
        /// Drive folder identifier.
        folder_id: String,
    },
    /// Answer a question from the stored passages.
    Ask {
        /// Question text.
        question: String,
    },
    /// Delete every stored record.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();

    let service = PipelineService::new()
        .await
        .context("failed to initialize pipeline")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(service).await,
        Command::Ingest { folder_id } => {
            let outcome = service.ingest(&folder_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::Ask { question } => {
            let answer = service.ask(&question).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
            Ok(())
        }
        Command::Clear => {
            service.clear().await?;
            println!("{}", serde_json::to_string_pretty(&clear_report())?);
            Ok(())
        }
    }
}

fn clear_report() -> serde_json::Value {
    serde_json::json!({ "success": true, "message": "Collection cleared" })
}

async fn serve(service: PipelineService) -> Result<()> {
    use std::net::Ipv4Addr;

    let port = config::get_config().server_port;
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!("RAG API running on http://0.0.0.0:{}", port);

    let app = api::create_router(Arc::new(service));
    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}
