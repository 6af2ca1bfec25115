//! Console harness for the pdfmate core.
//!
//! A thin shim that drives the engine through the same event boundary a
//! real chat transport would use, with stdin as the inbound side and
//! stdout as the outbound side. Useful for exercising flows end-to-end
//! against the real external tools without a messenger account:
//!
//! ```text
//! > /compress
//! bot> Upload your file
//! > upload ./scan.pdf
//! bot> Please wait
//! bot> [document] compressed_scan.pdf
//! ```
//!
//! Input lines: `/command`, `upload <path>`, `tap <token>`, `cancel`, or
//! free text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use pdfmate::{BotConfig, BotError, ChatApi, ChatEvent, DocumentRef, Engine, InboundEvent, Keyboard};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdfmate", about = "Drive the pdfmate engine from the terminal")]
struct Cli {
    /// Directory staged inputs are downloaded into.
    #[arg(long, env = "FILE_INPUT_LOCATION", default_value = "input")]
    input_root: PathBuf,

    /// Directory transformation outputs are written to.
    #[arg(long, env = "FILE_OUTPUT_LOCATION", default_value = "output")]
    output_root: PathBuf,

    /// Cap on concurrently running external tools.
    #[arg(long, env = "WORKER_POOL_SIZE", default_value_t = 4)]
    workers: usize,

    /// Converter-service URL; falls back to local LibreOffice when unset.
    #[arg(long, env = "CONVERTER_URL")]
    converter_url: Option<String>,

    /// Default locale code.
    #[arg(long, env = "DEFAULT_LOCALE", default_value = "en")]
    locale: String,
}

/// Terminal-backed transport: prints outbound traffic, "downloads" an
/// upload by copying the local file named by its id.
struct ConsoleChat;

#[async_trait]
impl ChatApi for ConsoleChat {
    async fn send_message(
        &self,
        _chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), BotError> {
        println!("bot> {text}");
        if let Some(keyboard) = keyboard {
            for button in &keyboard.rows {
                println!("     [{}] (tap {})", button.label, button.token);
            }
        }
        Ok(())
    }

    async fn send_document(
        &self,
        _chat_id: i64,
        local_path: &Path,
        display_name: &str,
    ) -> Result<(), BotError> {
        println!("bot> [document] {display_name} ({})", local_path.display());
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<(), BotError> {
        tokio::fs::copy(file_id, dest)
            .await
            .map(|_| ())
            .map_err(|e| BotError::DownloadFailed {
                file_id: file_id.to_string(),
                detail: e.to_string(),
            })
    }
}

/// Parse one input line into a chat event.
fn parse_line(line: &str) -> Option<ChatEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(command) = line.strip_prefix('/') {
        return Some(ChatEvent::Command(command.to_string()));
    }
    if let Some(token) = line.strip_prefix("tap ") {
        return Some(ChatEvent::ButtonTap(token.trim().to_string()));
    }
    if let Some(path) = line.strip_prefix("upload ") {
        let path = PathBuf::from(path.trim());
        let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        return Some(ChatEvent::DocumentUploaded(DocumentRef {
            file_id: path.to_string_lossy().into_owned(),
            file_name,
            size_bytes,
        }));
    }
    Some(ChatEvent::TextMessage(line.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.input_root).context("creating input root")?;
    std::fs::create_dir_all(&cli.output_root).context("creating output root")?;

    let mut builder = BotConfig::builder()
        .input_root(cli.input_root.clone())
        .output_root(cli.output_root.clone())
        .workers(cli.workers)
        .default_locale(cli.locale.clone());
    if let Some(url) = cli.converter_url {
        builder = builder.converter_url(url);
    }
    let config = builder.build()?;

    let engine = Arc::new(Engine::new(Arc::new(ConsoleChat), config));
    let (tx, rx) = tokio::sync::mpsc::channel::<InboundEvent>(64);
    let dispatcher = tokio::spawn(pdfmate::dispatch::run(engine, rx));

    println!("pdfmate console — /topdf /compress /rotate /merge, upload <path>, tap <token>, cancel");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(event) = parse_line(&line) {
            tx.send(InboundEvent {
                chat_id: 1,
                user_id: 1,
                event,
            })
            .await
            .context("dispatcher gone")?;
        }
    }

    drop(tx);
    dispatcher.await?;
    Ok(())
}
