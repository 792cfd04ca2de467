mod api;
mod cli;
mod config;
#[cfg(test)]
mod fake;
mod forms;
mod interact;
mod models;
mod notify;
mod page;
mod render;
mod transcript;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelf", about = "Terminal client for the library management API")]
pub struct Args {
    #[arg(long, env = "LIBRARY_API_URL", help = "Library API base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(short = 'c', long = "command", value_name = "LINE", action = clap::ArgAction::Append, help = "Run a command and exit (repeatable)")]
    pub commands: Vec<String>,

    #[arg(long, help = "Do not write a session transcript")]
    pub no_log: bool,

    #[arg(long, help = "Session transcripts directory")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, help = "Debug output (print HTTP details and settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI flags win over every config layer
    if let Some(base_url) = &args.base_url {
        cfg.base_url = Some(base_url.clone());
    }
    if let Some(dir) = &args.log_dir {
        cfg.log.dir = Some(dir.clone());
    }
    if args.no_log {
        cfg.log.enabled = Some(false);
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        anyhow::bail!("Invalid configuration ({} problem(s))", errors.len());
    }

    if args.debug {
        eprintln!("[DEBUG] Base URL: {}", cfg.base_url());
        eprintln!("[DEBUG] Timeout: {:?}", cfg.timeout());
        eprintln!("[DEBUG] Notices dismissed after: {:?}", cfg.dismiss_after());
        eprintln!("[DEBUG] Page size: {:?}", cfg.lists.page_size);
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let log = if cfg.log_enabled() {
        let transcripts_dir = cfg.log_dir();
        std::fs::create_dir_all(&transcripts_dir).with_context(|| {
            format!(
                "Failed to create transcripts directory {}",
                transcripts_dir.display()
            )
        })?;
        let transcript_path = transcripts_dir.join(format!("{}.jsonl", session_id));
        let transcript =
            transcript::Transcript::new(&transcript_path, &session_id, cfg.base_url())?;
        transcript::ActivityLog::new(transcript)
    } else {
        transcript::ActivityLog::disabled()
    };
    log.session_start();

    let transport = api::HttpTransport::new(cfg.base_url(), cfg.timeout());
    let client = api::ApiClient::new(cfg.base_url(), Box::new(transport))
        .with_log(log.clone())
        .with_debug(args.debug);
    let notifier = notify::Notifier::new(cfg.dismiss_after());

    let mut page = page::Page::new(client, notifier, log)
        .with_page_size(cfg.lists.page_size)
        .with_plain_output(!args.commands.is_empty());
    page.load_all();

    let mut session = cli::Session::new(page, session_id);
    if args.commands.is_empty() {
        cli::run_repl(session)
    } else {
        cli::run_commands(&mut session, &args.commands)
    }
}
