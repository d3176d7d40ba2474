//! # Havn Cube Estimate CLI
//!
//! Terminal front end for the estimate engine: list, inspect, edit, delete
//! and print estimates stored in a local JSON ledger or behind the estimate
//! REST API.

mod backend;
mod draft_editor;
mod format;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use estimate_core::editor::EstimateEditor;
use estimate_core::errors::EstimateError;
use estimate_core::settings::EstimateSettings;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backend::{Backend, Renderer};
use draft_editor::Outcome;

#[derive(Parser)]
#[command(name = "estimate")]
#[command(about = "Interior design estimates: quantities, totals and printable PDFs.")]
#[command(version)]
struct Cli {
    /// Settings file (TOML) with tax rate, numbering and letterhead
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Local estimate ledger (JSON)
    #[arg(short, long, global = true, default_value = "estimates.json")]
    store: PathBuf,

    /// Base URL of the estimate API; replaces the local ledger
    #[arg(short, long, global = true, conflicts_with = "store")]
    remote: Option<String>,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List estimates, newest first
    List,
    /// Show one estimate with its items and totals
    Show {
        id: String,
        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an estimate with the line editor (commands on stdin)
    New,
    /// Edit an existing estimate with the line editor
    Edit { id: String },
    /// Delete an estimate
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Write the estimate document as PDF
    Pdf {
        id: String,
        /// Directory for the PDF file
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

type Editor = EstimateEditor<Backend, Renderer>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        if cli.verbose {
            if let Some(estimate_err) = e.downcast_ref::<EstimateError>() {
                if let Ok(json) = serde_json::to_string_pretty(estimate_err) {
                    eprintln!();
                    eprintln!("Error JSON:");
                    eprintln!("{}", json);
                }
            }
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "estimate_core=debug,estimate=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => EstimateSettings::load(path)?,
        None => EstimateSettings::default(),
    };
    let (store, renderer) = backend::connect(cli.store.clone(), cli.remote.as_deref(), &settings)?;
    let mut editor = EstimateEditor::new(store, renderer, settings);

    match &cli.command {
        Commands::List => list_command(&mut editor).await,
        Commands::Show { id, json } => show_command(&mut editor, id, *json).await,
        Commands::New => {
            editor.open_new(Local::now().date_naive());
            edit_loop(&mut editor).await
        }
        Commands::Edit { id } => {
            editor.open_existing(id).await?;
            edit_loop(&mut editor).await
        }
        Commands::Delete { id, yes } => delete_command(&mut editor, id, *yes).await,
        Commands::Pdf { id, out } => pdf_command(&mut editor, id, out).await,
    }
}

async fn list_command(editor: &mut Editor) -> Result<()> {
    let symbol = editor.settings().currency_symbol.clone();
    let estimates = editor.refresh().await?;
    print!("{}", format::estimate_list(estimates, &symbol));
    Ok(())
}

async fn show_command(editor: &mut Editor, id: &str, json: bool) -> Result<()> {
    let estimate = editor.fetch(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        print!("{}", format::persisted_estimate(&estimate, &editor.settings().currency_symbol));
    }
    Ok(())
}

async fn edit_loop(editor: &mut Editor) -> Result<()> {
    let stdin = io::stdin();
    match draft_editor::run(editor, stdin.lock()).await? {
        Outcome::Saved { id, number } => info!(%id, %number, "editor finished with save"),
        Outcome::Discarded => info!("editor finished without saving"),
    }
    Ok(())
}

async fn delete_command(editor: &mut Editor, id: &str, yes: bool) -> Result<()> {
    // a failed listing only costs the friendly label
    let _ = editor.refresh().await;
    let confirmation = editor.request_delete(id);

    if !yes {
        print!("Delete estimate {}? Type 'yes' to confirm: ", confirmation.label);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim() != "yes" {
            editor.cancel_delete();
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    editor.confirm_delete(&confirmation).await?;
    println!("Deleted estimate {}", confirmation.label);
    Ok(())
}

async fn pdf_command(editor: &mut Editor, id: &str, out: &Path) -> Result<()> {
    let document = editor.render_document(id).await?;
    let path = out.join(&document.file_name);
    fs::write(&path, &document.bytes).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
