mod commands;
mod config;
mod project;

use clap::{ArgAction, Parser, Subcommand};
use commands::{DeleteArgs, ExportArgs, InfoArgs, NewArgs, UpdateArgs};
use project::ProjectStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Edit .docx files through JSON update commands, with an HTML preview.
#[derive(Parser, Debug)]
#[command(name = "docx-edit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Projects directory
    #[arg(short = 'd', long, global = true, env = config::PROJECT_DIR_ENV)]
    project_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a project from a .docx file
    New(NewArgs),

    /// Apply update commands to a project's preview
    Update(UpdateArgs),

    /// Write a .docx with every recorded update applied
    Export(ExportArgs),

    /// List all projects
    List,

    /// Show project details
    Info(InfoArgs),

    /// Remove a project and all of its files
    Delete(DeleteArgs),
}

fn init_tracing(verbose: u8) {
    let filter = match config::verbosity_filter(verbose) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = ProjectStore::new(config::projects_dir(cli.project_dir.as_deref())?);
    match cli.command {
        Command::New(args) => commands::new(args, &store),
        Command::Update(args) => commands::update(args, &store),
        Command::Export(args) => commands::export(args, &store),
        Command::List => commands::list(&store),
        Command::Info(args) => commands::info(args, &store),
        Command::Delete(args) => commands::delete(args, &store),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
