use crate::project::ProjectStore;
use anyhow::{bail, Context, Result};
use clap::Args;
use docx_edit::{preview, validate};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Project ID
    pub project_id: String,

    /// JSON file with one update or an array of updates
    #[arg(short, long, conflicts_with = "code", required_unless_present = "code")]
    pub file: Option<PathBuf>,

    /// Inline JSON update(s)
    #[arg(short, long)]
    pub code: Option<String>,
}

pub fn update(args: UpdateArgs, store: &ProjectStore) -> Result<()> {
    let raw = match (&args.file, &args.code) {
        (Some(file), None) => {
            if !file.exists() {
                bail!("File not found: {}", file.display());
            }
            fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?
        }
        (None, Some(code)) => code.clone(),
        (Some(_), Some(_)) => bail!("Cannot use both --file and --code"),
        (None, None) => bail!("Must provide either --file or --code"),
    };

    if !store.exists(&args.project_id) {
        bail!("Project not found: {}", args.project_id);
    }

    let value: Value = serde_json::from_str(&raw).context("Invalid JSON")?;
    let commands = validate(&value)?;

    let paths = store.paths(&args.project_id);
    println!("Applying {} update(s) to '{}'...", commands.len(), args.project_id);

    let html = fs::read_to_string(&paths.preview_html)
        .with_context(|| format!("read {}", paths.preview_html.display()))?;
    let (html, stamped) = preview(&html, &commands)?;
    fs::write(&paths.preview_html, html)
        .with_context(|| format!("write {}", paths.preview_html.display()))?;
    store.append_updates(&args.project_id, &stamped)?;

    println!("Applied {} update(s)", stamped.len());
    for (i, c) in stamped.iter().enumerate() {
        println!("  {}. {} -> {}", i + 1, c.kind(), c.target());
    }
    Ok(())
}
