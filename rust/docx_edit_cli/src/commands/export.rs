use crate::project::ProjectStore;
use anyhow::{bail, Context, Result};
use clap::Args;
use docx_edit::{export as export_package, validate_records};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Project ID
    pub project_id: String,

    /// Output .docx path (defaults to ./<project-id>-output.docx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn export(args: ExportArgs, store: &ProjectStore) -> Result<()> {
    if !store.exists(&args.project_id) {
        bail!("Project not found: {}", args.project_id);
    }
    let paths = store.paths(&args.project_id);
    let output = match args.output {
        Some(p) => p,
        None => std::env::current_dir()
            .context("resolve current directory")?
            .join(format!("{}-output.docx", args.project_id)),
    };

    let history = validate_records(&store.updates(&args.project_id)?)
        .context("update history is corrupt")?;
    println!("Exporting '{}'...", args.project_id);
    println!("  Updates to apply: {}", history.len());

    let base = fs::read(&paths.base_docx)
        .with_context(|| format!("read {}", paths.base_docx.display()))?;
    let exported = export_package(&base, &history).context("apply updates to document")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&output, &exported.bytes).with_context(|| format!("write {}", output.display()))?;

    for (outcome, reason) in exported.report.skipped() {
        warn!(index = outcome.index, target = %outcome.target, %reason, "update not applied to document");
        println!(
            "  Skipped {}. {} -> {} ({reason})",
            outcome.index + 1,
            outcome.kind,
            outcome.target
        );
    }
    println!("Exported to: {}", output.display());
    Ok(())
}
