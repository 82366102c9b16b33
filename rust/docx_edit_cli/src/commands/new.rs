use crate::project::{generate_project_id, ProjectStore};
use anyhow::{bail, Context, Result};
use clap::Args;
use docx_edit::{assign_identities, project};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Path to the .docx file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Custom project name (defaults to one derived from the file name)
    #[arg(short, long)]
    pub name: Option<String>,
}

pub fn new(args: NewArgs, store: &ProjectStore) -> Result<()> {
    if !args.input.exists() {
        bail!("File not found: {}", args.input.display());
    }
    let is_docx = args
        .input
        .extension()
        .map(|e| e.eq_ignore_ascii_case("docx"))
        .unwrap_or(false);
    if !is_docx {
        bail!("File must be a .docx file: {}", args.input.display());
    }

    let id = args
        .name
        .unwrap_or_else(|| generate_project_id(&args.input));
    if store.exists(&id) {
        bail!("Project already exists: {id} (use --name to pick another)");
    }

    println!("Creating project '{id}'...");
    let source = fs::read(&args.input).with_context(|| format!("open {}", args.input.display()))?;
    let assigned = assign_identities(&source).context("assign paragraph identities")?;
    let projection = project(&assigned.bytes, &assigned.identities).context("render preview")?;
    info!(
        paragraphs = assigned.identities.len(),
        minted = assigned.minted,
        elements = projection.element_count,
        "converted document"
    );

    let paths = store.paths(&id);
    fs::create_dir_all(&paths.root).with_context(|| format!("create {}", paths.root.display()))?;
    fs::write(&paths.base_docx, &assigned.bytes)
        .with_context(|| format!("write {}", paths.base_docx.display()))?;
    fs::write(&paths.preview_html, &projection.html)
        .with_context(|| format!("write {}", paths.preview_html.display()))?;
    fs::write(&paths.styles_css, &projection.css)
        .with_context(|| format!("write {}", paths.styles_css.display()))?;
    let created = store.create(&id, &args.input, projection.element_count)?;

    println!("Created project: {}", created.id);
    println!("  Elements: {}", created.element_count);
    println!("  Location: {}", paths.root.display());
    println!("  Preview: {}", paths.preview_html.display());
    Ok(())
}
