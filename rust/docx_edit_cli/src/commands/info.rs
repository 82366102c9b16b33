use crate::project::ProjectStore;
use anyhow::{bail, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Project ID
    pub project_id: String,

    /// Show the update history
    #[arg(short, long)]
    pub updates: bool,
}

pub fn info(args: InfoArgs, store: &ProjectStore) -> Result<()> {
    if !store.exists(&args.project_id) {
        bail!("Project not found: {}", args.project_id);
    }
    let project = store.load(&args.project_id)?;
    let paths = store.paths(&args.project_id);
    let updates = store.updates(&args.project_id)?;

    println!("Project: {}", project.id);
    println!("  Original: {}", project.original_path);
    println!("  Elements: {}", project.element_count);
    println!("  Created: {}", project.created_at);
    println!("  Updated: {}", project.updated_at);
    println!("  Updates: {}", updates.len());
    println!();
    println!("Files:");
    println!("  Project: {}", paths.project_json.display());
    println!("  Base DOCX: {}", paths.base_docx.display());
    println!("  Preview: {}", paths.preview_html.display());
    println!("  Styles: {}", paths.styles_css.display());

    if args.updates && !updates.is_empty() {
        println!();
        println!("Update History:");
        for (i, u) in updates.iter().enumerate() {
            let field = |k: &str| u.get(k).and_then(|v| v.as_str()).unwrap_or("unknown");
            let applied_at: String = field("applied_at").chars().take(19).collect();
            println!(
                "  {}. [{applied_at}] {} -> {}",
                i + 1,
                field("type"),
                field("target_element")
            );
        }
    }
    Ok(())
}
