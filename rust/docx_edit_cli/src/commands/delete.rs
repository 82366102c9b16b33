use crate::project::ProjectStore;
use anyhow::{bail, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Project ID
    pub project_id: String,
}

pub fn delete(args: DeleteArgs, store: &ProjectStore) -> Result<()> {
    if !store.exists(&args.project_id) {
        bail!("Project not found: {}", args.project_id);
    }
    store.delete(&args.project_id)?;
    println!("Deleted project: {}", args.project_id);
    Ok(())
}
