use crate::project::ProjectStore;
use anyhow::Result;

pub fn list(store: &ProjectStore) -> Result<()> {
    let projects = store.list()?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!("Found {} project(s):\n", projects.len());
    for project in projects {
        let updates = store.updates(&project.id).map(|u| u.len()).unwrap_or(0);
        let created: String = project.created_at.chars().take(10).collect();
        println!("  {}", project.id);
        println!("    Elements: {}", project.element_count);
        println!("    Updates: {updates}");
        println!("    Created: {created}");
        println!();
    }
    Ok(())
}
