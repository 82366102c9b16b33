//! On-disk project storage: one directory per project.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use docx_edit::UpdateCommand;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `project.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub original_path: String,
    pub created_at: String,
    pub updated_at: String,
    pub element_count: usize,
}

#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub project_json: PathBuf,
    pub base_docx: PathBuf,
    pub preview_html: PathBuf,
    pub styles_css: PathBuf,
    pub updates_json: PathBuf,
}

impl ProjectPaths {
    fn new(root: PathBuf) -> Self {
        Self {
            project_json: root.join("project.json"),
            base_docx: root.join("base.docx"),
            preview_html: root.join("preview.html"),
            styles_css: root.join("styles.css"),
            updates_json: root.join("updates.json"),
            root,
        }
    }
}

/// Project id from an input file name: lower-cased stem, runs of other
/// characters collapsed to `-`, suffixed `-docx-project`.
pub fn generate_project_id(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let parts: Vec<String> = stem
        .split(|c: char| !c.is_alphanumeric())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    format!("{}-docx-project", parts.join("-"))
}

/// One entry of `updates.json`: a command's wire form plus when it was applied.
#[derive(Serialize)]
struct HistoryRecord<'a> {
    #[serde(flatten)]
    command: &'a UpdateCommand,
    applied_at: &'a str,
}

pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self, id: &str) -> ProjectPaths {
        ProjectPaths::new(self.root.join(id))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.paths(id).project_json.exists()
    }

    pub fn load(&self, id: &str) -> Result<Project> {
        let path = self.paths(id).project_json;
        if !path.exists() {
            bail!("Project not found: {id}");
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    pub fn save(&self, project: &Project) -> Result<()> {
        let paths = self.paths(&project.id);
        fs::create_dir_all(&paths.root)
            .with_context(|| format!("create {}", paths.root.display()))?;
        let json = serde_json::to_string_pretty(project)?;
        fs::write(&paths.project_json, json)
            .with_context(|| format!("write {}", paths.project_json.display()))
    }

    /// Writes fresh metadata and an empty history. Fails if the project
    /// already has metadata; other files in its directory are left alone.
    pub fn create(&self, id: &str, original: &Path, element_count: usize) -> Result<Project> {
        if self.exists(id) {
            bail!("Project already exists: {id}");
        }
        let original_path = fs::canonicalize(original)
            .unwrap_or_else(|_| original.to_path_buf())
            .display()
            .to_string();
        let stamp = now();
        let project = Project {
            id: id.to_string(),
            original_path,
            created_at: stamp.clone(),
            updated_at: stamp,
            element_count,
        };
        self.save(&project)?;
        let updates = self.paths(id).updates_json;
        fs::write(&updates, "[]").with_context(|| format!("write {}", updates.display()))?;
        Ok(project)
    }

    /// All readable projects, most recently updated first.
    pub fn list(&self) -> Result<Vec<Project>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root).with_context(|| format!("read {}", self.root.display()))? {
            let path = entry?.path().join("project.json");
            let Ok(raw) = fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str::<Project>(&raw) {
                Ok(p) => projects.push(p),
                Err(err) => tracing::debug!(path = %path.display(), %err, "skipping unreadable project"),
            }
        }
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    /// Raw history records, oldest first.
    pub fn updates(&self, id: &str) -> Result<Vec<Value>> {
        let path = self.paths(id).updates_json;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
        match value {
            Value::Array(items) => Ok(items),
            _ => Err(anyhow!("{} is not a JSON array", path.display())),
        }
    }

    /// Appends `commands` to the history, stamping each with `applied_at`,
    /// and bumps the project's `updated_at`.
    pub fn append_updates(&self, id: &str, commands: &[UpdateCommand]) -> Result<()> {
        let mut history = self.updates(id)?;
        let stamp = now();
        for command in commands {
            history.push(serde_json::to_value(HistoryRecord {
                command,
                applied_at: &stamp,
            })?);
        }

        let path = self.paths(id).updates_json;
        fs::write(&path, serde_json::to_string_pretty(&history)?)
            .with_context(|| format!("write {}", path.display()))?;

        let mut project = self.load(id)?;
        project.updated_at = stamp;
        self.save(&project)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let root = self.paths(id).root;
        if root.exists() {
            fs::remove_dir_all(&root).with_context(|| format!("remove {}", root.display()))?;
        }
        Ok(())
    }
}
