//! Persisted workspace metadata.
//!
//! The store is a single JSON document at `.gitsem/meta.json` holding the
//! workspaces, per-commit tags and impacts, and the active-workspace pointer.
//!
//! Every mutating operation follows load → modify → save on the whole
//! document. Saves go through a temporary file in the same directory and an
//! atomic rename, so a crash never leaves a truncated document behind. There
//! is no cross-process locking: two concurrent writers race and the last
//! save wins.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::classify::Impact;
use crate::constants::{
    DEFAULT_WORKSPACE_ID, DEFAULT_WORKSPACE_NAME, META_FILENAME, SCHEMAS_DIR,
};
use crate::errors::GitsemError;
use crate::repo::Repository;

/// Schema reference written into freshly bootstrapped documents.
pub const META_SCHEMA_REF: &str = "./schemas/meta.schema.json";

/// Current document version.
pub const META_VERSION: u32 = 1;

/// Status given to newly created workspaces.
pub const STATUS_ACTIVE: &str = "active";

/// JSON Schemas shipped with the binary and copied next to the document on bootstrap.
const BUNDLED_SCHEMAS: &[(&str, &str)] = &[
    ("meta.schema.json", include_str!("../schemas/meta.schema.json")),
    ("config.schema.json", include_str!("../schemas/config.schema.json")),
];

/// A named grouping of commits, independent of branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Member commit hashes in insertion order, without duplicates.
    #[serde(default)]
    pub commits: Vec<String>,
    #[serde(default)]
    pub status: String,
}

impl Workspace {
    /// A new workspace with no commits and `active` status.
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            commits: Vec::new(),
            status: STATUS_ACTIVE.to_string(),
        }
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.commits.iter().any(|c| c == hash)
    }
}

/// Root of the metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "$schema", default, skip_serializing_if = "String::is_empty")]
    pub schema: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    /// Commit hash to its tags, in insertion order.
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
    /// Id of the active workspace; empty when none is active.
    #[serde(default)]
    pub active_workspace: String,
    /// Commit hash to its confirmed impact.
    #[serde(default)]
    pub impacts: BTreeMap<String, Impact>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            schema: String::new(),
            version: META_VERSION,
            workspaces: Vec::new(),
            tags: BTreeMap::new(),
            active_workspace: String::new(),
            impacts: BTreeMap::new(),
        }
    }
}

impl Meta {
    pub fn workspace(&self, id: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.id == id)
    }

    fn workspace_mut(&mut self, id: &str) -> Option<&mut Workspace> {
        self.workspaces.iter_mut().find(|w| w.id == id)
    }

    /// The active workspace, if one is set and still exists.
    pub fn active(&self) -> Option<&Workspace> {
        if self.active_workspace.is_empty() {
            return None;
        }
        self.workspace(&self.active_workspace)
    }

    /// Display name of the active workspace, or an empty string.
    pub fn active_workspace_name(&self) -> &str {
        self.active().map(|w| w.name.as_str()).unwrap_or_default()
    }

    /// The first workspace in document order that contains `hash`.
    pub fn workspace_for_commit(&self, hash: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.contains(hash))
    }

    /// The first explicit tag recorded for `hash`.
    pub fn first_tag(&self, hash: &str) -> Option<&str> {
        self.tags.get(hash).and_then(|t| t.first()).map(String::as_str)
    }
}

/// Derive a workspace id from a display name: lower-cased, spaces to `-`.
pub fn workspace_id_from_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// File-backed access to a [`Meta`] document.
#[derive(Debug, Clone)]
pub struct MetaStore {
    path: PathBuf,
}

impl MetaStore {
    /// Store for the given repository (`<root>/.gitsem/meta.json`).
    pub fn new(repo: &Repository) -> Self {
        Self {
            path: repo.meta_path(),
        }
    }

    /// Store rooted at an explicit metadata directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(META_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Read the document. A missing file is an empty, uninitialized document.
    pub fn load(&self) -> Result<Meta, GitsemError> {
        if !self.path.exists() {
            return Ok(Meta::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| GitsemError::MetaRead {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let mut meta: Meta = serde_json::from_str(&content).map_err(|e| GitsemError::MetaParse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        if meta.version == 0 {
            meta.version = META_VERSION;
        }
        Ok(meta)
    }

    /// Write the whole document atomically.
    pub fn save(&self, meta: &Meta) -> Result<(), GitsemError> {
        let write_err = |e: &dyn std::fmt::Display| GitsemError::MetaWrite {
            path: self.path.clone(),
            message: e.to_string(),
        };

        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|e| write_err(&e))?;

        let json = serde_json::to_string_pretty(meta)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(&e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| write_err(&e))?;
        tmp.write_all(b"\n").map_err(|e| write_err(&e))?;
        tmp.persist(&self.path).map_err(|e| write_err(&e.error))?;

        tracing::debug!(path = %self.path.display(), "Saved metadata");
        Ok(())
    }

    /// Create the initial document with the default workspace.
    ///
    /// # Errors
    ///
    /// Returns [`GitsemError::AlreadyInitialized`] if a document already exists.
    pub fn bootstrap(&self) -> Result<Meta, GitsemError> {
        if self.path.exists() {
            return Err(GitsemError::AlreadyInitialized {
                path: self.path.clone(),
            });
        }

        fs::create_dir_all(self.dir())?;

        if let Err(e) = self.copy_schemas() {
            tracing::warn!(error = %e, "Could not copy schemas; documents keep their relative schema reference");
        }

        let meta = Meta {
            schema: META_SCHEMA_REF.to_string(),
            version: META_VERSION,
            workspaces: vec![Workspace::new(
                DEFAULT_WORKSPACE_ID,
                DEFAULT_WORKSPACE_NAME,
                "Default project workspace",
            )],
            active_workspace: DEFAULT_WORKSPACE_ID.to_string(),
            ..Meta::default()
        };

        self.save(&meta)?;
        tracing::info!(path = %self.path.display(), "Initialized gitsem metadata");
        Ok(meta)
    }

    fn copy_schemas(&self) -> Result<(), GitsemError> {
        let dest = self.dir().join(SCHEMAS_DIR);
        fs::create_dir_all(&dest)?;
        for (name, content) in BUNDLED_SCHEMAS {
            fs::write(dest.join(name), content)?;
        }
        Ok(())
    }

    /// Add a workspace with an empty commit list and `active` status.
    pub fn create_workspace(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<Workspace, GitsemError> {
        if id.trim().is_empty() {
            return Err(GitsemError::InvalidArgument(
                "Workspace id must not be empty".to_string(),
            ));
        }

        let mut meta = self.load()?;
        if meta.workspace(id).is_some() {
            return Err(GitsemError::WorkspaceExists(id.to_string()));
        }

        let workspace = Workspace::new(id, name, description);
        meta.workspaces.push(workspace.clone());
        self.save(&meta)?;

        tracing::info!(id, name, "Created workspace");
        Ok(workspace)
    }

    /// Create a workspace whose id is derived from `name`, optionally activating it.
    pub fn create_workspace_from_name(
        &self,
        name: &str,
        description: &str,
        activate: bool,
    ) -> Result<Workspace, GitsemError> {
        let id = workspace_id_from_name(name);
        let workspace = self.create_workspace(&id, name.trim(), description)?;
        if activate {
            self.set_active_workspace(&id)?;
        }
        Ok(workspace)
    }

    /// Point the active workspace at `id`; an empty id deactivates.
    pub fn set_active_workspace(&self, id: &str) -> Result<(), GitsemError> {
        let mut meta = self.load()?;
        if !id.is_empty() && meta.workspace(id).is_none() {
            return Err(GitsemError::WorkspaceNotFound(id.to_string()));
        }

        meta.active_workspace = id.to_string();
        self.save(&meta)?;

        tracing::info!(id, "Set active workspace");
        Ok(())
    }

    /// Append `hash` to a workspace. Already-present hashes are a no-op.
    pub fn add_commit_to_workspace(&self, id: &str, hash: &str) -> Result<(), GitsemError> {
        let mut meta = self.load()?;
        let workspace = meta
            .workspace_mut(id)
            .ok_or_else(|| GitsemError::WorkspaceNotFound(id.to_string()))?;

        if workspace.contains(hash) {
            return Ok(());
        }
        workspace.commits.push(hash.to_string());
        self.save(&meta)?;

        tracing::info!(workspace = id, hash, "Added commit to workspace");
        Ok(())
    }

    /// Associate `tag` with `hash`. Duplicate tags are a no-op.
    pub fn add_tag(&self, hash: &str, tag: &str) -> Result<(), GitsemError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(GitsemError::InvalidArgument("Tag must not be empty".to_string()));
        }

        let mut meta = self.load()?;
        let tags = meta.tags.entry(hash.to_string()).or_default();
        if tags.iter().any(|t| t == tag) {
            return Ok(());
        }
        tags.push(tag.to_string());
        self.save(&meta)?;

        tracing::info!(hash, tag, "Tagged commit");
        Ok(())
    }

    /// Record the impact of `hash`, replacing any previous value.
    pub fn add_impact(&self, hash: &str, impact: Impact) -> Result<(), GitsemError> {
        let mut meta = self.load()?;
        meta.impacts.insert(hash.to_string(), impact);
        self.save(&meta)?;

        tracing::info!(hash, impact = %impact, "Recorded impact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, MetaStore) {
        let temp = TempDir::new().unwrap();
        let store = MetaStore::in_dir(temp.path().join(".gitsem"));
        (temp, store)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let (_temp, store) = store();
        let meta = store.load().unwrap();
        assert!(meta.workspaces.is_empty());
        assert!(meta.tags.is_empty());
        assert!(meta.impacts.is_empty());
        assert!(!store.exists());
    }

    #[test]
    fn test_bootstrap_creates_default_workspace_and_schemas() {
        let (temp, store) = store();
        let meta = store.bootstrap().unwrap();

        assert_eq!(meta.workspaces.len(), 1);
        assert_eq!(meta.workspaces[0].id, "general");
        assert_eq!(meta.workspaces[0].name, "General");
        assert_eq!(meta.workspaces[0].status, "active");
        assert_eq!(meta.active_workspace, "general");
        assert_eq!(meta.active_workspace_name(), "General");

        assert!(temp.path().join(".gitsem/schemas/meta.schema.json").is_file());
        assert!(temp.path().join(".gitsem/schemas/config.schema.json").is_file());
        assert_eq!(store.load().unwrap(), meta);
    }

    #[test]
    fn test_bootstrap_twice_fails() {
        let (_temp, store) = store();
        store.bootstrap().unwrap();
        assert!(matches!(
            store.bootstrap(),
            Err(GitsemError::AlreadyInitialized { .. })
        ));
    }

    #[test]
    fn test_document_shape() {
        let (_temp, store) = store();
        store.bootstrap().unwrap();
        store.add_tag("abc", "feature").unwrap();
        store.add_impact("abc", Impact::Major).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["$schema"], "./schemas/meta.schema.json");
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["active_workspace"], "general");
        assert_eq!(raw["tags"]["abc"][0], "feature");
        assert_eq!(raw["impacts"]["abc"], "major");
        assert!(raw["workspaces"][0]["commits"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_create_duplicate_workspace_fails() {
        let (_temp, store) = store();
        store.create_workspace("auth", "Auth", "").unwrap();
        assert!(matches!(
            store.create_workspace("auth", "Auth again", ""),
            Err(GitsemError::WorkspaceExists(_))
        ));
        assert_eq!(store.load().unwrap().workspaces.len(), 1);
    }

    #[test]
    fn test_create_from_name_derives_id_and_activates() {
        let (_temp, store) = store();
        store.bootstrap().unwrap();
        let ws = store.create_workspace_from_name("Payment Flow", "billing", true).unwrap();
        assert_eq!(ws.id, "payment-flow");

        let meta = store.load().unwrap();
        assert_eq!(meta.active_workspace, "payment-flow");
        assert_eq!(meta.active_workspace_name(), "Payment Flow");
    }

    #[test]
    fn test_add_commit_is_idempotent() {
        let (_temp, store) = store();
        store.bootstrap().unwrap();
        store.add_commit_to_workspace("general", "h1").unwrap();
        store.add_commit_to_workspace("general", "h1").unwrap();
        assert_eq!(store.load().unwrap().workspaces[0].commits, vec!["h1"]);
    }

    #[test]
    fn test_add_commit_to_unknown_workspace_leaves_document_unchanged() {
        let (_temp, store) = store();
        store.bootstrap().unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        assert!(matches!(
            store.add_commit_to_workspace("missing", "h1"),
            Err(GitsemError::WorkspaceNotFound(_))
        ));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_set_active() {
        let (_temp, store) = store();
        store.bootstrap().unwrap();

        store.set_active_workspace("").unwrap();
        assert_eq!(store.load().unwrap().active_workspace, "");
        assert_eq!(store.load().unwrap().active_workspace_name(), "");

        assert!(matches!(
            store.set_active_workspace("nope"),
            Err(GitsemError::WorkspaceNotFound(_))
        ));
        store.set_active_workspace("general").unwrap();
        assert_eq!(store.load().unwrap().active_workspace, "general");
    }

    #[test]
    fn test_set_active_empty_on_uninitialized_store() {
        let (_temp, store) = store();
        store.set_active_workspace("").unwrap();
    }

    #[test]
    fn test_tags_are_deduplicated_and_impact_overwritten() {
        let (_temp, store) = store();
        store.add_tag("h1", "fix").unwrap();
        store.add_tag("h1", "fix").unwrap();
        store.add_tag("h1", "refactor").unwrap();
        store.add_impact("h1", Impact::Minor).unwrap();
        store.add_impact("h1", Impact::Patch).unwrap();

        let meta = store.load().unwrap();
        assert_eq!(meta.tags["h1"], vec!["fix", "refactor"]);
        assert_eq!(meta.first_tag("h1"), Some("fix"));
        assert_eq!(meta.impacts["h1"], Impact::Patch);
    }

    #[test]
    fn test_workspace_for_commit_uses_document_order() {
        let (_temp, store) = store();
        store.create_workspace("a", "A", "").unwrap();
        store.create_workspace("b", "B", "").unwrap();
        store.add_commit_to_workspace("b", "h1").unwrap();
        store.add_commit_to_workspace("a", "h1").unwrap();

        let meta = store.load().unwrap();
        assert_eq!(meta.workspace_for_commit("h1").unwrap().id, "a");
        assert!(meta.workspace_for_commit("h2").is_none());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let (_temp, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(GitsemError::MetaParse { .. })));
    }

    #[test]
    fn test_load_normalizes_version_and_missing_maps() {
        let (_temp, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"workspaces": []}"#).unwrap();

        let meta = store.load().unwrap();
        assert_eq!(meta.version, 1);
        assert!(meta.tags.is_empty() && meta.impacts.is_empty());
    }

    #[test]
    fn test_workspace_id_from_name() {
        assert_eq!(workspace_id_from_name("Payment Flow"), "payment-flow");
        assert_eq!(workspace_id_from_name("  API  "), "api");
    }
}
