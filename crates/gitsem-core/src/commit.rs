//! Commit workflow.
//!
//! [`run_commit`] creates a backend commit and records its semantic
//! metadata in one step:
//!
//! 1. Reject when nothing is staged (before touching the backend)
//! 2. Commit and read the new HEAD hash
//! 3. Record the detected tag, unless it is `none`
//! 4. Append the hash to the active workspace, if any
//! 5. Record the impact (explicit override, else the classifier's suggestion)

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::classify::{detect_impact, detect_tag, ChangeTag, Impact};
use crate::errors::GitsemError;
use crate::store::MetaStore;

/// Options for [`run_commit`].
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub message: String,
    /// Overrides the impact suggested by the classifier.
    pub impact: Option<Impact>,
}

/// What [`run_commit`] recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub hash: String,
    pub tag: ChangeTag,
    pub impact: Impact,
    /// Id of the workspace the commit was added to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

pub fn run_commit<B: Backend + ?Sized>(
    backend: &B,
    store: &MetaStore,
    opts: &CommitOptions,
) -> Result<CommitSummary, GitsemError> {
    let message = opts.message.trim();
    if message.is_empty() {
        return Err(GitsemError::InvalidArgument(
            "Commit message must not be empty".to_string(),
        ));
    }

    let files = backend.parse_status()?;
    if !files.iter().any(|f| f.staged) {
        return Err(GitsemError::NothingToCommit);
    }

    backend.commit(message)?;
    let hash = backend.last_commit_hash()?;

    let tag = detect_tag(message);
    if tag != ChangeTag::None {
        store.add_tag(&hash, tag.as_str())?;
    }

    let meta = store.load()?;
    let workspace = match meta.active() {
        Some(active) => {
            store.add_commit_to_workspace(&active.id, &hash)?;
            Some(active.id.clone())
        }
        None => None,
    };

    let impact = opts.impact.unwrap_or_else(|| detect_impact(message));
    store.add_impact(&hash, impact)?;

    tracing::info!(hash = %hash, tag = %tag, impact = %impact, "Committed");
    Ok(CommitSummary {
        hash,
        tag,
        impact,
        workspace,
    })
}
