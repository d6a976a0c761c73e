//! File and hunk staging.

use crate::backend::{Backend, FileStatusRecord};
use crate::diff::Hunk;
use crate::errors::GitsemError;

/// Unstage `file` if it is staged, stage it otherwise. Returns the new staged state.
pub fn toggle_stage<B: Backend + ?Sized>(
    backend: &B,
    file: &FileStatusRecord,
) -> Result<bool, GitsemError> {
    if file.staged {
        backend.unstage_file(&file.path)?;
        tracing::debug!(path = %file.path, "Unstaged");
        Ok(false)
    } else {
        backend.stage_file(&file.path)?;
        tracing::debug!(path = %file.path, "Staged");
        Ok(true)
    }
}

/// Stage a single hunk of `path` by applying it to the index.
///
/// The hunk must have been captured against the current worktree state;
/// line offsets are not recomputed.
pub fn stage_hunk<B: Backend + ?Sized>(
    backend: &B,
    hunk: &Hunk,
    path: &str,
) -> Result<(), GitsemError> {
    let patch = hunk.to_patch(path);
    backend.apply_patch_to_index(&patch)?;
    tracing::info!(path, header = %hunk.header, "Staged hunk");
    Ok(())
}
