//! Default change-context collector: staged changes read from the index with git2.

use git2::{Diff, DiffFormat, ErrorCode, Repository, Tree};
use tracing::debug;

use crate::context::{ChangeContext, ModuleMap, StagedFile};
use crate::error::ContextError;

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found),
/// `Ok(Some(tree))` for repos with a valid HEAD, or `Err(ContextError::DiffFailed)`
/// for real errors (corrupt HEAD, permission issues, missing objects).
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, ContextError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(ContextError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(ContextError::DiffFailed)?;
    Ok(Some(tree))
}

/// Diff between HEAD and the index: exactly what the next commit would record.
fn staged_diff(repo: &Repository) -> Result<Diff<'_>, ContextError> {
    let head_tree = resolve_head_tree(repo)?;
    repo.diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(ContextError::DiffFailed)
}

/// Collect the staged files (with module ownership) and the staged diff.
///
/// Returns `ContextError::NoStagedFiles` when nothing is staged.
pub fn collect_staged(repo: &Repository, modules: &ModuleMap) -> Result<ChangeContext, ContextError> {
    let diff = staged_diff(repo)?;

    let mut paths = staged_paths(&diff);
    paths.sort();
    paths.dedup();

    if paths.is_empty() {
        return Err(ContextError::NoStagedFiles);
    }

    let staged_files = paths
        .into_iter()
        .map(|path| {
            let owners = modules.owners(&path);
            StagedFile::new(path, owners)
        })
        .collect::<Vec<_>>();

    let diff_text = render_patch(&diff)?;
    debug!(
        "Collected {} staged files, {} bytes of diff",
        staged_files.len(),
        diff_text.len()
    );

    Ok(ChangeContext::new(staged_files, diff_text))
}

/// Only the staged unified diff, for use alongside an external report.
pub fn staged_diff_text(repo: &Repository) -> Result<String, ContextError> {
    let diff = staged_diff(repo)?;
    render_patch(&diff)
}

/// Paths touched by a diff; renames report the new path.
fn staged_paths(diff: &Diff<'_>) -> Vec<String> {
    diff.deltas()
        .filter_map(|delta| {
            delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string())
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Render a diff as unified patch text with origin markers.
fn render_patch(diff: &Diff<'_>) -> Result<String, ContextError> {
    let mut text = String::new();

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(ContextError::DiffFailed)?;

    Ok(text)
}
