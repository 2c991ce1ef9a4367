//! Git branch lookup by reading `HEAD` directly.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

const SHORT_HASH_LEN: usize = 7;

/// Branch checked out in the repository containing `start`.
///
/// Detached heads yield the short commit hash. Returns `None` outside a
/// repository or when `HEAD` cannot be read.
pub fn current_branch(start: &Path) -> Option<String> {
    let git_dir = find_git_dir(start)?;
    let head = match fs::read_to_string(git_dir.join("HEAD")) {
        Ok(head) => head,
        Err(e) => {
            trace!(dir = %git_dir.display(), error = %e, "unreadable HEAD");
            return None;
        }
    };
    parse_head(&head)
}

/// Walk up from `start` to the nearest `.git` directory or `gitdir:` file.
pub fn find_git_dir(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(".git");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if candidate.is_file() {
            // worktrees and submodules point elsewhere
            let contents = fs::read_to_string(&candidate).ok()?;
            let target = contents.trim().strip_prefix("gitdir:")?.trim();
            return Some(dir.join(target));
        }
    }
    None
}

fn parse_head(head: &str) -> Option<String> {
    let head = head.trim();
    if let Some(reference) = head.strip_prefix("ref:") {
        let reference = reference.trim();
        let branch = reference.strip_prefix("refs/heads/").unwrap_or(reference);
        return (!branch.is_empty()).then(|| branch.to_string());
    }

    let is_hash = head.len() >= SHORT_HASH_LEN && head.chars().all(|c| c.is_ascii_hexdigit());
    is_hash.then(|| head[..SHORT_HASH_LEN].to_string())
}
