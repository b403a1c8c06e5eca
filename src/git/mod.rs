//! Staged diff and commit via the git binary.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::GitError;

/// Version-control operations needed around generation.
///
/// This abstraction allows mocking git in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// The staged change set with added-line markers stripped.
    async fn staged_diff(&self) -> Result<String, GitError>;

    /// Commit the staged changes and return git's confirmation output.
    async fn commit(&self, message: &str) -> Result<String, GitError>;
}

/// Runs the `git` found on `PATH` in the current directory.
pub struct GitCli;

#[async_trait]
impl Repository for GitCli {
    async fn staged_diff(&self) -> Result<String, GitError> {
        let raw = run_git(&["diff", "--staged"]).await?;
        debug!(bytes = raw.len(), "read staged diff");
        Ok(strip_added_markers(&raw))
    }

    async fn commit(&self, message: &str) -> Result<String, GitError> {
        let output = run_git(&["commit", "-m", message]).await?;
        info!("created commit");
        Ok(output)
    }
}

async fn run_git(args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(args)
        .output()
        .await
        .map_err(GitError::Spawn)?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::Failed {
            command: format!("git {}", args.first().copied().unwrap_or_default()),
            output: format!("{stdout}{stderr}").trim().to_string(),
        });
    }

    Ok(stdout)
}

/// Remove one leading `+` from every line; each line ends with `\n`.
pub fn strip_added_markers(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.strip_suffix('\n').unwrap_or(raw).split('\n') {
        out.push_str(line.strip_prefix('+').unwrap_or(line));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_added_markers() {
        let raw = "diff --git a/x b/x\n+++ b/x\n+fn main() {}\n-old\n";
        assert_eq!(
            strip_added_markers(raw),
            "diff --git a/x b/x\n++ b/x\nfn main() {}\n-old\n"
        );
    }

    #[test]
    fn test_strip_added_markers_without_trailing_newline() {
        assert_eq!(strip_added_markers("+a\nb"), "a\nb\n");
    }

    #[test]
    fn test_strip_added_markers_empty_diff_is_blank() {
        assert!(strip_added_markers("").trim().is_empty());
    }
}
