//! Source-control adapter over the git CLI.
//!
//! Invoked only at run boundaries: branch setup and gitignore maintenance at
//! start, plan archival at the end. Every operation shells out to `git` and
//! wraps failures with the command that produced them.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git {args}: {source}")]
    Launch {
        args: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git {args}: {stderr}")]
    Command { args: String, stderr: String },
    #[error("not a git repository: {0}")]
    NotARepo(PathBuf),
}

/// Handle to a git repository.
#[derive(Debug, Clone)]
pub struct Repo {
    root: PathBuf,
}

impl Repo {
    /// Opens the repository containing `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, GitError> {
        let dir = dir.as_ref();
        let output = Command::new("git")
            .current_dir(dir)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(|source| GitError::Launch {
                args: "rev-parse --show-toplevel".to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(GitError::NotARepo(dir.to_path_buf()));
        }
        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        Ok(Self { root })
    }

    /// Returns the repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        debug!(args = ?args, "running git");
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(args)
            .output()
            .map_err(|source| GitError::Launch {
                args: args.join(" "),
                source,
            })?;
        if !output.status.success() {
            return Err(GitError::Command {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Reports whether the repository has any commits.
    pub fn has_commits(&self) -> Result<bool, GitError> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(["rev-parse", "--verify", "--quiet", "HEAD"])
            .output()
            .map_err(|source| GitError::Launch {
                args: "rev-parse --verify HEAD".to_string(),
                source,
            })?;
        Ok(output.status.success())
    }

    /// Creates an empty initial commit.
    pub fn create_initial_commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "--allow-empty", "-m", message])?;
        Ok(())
    }

    /// Returns the current branch name.
    pub fn current_branch(&self) -> Result<String, GitError> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Reports whether a local branch exists.
    pub fn branch_exists(&self, name: &str) -> bool {
        Command::new("git")
            .current_dir(&self.root)
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Creates and checks out a new branch.
    pub fn create_branch(&self, name: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-b", name])?;
        Ok(())
    }

    /// Checks out an existing branch.
    pub fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        self.run(&["checkout", name])?;
        Ok(())
    }

    /// Reports whether the worktree has uncommitted changes to any file other
    /// than `path`.
    pub fn has_changes_other_than(&self, path: &Path) -> Result<bool, GitError> {
        let keep = self.relative(path);
        // -uall lists untracked files individually instead of collapsing
        // their directories, so the comparison against `path` is exact
        let status = self.run(&["status", "--porcelain", "-uall"])?;
        Ok(status
            .lines()
            .filter_map(porcelain_path)
            .any(|changed| Path::new(changed) != keep))
    }

    /// Reports whether `path` itself has uncommitted changes (untracked,
    /// modified or staged).
    pub fn file_has_changes(&self, path: &Path) -> Result<bool, GitError> {
        let rel = self.relative(path);
        let rel = rel.to_string_lossy();
        let status = self.run(&["status", "--porcelain", "--", &rel])?;
        Ok(!status.is_empty())
    }

    /// Stages a file.
    pub fn add(&self, path: &Path) -> Result<(), GitError> {
        let rel = self.relative(path);
        self.run(&["add", "--", &rel.to_string_lossy()])?;
        Ok(())
    }

    /// Commits staged changes.
    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message])?;
        Ok(())
    }

    /// Moves a tracked file, staging the rename.
    pub fn move_file(&self, from: &Path, to: &Path) -> Result<(), GitError> {
        let from = self.relative(from);
        let to = self.relative(to);
        self.run(&["mv", &from.to_string_lossy(), &to.to_string_lossy()])?;
        Ok(())
    }

    /// Reports whether a path is covered by gitignore rules.
    pub fn is_ignored(&self, path: &str) -> Result<bool, GitError> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(["check-ignore", "-q", path])
            .output()
            .map_err(|source| GitError::Launch {
                args: format!("check-ignore -q {path}"),
                source,
            })?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(GitError::Command {
                args: format!("check-ignore -q {path}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    /// Rebases a path against the repo root so porcelain output compares
    /// cleanly. Falls back through canonicalization for paths reached via
    /// symlinked temp dirs.
    fn relative(&self, path: &Path) -> PathBuf {
        if let Ok(rel) = path.strip_prefix(&self.root) {
            return rel.to_path_buf();
        }
        if let Ok(canon) = path.canonicalize() {
            if let Ok(rel) = canon.strip_prefix(&self.root) {
                return rel.to_path_buf();
            }
        }
        path.to_path_buf()
    }
}

/// Extracts the path column from a `status --porcelain` line, unquoting the
/// rename arrow form.
fn porcelain_path(line: &str) -> Option<&str> {
    let path = line.get(3..)?;
    let path = path.rsplit(" -> ").next().unwrap_or(path);
    Some(path.trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repo) {
        let dir = TempDir::new().unwrap();
        let git = |args: &[&str]| {
            let status = Command::new("git")
                .current_dir(dir.path())
                .args(args)
                .output()
                .unwrap();
            assert!(status.status.success(), "git {args:?} failed");
        };
        git(&["init", "-q", "-b", "master"]);
        git(&["config", "user.email", "test@example.com"]);
        git(&["config", "user.name", "test"]);
        let repo = Repo::open(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_open_rejects_non_repo() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Repo::open(dir.path()), Err(GitError::NotARepo(_))));
    }

    #[test]
    fn test_has_commits_and_initial_commit() {
        let (_dir, repo) = init_repo();
        assert!(!repo.has_commits().unwrap());
        repo.create_initial_commit("initial commit").unwrap();
        assert!(repo.has_commits().unwrap());
    }

    #[test]
    fn test_branch_lifecycle() {
        let (_dir, repo) = init_repo();
        repo.create_initial_commit("initial commit").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "master");

        assert!(!repo.branch_exists("add-cache"));
        repo.create_branch("add-cache").unwrap();
        assert!(repo.branch_exists("add-cache"));
        assert_eq!(repo.current_branch().unwrap(), "add-cache");

        repo.checkout_branch("master").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "master");
    }

    #[test]
    fn test_change_detection() {
        let (dir, repo) = init_repo();
        repo.create_initial_commit("initial commit").unwrap();

        let plan = dir.path().join("plan.md");
        fs::write(&plan, "# plan").unwrap();
        assert!(repo.file_has_changes(&plan).unwrap());
        assert!(!repo.has_changes_other_than(&plan).unwrap());

        fs::write(dir.path().join("README.md"), "stray").unwrap();
        assert!(repo.has_changes_other_than(&plan).unwrap());
    }

    #[test]
    fn test_untracked_plan_in_subdirectory_is_not_other_change() {
        let (dir, repo) = init_repo();
        repo.create_initial_commit("initial commit").unwrap();

        fs::create_dir_all(dir.path().join("docs/plans")).unwrap();
        let plan = dir.path().join("docs/plans/add-cache.md");
        fs::write(&plan, "# plan").unwrap();

        assert!(!repo.has_changes_other_than(&plan).unwrap());
        assert!(repo.file_has_changes(&plan).unwrap());
    }

    #[test]
    fn test_add_commit_and_move() {
        let (dir, repo) = init_repo();
        repo.create_initial_commit("initial commit").unwrap();

        let plan = dir.path().join("plan.md");
        fs::write(&plan, "# plan").unwrap();
        repo.add(&plan).unwrap();
        repo.commit("add plan").unwrap();

        fs::create_dir(dir.path().join("completed")).unwrap();
        let dest = dir.path().join("completed/plan.md");
        repo.move_file(&plan, &dest).unwrap();
        repo.commit("move completed plan: plan.md").unwrap();

        assert!(!plan.exists());
        assert!(dest.exists());
    }

    #[test]
    fn test_move_untracked_file_fails() {
        let (dir, repo) = init_repo();
        repo.create_initial_commit("initial commit").unwrap();

        let plan = dir.path().join("untracked.md");
        fs::write(&plan, "# plan").unwrap();
        fs::create_dir(dir.path().join("completed")).unwrap();
        let dest = dir.path().join("completed/untracked.md");
        assert!(repo.move_file(&plan, &dest).is_err());
    }

    #[test]
    fn test_is_ignored() {
        let (dir, repo) = init_repo();
        repo.create_initial_commit("initial commit").unwrap();
        assert!(!repo.is_ignored("progress-test.txt").unwrap());

        fs::write(dir.path().join(".gitignore"), "progress*.txt\n").unwrap();
        assert!(repo.is_ignored("progress-test.txt").unwrap());
    }
}
