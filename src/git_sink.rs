use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Pushed,
    NothingToCommit,
    DryRun,
}

/// Where published files go after they are swapped into the data dir.
pub trait PublishSink {
    /// Runs before any file is written (e.g. sync with the remote).
    fn prepare(&self) -> Result<()>;
    fn publish(&self, files: &[PathBuf], message: &str) -> Result<SinkOutcome>;
}

#[derive(Debug, Clone)]
pub struct GitSink {
    repo_dir: PathBuf,
    data_rel: PathBuf,
    remote: String,
    branch: String,
}

impl GitSink {
    pub fn new(repo_dir: &Path, data_dir: &Path, remote: &str, branch: &str) -> Self {
        Self {
            repo_dir: repo_dir.to_path_buf(),
            data_rel: relative_to(repo_dir, data_dir),
            remote: remote.to_string(),
            branch: branch.to_string(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }

    fn git_ok(&self, args: &[&str]) -> Result<String> {
        let out = self.git(args)?;
        if !out.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl PublishSink for GitSink {
    fn prepare(&self) -> Result<()> {
        let status = self.git_ok(&["status", "--porcelain"])?;
        let foreign = dirty_outside(&status, &self.data_rel);
        if !foreign.is_empty() {
            bail!(
                "repo {} has unrelated changes: {}",
                self.repo_dir.display(),
                foreign.join(", ")
            );
        }
        self.git_ok(&["pull", "--ff-only", self.remote.as_str(), self.branch.as_str()])?;
        Ok(())
    }

    fn publish(&self, files: &[PathBuf], message: &str) -> Result<SinkOutcome> {
        if files.is_empty() {
            return Ok(SinkOutcome::NothingToCommit);
        }
        let mut add: Vec<String> = vec!["add".to_string(), "--".to_string()];
        for file in files {
            let abs = fs::canonicalize(file)
                .with_context(|| format!("resolve {}", file.display()))?;
            add.push(abs.to_string_lossy().into_owned());
        }
        let add_refs: Vec<&str> = add.iter().map(String::as_str).collect();
        self.git_ok(&add_refs)?;

        let diff = self.git(&["diff", "--cached", "--quiet"])?;
        match diff.status.code() {
            Some(0) => {
                info!("nothing to commit");
                return Ok(SinkOutcome::NothingToCommit);
            }
            Some(1) => {}
            _ => bail!(
                "git diff --cached failed: {}",
                String::from_utf8_lossy(&diff.stderr).trim()
            ),
        }

        self.git_ok(&["commit", "-m", message])?;
        self.git_ok(&["push", self.remote.as_str(), self.branch.as_str()])?;
        info!(remote = %self.remote, branch = %self.branch, "pushed");
        Ok(SinkOutcome::Pushed)
    }
}

/// Logs instead of touching any repository.
#[derive(Debug, Clone, Default)]
pub struct DryRunSink;

impl PublishSink for DryRunSink {
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    fn publish(&self, files: &[PathBuf], message: &str) -> Result<SinkOutcome> {
        for file in files {
            info!(path = %file.display(), "dry run: would publish");
        }
        info!(commit_message = message, "dry run: would commit");
        Ok(SinkOutcome::DryRun)
    }
}

/// Tracked paths in `git status --porcelain` output that fall outside `allowed`.
/// Untracked files are ignored.
pub fn dirty_outside(porcelain: &str, allowed: &Path) -> Vec<String> {
    porcelain
        .lines()
        .filter(|line| line.len() > 3 && !line.starts_with("??"))
        .map(|line| {
            let path = &line[3..];
            path.rsplit(" -> ").next().unwrap_or(path).trim_matches('"').to_string()
        })
        .filter(|path| !Path::new(path).starts_with(allowed))
        .collect()
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if let Ok(rel) = path.strip_prefix(base) {
        return rel.to_path_buf();
    }
    match (fs::canonicalize(base), fs::canonicalize(path)) {
        (Ok(base), Ok(path)) => match path.strip_prefix(&base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                warn!(path = %path.display(), "data dir is outside the repo");
                path
            }
        },
        _ => path.to_path_buf(),
    }
}
