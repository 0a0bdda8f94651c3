use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_ATLAS_DIR: &str = "atlas_out";
const DEFAULT_DATA_DIR: &str = "dashboard/data";
const DEFAULT_TOP_N: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub label: &'static str,
    pub drop_cold_legs: bool,
}

/// Atlas products published on every run.
pub const SOURCES: [SourceSpec; 4] = [
    SourceSpec {
        label: "system",
        drop_cold_legs: true,
    },
    SourceSpec {
        label: "windfall",
        drop_cold_legs: true,
    },
    SourceSpec {
        label: "gamescript",
        drop_cold_legs: true,
    },
    SourceSpec {
        label: "power",
        drop_cold_legs: false,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct PublishConfig {
    pub atlas_dir: PathBuf,
    pub audit_csv: PathBuf,
    pub data_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub top_n: usize,
    pub git_enabled: bool,
    pub git_remote: String,
    pub git_branch: String,
    pub parallel: bool,
}

impl PublishConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let atlas_dir = get("ATLAS_OUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ATLAS_DIR));
        let audit_csv = get("ATLAS_AUDIT_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_audit_path(&atlas_dir));
        let data_dir = get("DASHBOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let repo_dir = get("DASHBOARD_REPO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_repo_dir(&data_dir));
        let top_n = get("PUBLISH_TOP_N")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_N)
            .max(1);

        Self {
            atlas_dir,
            audit_csv,
            data_dir,
            repo_dir,
            top_n,
            git_enabled: get("PUBLISH_GIT").map(|v| flag_on(&v)).unwrap_or(true),
            git_remote: get("PUBLISH_GIT_REMOTE").unwrap_or_else(|| "origin".to_string()),
            git_branch: get("PUBLISH_GIT_BRANCH").unwrap_or_else(|| "main".to_string()),
            parallel: get("PUBLISH_PARALLEL").map(|v| flag_on(&v)).unwrap_or(true),
        }
    }

    /// Applies command-line overrides, accepting `--flag=value` and `--flag value`.
    pub fn apply_args(&mut self, args: &[String]) {
        let mut audit_overridden = false;
        let mut repo_overridden = false;
        for (idx, arg) in args.iter().enumerate() {
            match arg.as_str() {
                "--no-git" => self.git_enabled = false,
                "--sequential" => self.parallel = false,
                _ => {}
            }
            let Some((flag, value)) = flag_value(args, idx) else {
                continue;
            };
            match flag {
                "--atlas-dir" => self.atlas_dir = PathBuf::from(value),
                "--audit" => {
                    self.audit_csv = PathBuf::from(value);
                    audit_overridden = true;
                }
                "--data-dir" => self.data_dir = PathBuf::from(value),
                "--repo" => {
                    self.repo_dir = PathBuf::from(value);
                    repo_overridden = true;
                }
                "--top" => {
                    if let Ok(n) = value.parse::<usize>() {
                        self.top_n = n.max(1);
                    }
                }
                _ => {}
            }
        }
        let atlas_from_args = args
            .iter()
            .any(|a| a == "--atlas-dir" || a.starts_with("--atlas-dir="));
        if atlas_from_args && !audit_overridden {
            self.audit_csv = default_audit_path(&self.atlas_dir);
        }
        let data_from_args = args
            .iter()
            .any(|a| a == "--data-dir" || a.starts_with("--data-dir="));
        if data_from_args && !repo_overridden {
            self.repo_dir = default_repo_dir(&self.data_dir);
        }
    }

    /// The file Atlas wrote for `source`, CSV preferred over JSON.
    pub fn source_path(&self, source: &SourceSpec) -> Option<PathBuf> {
        ["csv", "json"]
            .iter()
            .map(|ext| self.atlas_dir.join(format!("{}_slips.{ext}", source.label)))
            .find(|path| path.is_file())
    }
}

fn flag_value(args: &[String], idx: usize) -> Option<(&str, &str)> {
    let arg = args.get(idx)?;
    if let Some((flag, value)) = arg.split_once('=') {
        let value = value.trim();
        return (flag.starts_with("--") && !value.is_empty()).then_some((flag, value));
    }
    let next = args.get(idx + 1)?.trim();
    if !arg.starts_with("--") || next.is_empty() || next.starts_with("--") {
        return None;
    }
    Some((arg.as_str(), next))
}

fn default_audit_path(atlas_dir: &Path) -> PathBuf {
    atlas_dir.join("last5_audit.csv")
}

fn default_repo_dir(data_dir: &Path) -> PathBuf {
    data_dir
        .parent()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn flag_on(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}
