use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::enrich::{EnrichedSlip, LEGS_DETAIL};

pub const COMBINED_NAME: &str = "combined";

pub const REQUIRED_LEG_KEYS: [&str; 7] = [
    "id",
    "player",
    "stat",
    "direction",
    "line",
    "last5_hits",
    "leg_text",
];

#[derive(Debug, Clone)]
pub struct Output {
    pub name: String,
    pub slips: Vec<EnrichedSlip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Written,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct PublishedFile {
    pub path: PathBuf,
    pub count: usize,
    pub digest: String,
    pub status: FileStatus,
}

#[derive(Debug, Clone)]
struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
    count: usize,
    digest: String,
}

/// sha256 over the serialized slips only, so reruns over the same data agree
/// even though `generated_at` moves.
pub fn slips_digest(slips: &[Value]) -> String {
    let bytes = serde_json::to_vec(slips).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

pub fn build_envelope(source: &str, slips: &[EnrichedSlip], generated_at: &str) -> Value {
    let rows: Vec<Value> = slips.iter().map(EnrichedSlip::to_value).collect();
    let digest = slips_digest(&rows);
    json!({
        "source": source,
        "generated_at": generated_at,
        "count": rows.len(),
        "digest": digest,
        "slips": rows,
    })
}

/// Checks the envelope shape and that every slip carries a complete
/// `legs_detail`. Returns the envelope digest.
pub fn validate_envelope(v: &Value) -> Result<String> {
    let obj = v.as_object().ok_or_else(|| anyhow!("envelope is not an object"))?;
    let slips = obj
        .get("slips")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("envelope has no slips array"))?;
    let count = obj
        .get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("envelope has no count"))?;
    if count as usize != slips.len() {
        bail!("count {} does not match {} slips", count, slips.len());
    }
    let digest = obj
        .get("digest")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("envelope has no digest"))?;
    if digest != slips_digest(slips) {
        bail!("digest does not match slips");
    }
    for (idx, slip) in slips.iter().enumerate() {
        let legs = slip
            .get(LEGS_DETAIL)
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("slip {idx} has no legs_detail array"))?;
        for (leg_idx, leg) in legs.iter().enumerate() {
            let leg = leg
                .as_object()
                .ok_or_else(|| anyhow!("slip {idx} leg {leg_idx} is not an object"))?;
            if let Some(missing) = REQUIRED_LEG_KEYS.iter().find(|k| !leg.contains_key(**k)) {
                bail!("slip {idx} leg {leg_idx} is missing {missing}");
            }
            if let Some(hits) = leg.get("last5_hits").filter(|h| !h.is_null())
                && hits.as_u64().is_none()
            {
                bail!("slip {idx} leg {leg_idx} has non-integer last5_hits");
            }
        }
    }
    Ok(digest.to_string())
}

pub fn output_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{name}.json"))
}

/// Stages every output as `<name>.json.tmp`, validates all of them, and only
/// then swaps them into place. Nothing is swapped if any file fails.
pub fn publish_outputs(
    data_dir: &Path,
    outputs: &[Output],
    generated_at: &str,
) -> Result<Vec<PublishedFile>> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;

    let mut staged = Vec::with_capacity(outputs.len());
    for output in outputs {
        match stage_output(data_dir, output, generated_at) {
            Ok(file) => staged.push(file),
            Err(err) => {
                discard(&staged);
                return Err(err);
            }
        }
    }

    let mut published = Vec::with_capacity(staged.len());
    for (idx, file) in staged.iter().enumerate() {
        let status = if existing_digest(&file.target).as_deref() == Some(file.digest.as_str()) {
            let _ = fs::remove_file(&file.tmp);
            FileStatus::Unchanged
        } else {
            if let Err(err) = fs::rename(&file.tmp, &file.target) {
                discard(&staged[idx..]);
                return Err(err).with_context(|| format!("swap {}", file.target.display()));
            }
            FileStatus::Written
        };
        info!(
            path = %file.target.display(),
            count = file.count,
            status = ?status,
            "published"
        );
        published.push(PublishedFile {
            path: file.target.clone(),
            count: file.count,
            digest: file.digest.clone(),
            status,
        });
    }
    Ok(published)
}

fn stage_output(data_dir: &Path, output: &Output, generated_at: &str) -> Result<StagedFile> {
    let target = output_path(data_dir, &output.name);
    let tmp = target.with_extension("json.tmp");
    let envelope = build_envelope(&output.name, &output.slips, generated_at);
    let json = serde_json::to_string_pretty(&envelope)
        .with_context(|| format!("serialize {}", output.name))?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;

    let check = fs::read_to_string(&tmp)
        .with_context(|| format!("reread {}", tmp.display()))
        .and_then(|raw| serde_json::from_str::<Value>(&raw).context("staged json is invalid"))
        .and_then(|v| validate_envelope(&v));
    match check {
        Ok(digest) => {
            debug!(path = %tmp.display(), "staged");
            Ok(StagedFile {
                tmp,
                target,
                count: output.slips.len(),
                digest,
            })
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err.context(format!("validate staged {}", output.name)))
        }
    }
}

fn existing_digest(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let v = serde_json::from_str::<Value>(&raw).ok()?;
    v.get("digest").and_then(Value::as_str).map(str::to_string)
}

fn discard(staged: &[StagedFile]) {
    for file in staged {
        let _ = fs::remove_file(&file.tmp);
    }
}
