use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::audit::load_audit_index;
use crate::config::{PublishConfig, SOURCES};
use crate::enrich::{EnrichOptions, EnrichedSlip, enrich_rows};
use crate::git_sink::{PublishSink, SinkOutcome};
use crate::publish::{COMBINED_NAME, FileStatus, Output, PublishedFile, publish_outputs};
use crate::rank::{SourceSlips, combine_best_first};
use crate::slips::load_rows;

#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub label: &'static str,
    pub path: PathBuf,
    pub rows: usize,
    pub kept: usize,
    pub dropped: usize,
    pub legs_total: usize,
    pub legs_with_hits: usize,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub audit_players: usize,
    pub sources: Vec<SourceSummary>,
    pub files: Vec<PublishedFile>,
    pub outcome: SinkOutcome,
}

/// One full publish: sync the sink, enrich every source found, stage and swap
/// the JSON outputs, then hand the changed files to the sink.
pub fn run_publish(
    cfg: &PublishConfig,
    sink: &dyn PublishSink,
    generated_at: &str,
) -> Result<RunSummary> {
    sink.prepare()?;

    let index = load_audit_index(&cfg.audit_csv);
    info!(players = index.len(), "audit index ready");

    let mut summaries = Vec::new();
    let mut loaded: Vec<(&'static str, Vec<EnrichedSlip>)> = Vec::new();
    for source in &SOURCES {
        let Some(path) = cfg.source_path(source) else {
            warn!(source = source.label, dir = %cfg.atlas_dir.display(), "no slips file");
            continue;
        };
        let rows = match load_rows(&path) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(source = source.label, "skipping source: {err:#}");
                continue;
            }
        };
        let opts = EnrichOptions {
            drop_cold_legs: source.drop_cold_legs,
            parallel: cfg.parallel,
        };
        let report = enrich_rows(&rows, &index, opts);
        if report.legs_unparsed > 0 {
            warn!(
                source = source.label,
                legs = report.legs_unparsed,
                "legs could not be parsed"
            );
        }
        info!(
            source = source.label,
            rows = rows.len(),
            kept = report.slips.len(),
            dropped = report.dropped,
            legs = report.legs_total,
            with_hits = report.legs_with_hits,
            "source enriched"
        );
        summaries.push(SourceSummary {
            label: source.label,
            path,
            rows: rows.len(),
            kept: report.slips.len(),
            dropped: report.dropped,
            legs_total: report.legs_total,
            legs_with_hits: report.legs_with_hits,
        });
        loaded.push((source.label, report.slips));
    }

    if loaded.is_empty() {
        bail!(
            "no recommendation sources found under {}",
            cfg.atlas_dir.display()
        );
    }

    let combined = {
        let views: Vec<SourceSlips<'_>> = loaded
            .iter()
            .map(|(label, slips)| SourceSlips {
                label: *label,
                slips: slips.as_slice(),
            })
            .collect();
        combine_best_first(&views, cfg.top_n)
    };

    let mut outputs: Vec<Output> = loaded
        .into_iter()
        .map(|(label, slips)| Output {
            name: label.to_string(),
            slips,
        })
        .collect();
    outputs.push(Output {
        name: COMBINED_NAME.to_string(),
        slips: combined,
    });

    let files = publish_outputs(&cfg.data_dir, &outputs, generated_at)?;
    let changed: Vec<PathBuf> = files
        .iter()
        .filter(|f| f.status == FileStatus::Written)
        .map(|f| f.path.clone())
        .collect();

    let outcome = if changed.is_empty() {
        info!("outputs unchanged, skipping sink");
        SinkOutcome::NothingToCommit
    } else {
        sink.publish(&changed, &format!("Publish Atlas slips {generated_at}"))?
    };

    Ok(RunSummary {
        audit_players: index.len(),
        sources: summaries,
        files,
        outcome,
    })
}
