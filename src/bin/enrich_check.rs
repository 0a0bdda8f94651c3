use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use atlas_publish::audit::load_audit_index;
use atlas_publish::enrich::{EnrichOptions, enrich_rows};
use atlas_publish::logging;
use atlas_publish::slips::load_rows;

// Offline look at how one slips file enriches against one audit file.
// Nothing is written and no git commands run.
fn main() -> Result<()> {
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let slips_path = args
        .iter()
        .enumerate()
        .find(|(idx, a)| !a.starts_with("--") && (*idx == 0 || args[idx - 1] != "--audit"))
        .map(|(_, a)| PathBuf::from(a))
        .ok_or_else(|| anyhow!("usage: enrich_check <slips.csv|json> [--audit <csv>] [--drop-cold]"))?;
    let audit_path = parse_audit_arg(&args)
        .or_else(|| slips_path.parent().map(|dir| dir.join("last5_audit.csv")))
        .context("unable to resolve audit path")?;
    let drop_cold = args.iter().any(|a| a == "--drop-cold");

    let index = load_audit_index(&audit_path);
    let rows = load_rows(&slips_path)?;
    let report = enrich_rows(
        &rows,
        &index,
        EnrichOptions {
            drop_cold_legs: drop_cold,
            parallel: false,
        },
    );

    println!("Audit: {} ({} players)", audit_path.display(), index.len());
    println!("Slips: {} ({} rows)", slips_path.display(), rows.len());
    for (idx, slip) in report.slips.iter().enumerate() {
        println!(
            "#{idx} keep={} via={}",
            slip.keep,
            slip.strategy.unwrap_or("none")
        );
        for leg in &slip.legs {
            let hits = leg
                .last5_hits
                .map(|h| h.to_string())
                .unwrap_or_else(|| "-".to_string());
            match (&leg.leg.player, &leg.leg.stat, &leg.leg.direction, leg.leg.line) {
                (Some(player), Some(stat), Some(dir), Some(line)) => {
                    println!("   {player} {} {stat} {line} hits={hits}", dir.as_str())
                }
                _ => println!("   [unparsed] {} hits={hits}", leg.leg.raw_text),
            }
        }
    }
    println!(
        "Legs: {} total, {} with hits, {} unparsed; dropped slips: {}",
        report.legs_total, report.legs_with_hits, report.legs_unparsed, report.dropped
    );

    Ok(())
}

fn parse_audit_arg(args: &[String]) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--audit=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--audit" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
