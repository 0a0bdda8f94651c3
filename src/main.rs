use anyhow::Result;
use chrono::{SecondsFormat, Utc};

use atlas_publish::config::PublishConfig;
use atlas_publish::git_sink::{DryRunSink, GitSink, PublishSink};
use atlas_publish::logging;
use atlas_publish::pipeline::run_publish;
use atlas_publish::publish::FileStatus;

fn main() -> Result<()> {
    logging::init();

    let mut cfg = PublishConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    cfg.apply_args(&args);

    let sink: Box<dyn PublishSink> = if cfg.git_enabled {
        Box::new(GitSink::new(
            &cfg.repo_dir,
            &cfg.data_dir,
            &cfg.git_remote,
            &cfg.git_branch,
        ))
    } else {
        Box::new(DryRunSink)
    };

    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let summary = run_publish(&cfg, sink.as_ref(), &generated_at)?;

    println!("Publish complete");
    println!("Audit players: {}", summary.audit_players);
    for source in &summary.sources {
        println!(
            "{}: rows={} kept={} dropped={} legs={} with_hits={}",
            source.label,
            source.rows,
            source.kept,
            source.dropped,
            source.legs_total,
            source.legs_with_hits
        );
    }
    for file in &summary.files {
        let status = match file.status {
            FileStatus::Written => "written",
            FileStatus::Unchanged => "unchanged",
        };
        println!("  {} ({} slips, {status})", file.path.display(), file.count);
    }
    println!("Sink: {:?}", summary.outcome);

    Ok(())
}
