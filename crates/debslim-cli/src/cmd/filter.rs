//! Filter command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use debslim_core::{FilterJob, FilterStats, filter_file, load_allow_list, run_batch};

use crate::FilterArgs;

/// Filter one index file or a TSV batch of them against an allow-list.
///
/// The allow-list is loaded once; in batch mode a failing job is reported
/// and the remaining jobs still run, but any failure makes the overall
/// command exit non-zero.
pub fn filter(args: &FilterArgs) -> Result<()> {
    let allowed = load_allow_list(&args.allowed)
        .with_context(|| format!("loading allow-list from {}", args.allowed.display()))?;
    tracing::info!(names = allowed.len(), "loaded allow-list");

    if let Some(batch) = &args.batch {
        let jobs = load_batch_file(batch)?;
        tracing::info!(jobs = jobs.len(), "running batch filter");

        let mut failures = 0;
        for (input, result) in run_batch(&jobs, &allowed) {
            match result {
                Ok(stats) => report(&input, stats, args.stats),
                Err(_) => failures += 1,
            }
        }
        if failures > 0 {
            bail!("{failures} of {} filter jobs failed", jobs.len());
        }
        return Ok(());
    }

    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        bail!("either --batch or both --input and --output are required");
    };
    let stats = filter_file(input, output, &allowed)
        .with_context(|| format!("filtering {}", input.display()))?;
    report(input, stats, args.stats);
    Ok(())
}

fn load_batch_file(path: &Path) -> Result<Vec<FilterJob>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch file {}", path.display()))?;

    let mut jobs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((input, output)) = line.split_once('\t') else {
            tracing::warn!(line, "skipping malformed batch line");
            continue;
        };
        jobs.push(FilterJob {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        });
    }
    Ok(jobs)
}

fn report(input: &Path, stats: FilterStats, verbose: bool) {
    if !verbose {
        return;
    }
    if stats.passthrough {
        eprintln!(
            "  {}: {} packages (passthrough)",
            input.display(),
            stats.total
        );
    } else {
        let pct = if stats.total > 0 {
            100.0 - (stats.kept as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        eprintln!(
            "  {}: {} -> {} packages ({pct:.0}% reduction)",
            input.display(),
            stats.total,
            stats.kept
        );
    }
}
