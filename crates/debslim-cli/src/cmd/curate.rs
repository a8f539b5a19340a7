//! Curate command

use anyhow::{Context, Result};

use debslim_core::{CurationPolicy, PackageIndex, popcon};

use crate::CurateArgs;
use crate::cmd::fetch_source;

/// Build the curated package lists and write them into the output
/// directory: `packages.txt` (primary), `deps.txt` (dependencies), and
/// `all.txt` (the combined allow-list the filter consumes).
pub async fn curate(args: &CurateArgs) -> Result<()> {
    let mut policy = match &args.policy {
        Some(path) => CurationPolicy::load(path)
            .with_context(|| format!("loading policy from {}", path.display()))?,
        None => CurationPolicy::default(),
    };
    if let Some(budget) = args.primary_budget {
        policy.primary_budget = budget;
    }
    if let Some(budget) = args.dep_budget {
        policy.dependency_budget = budget;
    }
    if let Some(threshold) = args.threshold {
        policy.score_threshold = threshold;
    }

    let popcon_raw = fetch_source(&args.popcon)
        .await
        .context("fetching popularity data")?;
    let scores = popcon::parse(&popcon_raw, &args.popcon)?;
    tracing::info!(packages = scores.len(), "loaded popularity data");

    let index_source = args.index.clone().unwrap_or_else(|| {
        format!(
            "{}/dists/{}/main/binary-{}/Packages.gz",
            args.mirror, args.suite, args.arch
        )
    });
    let index_raw = fetch_source(&index_source)
        .await
        .context("fetching Packages index")?;
    let index = PackageIndex::parse(&index_raw, &index_source)?;
    tracing::info!(
        entries = index.len(),
        suite = args.suite,
        arch = args.arch,
        "parsed index"
    );

    let curated = debslim_core::curate(&index, &scores, &policy);
    curated
        .write_artifacts(&args.output_dir)
        .with_context(|| format!("writing artifacts to {}", args.output_dir.display()))?;

    println!(
        "Wrote {} primary + {} dependency packages to {}",
        curated.primary.len(),
        curated.dependencies.len(),
        args.output_dir.display()
    );
    Ok(())
}
