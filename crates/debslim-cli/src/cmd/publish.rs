//! Publish command

use anyhow::{Context, Result, bail};
use opendal::{Operator, services::S3};

use debslim_core::{Publisher, collect_tree};

use crate::PublishArgs;

/// Publish a local artifact tree to the object store, reconciling the
/// remote key space to match it exactly.
pub async fn publish(args: &PublishArgs) -> Result<()> {
    let op = build_operator(args)?;

    let objects = collect_tree(&args.dir)
        .with_context(|| format!("collecting artifact tree from {}", args.dir.display()))?;
    tracing::info!(objects = objects.len(), "collected local tree");

    let report = Publisher::new(op)
        .dry_run(args.dry_run)
        .batch_size(args.batch_size)
        .sync(objects)
        .await
        .context("publishing artifact tree")?;

    println!(
        "Uploaded {} objects, deleted {} stale",
        report.uploaded, report.deleted
    );
    Ok(())
}

fn build_operator(args: &PublishArgs) -> Result<Operator> {
    let Some(bucket) = setting(args.bucket.as_deref(), "DEBSLIM_STORE_BUCKET") else {
        bail!("--bucket is required (or set DEBSLIM_STORE_BUCKET)");
    };
    let Some(endpoint) = setting(args.endpoint.as_deref(), "DEBSLIM_STORE_ENDPOINT") else {
        bail!("--endpoint is required (or set DEBSLIM_STORE_ENDPOINT)");
    };

    let mut builder = S3::default();
    builder.bucket(&bucket);
    builder.endpoint(&endpoint);
    builder.region("auto");
    if let Some(access_key) = setting(args.access_key.as_deref(), "DEBSLIM_STORE_ACCESS_KEY") {
        builder.access_key_id(&access_key);
    }
    if let Some(secret_key) = setting(args.secret_key.as_deref(), "DEBSLIM_STORE_SECRET_KEY") {
        builder.secret_access_key(&secret_key);
    }

    Ok(Operator::new(builder)?.finish())
}

fn setting(flag: Option<&str>, env_var: &str) -> Option<String> {
    flag.map(ToString::to_string)
        .or_else(|| std::env::var(env_var).ok())
}
