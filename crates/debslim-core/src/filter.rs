//! Stanza-level index filtering.
//!
//! Projects a raw Packages index down to an allow-set of names: stanzas are
//! kept or dropped whole, byte-for-byte, in original order. Small indexes
//! (supplementary components with a handful of packages) pass through
//! unfiltered so an unrelated allow-list cannot empty them.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::index::{Codec, IndexError};

/// Indexes with fewer stanzas than this are not worth filtering and pass
/// through unchanged.
pub const PASSTHROUGH_THRESHOLD: usize = 100;

const PKG_PREFIX: &[u8] = b"Package: ";

/// Errors raised while filtering an index file.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The input blob could not be decoded.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Atomic rename of the output file failed.
    #[error("failed to persist output: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Per-file filtering outcome.
#[derive(Debug, Clone, Copy)]
pub struct FilterStats {
    /// Stanza count in the input.
    pub total: usize,
    /// Stanza count in the output.
    pub kept: usize,
    /// Whether the input was below the passthrough threshold.
    pub passthrough: bool,
}

/// One `(input, output)` pair for batch filtering.
#[derive(Debug, Clone)]
pub struct FilterJob {
    /// Path of the raw index to read.
    pub input: PathBuf,
    /// Path the filtered index is written to.
    pub output: PathBuf,
}

/// Load a newline-separated allow-list into a byte-keyed set.
///
/// Stanza name matching happens on raw bytes, so the set is keyed by bytes
/// rather than strings. Empty lines are skipped.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read.
pub fn load_allow_list(path: &Path) -> io::Result<HashSet<Vec<u8>>> {
    let content = std::fs::read(path)?;
    Ok(content
        .split(|&b| b == b'\n')
        .filter(|line| !line.is_empty())
        .map(<[u8]>::to_vec)
        .collect())
}

/// Filter a raw index blob against an allow-set.
///
/// Detects and unwraps the container, counts stanzas, and either passes the
/// body through unchanged (below [`PASSTHROUGH_THRESHOLD`]) or keeps exactly
/// the stanzas whose `Package` name is in `allowed`, verbatim and in
/// original order, joined by blank lines with a trailing newline. The
/// output is re-wrapped in the same container format as the input.
///
/// # Errors
///
/// Returns [`FilterError::Index`] if the container cannot be decoded.
pub fn filter_index(
    raw: &[u8],
    filename: &str,
    allowed: &HashSet<Vec<u8>>,
) -> Result<(Vec<u8>, FilterStats), FilterError> {
    let codec = Codec::detect(raw, filename);
    let body = codec.decompress(raw)?;
    let total = count_stanzas(&body);

    if total < PASSTHROUGH_THRESHOLD {
        let stats = FilterStats {
            total,
            kept: total,
            passthrough: true,
        };
        return Ok((codec.compress(&body)?, stats));
    }

    let filtered = filter_stanzas(&body, allowed);
    let stats = FilterStats {
        total,
        kept: count_stanzas(&filtered),
        passthrough: false,
    };
    Ok((codec.compress(&filtered)?, stats))
}

/// Filter one index file on disk, writing the output atomically.
///
/// # Errors
///
/// Returns [`FilterError`] if the input cannot be read or decoded, or the
/// output cannot be written.
pub fn filter_file(
    input: &Path,
    output: &Path,
    allowed: &HashSet<Vec<u8>>,
) -> Result<FilterStats, FilterError> {
    let raw = std::fs::read(input)?;
    let (filtered, stats) = filter_index(&raw, &input.to_string_lossy(), allowed)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&filtered)?;
    tmp.persist(output)?;
    Ok(stats)
}

/// Filter many independent files against one loaded allow-set.
///
/// A failing job is reported in the result list and does not abort the
/// remaining jobs; only the caller decides whether any failure is fatal.
pub fn run_batch(
    jobs: &[FilterJob],
    allowed: &HashSet<Vec<u8>>,
) -> Vec<(PathBuf, Result<FilterStats, FilterError>)> {
    jobs.iter()
        .map(|job| {
            let result = filter_file(&job.input, &job.output, allowed);
            if let Err(error) = &result {
                tracing::warn!(input = %job.input.display(), %error, "filter job failed");
            }
            (job.input.clone(), result)
        })
        .collect()
}

/// Count stanzas the same way [`filter_stanzas`] matches them: one per
/// blank-line-delimited block carrying a `Package` field. A malformed
/// stanza repeating its `Package` line still counts once, so the
/// passthrough decision and the reported stats stay consistent.
fn count_stanzas(body: &[u8]) -> usize {
    split_stanzas(body)
        .into_iter()
        .filter(|stanza| {
            stanza
                .split(|&b| b == b'\n')
                .any(|line| line.starts_with(PKG_PREFIX))
        })
        .count()
}

/// Split on blank-line boundaries, non-overlapping left to right.
fn split_stanzas(body: &[u8]) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < body.len() {
        if body[i] == b'\n' && body[i + 1] == b'\n' {
            parts.push(&body[start..i]);
            start = i + 2;
            i += 2;
        } else {
            i += 1;
        }
    }
    parts.push(&body[start..]);
    parts
}

fn filter_stanzas(body: &[u8], allowed: &HashSet<Vec<u8>>) -> Vec<u8> {
    let mut kept: Vec<&[u8]> = Vec::new();
    for stanza in split_stanzas(body) {
        if stanza.is_empty() {
            continue;
        }
        // Scan only the leading lines until the name field shows up; the
        // rest of a kept stanza is emitted, never parsed.
        for line in stanza.split(|&b| b == b'\n') {
            if let Some(name) = line.strip_prefix(PKG_PREFIX) {
                if allowed.contains(name) {
                    kept.push(stanza);
                }
                break;
            }
        }
    }
    let mut out = kept.join(&b"\n\n"[..]);
    if !out.is_empty() && !out.ends_with(b"\n") {
        out.push(b'\n');
    }
    out
}
