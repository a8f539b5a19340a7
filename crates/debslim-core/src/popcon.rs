//! Popularity signal parsing.
//!
//! The by-install popularity feed is a whitespace-delimited ranking, one
//! package per line: `rank name inst vote old recent no-files`. Only the
//! name and install-count tokens matter here.

use std::collections::HashMap;

use crate::index::{Codec, IndexError};

/// Parse a popularity feed into a name → install-count map.
///
/// The blob may be plain or gzip/xz compressed; detection reuses the index
/// codec table. Comment (`#`) and blank lines are skipped, as is any line
/// whose install count fails to parse. Malformed lines are a local matter,
/// never fatal.
///
/// # Errors
///
/// Returns [`IndexError::Decode`] if the compressed stream is corrupt.
pub fn parse(raw: &[u8], filename: &str) -> Result<HashMap<String, u64>, IndexError> {
    let body = Codec::detect(raw, filename).decompress(raw)?;
    let text = String::from_utf8_lossy(&body);

    let mut scores = HashMap::new();
    for line in text.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(_rank), Some(name), Some(inst)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Ok(count) = inst.parse::<u64>() else {
            continue;
        };
        scores.insert(name.to_string(), count);
    }
    tracing::debug!(packages = scores.len(), "loaded popularity signal");
    Ok(scores)
}
