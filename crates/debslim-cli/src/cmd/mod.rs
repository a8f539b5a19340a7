//! Command implementations.

pub mod curate;
pub mod filter;
pub mod publish;

use anyhow::{Context, Result, bail};

/// User agent for upstream fetches.
pub const USER_AGENT: &str = concat!("debslim/", env!("CARGO_PKG_VERSION"));

/// Fetch a data source given as an HTTP(S) URL or a local file path.
///
/// Fetch failure is fatal to the caller: curation never writes partial
/// artifacts from a half-loaded source.
pub async fn fetch_source(source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        tracing::info!(url = source, "fetching");
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .get(source)
            .send()
            .await
            .with_context(|| format!("failed to fetch {source}"))?;
        if !response.status().is_success() {
            bail!("HTTP {} fetching {source}", response.status());
        }
        Ok(response.bytes().await?.to_vec())
    } else {
        std::fs::read(source).with_context(|| format!("failed to read {source}"))
    }
}
