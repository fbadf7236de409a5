//! Retrieval of the raw complaints file from disk or over HTTP.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, bail};
use tracing::{debug, info};

/// Downloads `url`, failing on non-success status codes.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("Fetching {} failed with status {}", url, status);
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Loads raw bytes from a local file path or an `http(s)` URL.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_source(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let client = BasicClient::new()?;
        fetch_bytes(&client, source).await?
    } else {
        debug!("Reading local file");
        tokio::fs::read(source).await?
    };
    info!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}
