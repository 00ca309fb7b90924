//! HTTP access to the College Scorecard API.

mod basic;
mod client;
pub mod auth;
pub mod scorecard;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};

/// GETs `url` and returns the body. Non-2xx responses are errors that
/// carry the status and body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: reqwest::Url) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client
        .execute(req)
        .await
        .context("failed to send request")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("API returned status {}: {}", status, body);
    }

    Ok(resp.bytes().await?.to_vec())
}
