mod basic;
mod client;
pub mod auth;

#[cfg(test)]
pub(crate) mod testing;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;

/// Sends `req` and turns any non-2xx status into an error carrying the status
/// and the response body.
pub async fn send_checked<C: HttpClient + ?Sized>(
    client: &C,
    req: reqwest::Request,
) -> Result<reqwest::Response> {
    let method = req.method().clone();
    let path = req.url().path().to_string();

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("{method} {path} failed"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("API returned status {}: {}", status, body));
    }

    Ok(resp)
}

/// Like [`send_checked`], then decodes the JSON body as `T`.
pub async fn fetch_json<C: HttpClient + ?Sized, T: DeserializeOwned>(
    client: &C,
    req: reqwest::Request,
) -> Result<T> {
    let resp = send_checked(client, req).await?;
    resp.json::<T>()
        .await
        .map_err(|e| anyhow!("Failed to parse response: {}", e))
}
