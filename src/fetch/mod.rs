mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::debug;

use crate::error::{FeedError, Result};

/// Issues a GET for `url` and returns the body as text.
///
/// Non-success statuses are turned into [`FeedError::HttpStatus`] so XML
/// parsing only ever sees a real feed document.
pub async fn fetch_xml<C: HttpClient>(client: &C, url: reqwest::Url) -> Result<String> {
    debug!(url = %url, "Requesting feed");
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FeedError::HttpStatus { status, body });
    }

    let body = resp.text().await?;
    debug!(bytes = body.len(), "Feed body received");
    Ok(body)
}
