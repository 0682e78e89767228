use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::FeedConfig;

/// Plain `reqwest` transport with the timeouts from [`FeedConfig`].
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(config: &FeedConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
