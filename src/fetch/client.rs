use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport used for every feed request. Swap in a recording client to
/// observe or stub requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
