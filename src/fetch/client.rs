use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends a prepared request.
///
/// Wrappers such as [`crate::fetch::auth::UrlParam`] decorate a request and
/// delegate to an inner client, so credentials stay out of the Scorecard
/// query code.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
