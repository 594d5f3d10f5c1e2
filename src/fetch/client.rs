use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Every outbound call in the crate goes through
/// this seam so transports can be wrapped (headers) or faked (tests).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for std::sync::Arc<C> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
