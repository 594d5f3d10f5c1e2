use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// `header_name` is the header field to set (e.g. `"apikey"` for the hosted
/// backend). The header is only written when the request does not already
/// carry it, so per-request overrides win.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut value = HeaderValue::from_str(key).context("API key is not a valid header value")?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Uses `Authorization: Bearer <key>`.
    pub fn bearer(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, AUTHORIZATION.as_str(), &format!("Bearer {key}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if !req.headers().contains_key(&self.header_name) {
            req.headers_mut()
                .insert(self.header_name.clone(), self.value.clone());
        }
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeHttp;

    #[tokio::test]
    async fn test_injects_header() {
        let fake = FakeHttp::new();
        fake.push_json(200, "{}");
        let client = ApiKey::new(fake.clone(), "apikey", "anon-key").unwrap();

        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost/rest/v1/tasks".parse().unwrap(),
        );
        client.execute(req).await.unwrap();

        let sent = fake.requests();
        assert_eq!(sent[0].headers["apikey"], "anon-key");
    }

    #[tokio::test]
    async fn test_existing_header_wins() {
        let fake = FakeHttp::new();
        fake.push_json(200, "{}");
        let client = ApiKey::bearer(fake.clone(), "anon-key").unwrap();

        let mut req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost/auth/v1/user".parse().unwrap(),
        );
        req.headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer session"));
        client.execute(req).await.unwrap();

        assert_eq!(fake.requests()[0].headers["authorization"], "Bearer session");
    }

    #[test]
    fn test_rejects_bad_header_name() {
        assert!(ApiKey::new(FakeHttp::new(), "bad header", "k").is_err());
    }
}
