use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Request};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fetch::{HttpClient, fetch_json, send_checked};
use crate::services::keys_api::{
    Credential, KeyDetail, KeyMap, KeysApi, ServiceInfo, TestOutcome,
};

#[derive(Deserialize)]
struct TemplateResponse {
    template: String,
}

#[derive(Deserialize)]
struct ServicesResponse {
    services: Vec<ServiceInfo>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the `/api/keys` REST surface.
///
/// Service names are spliced into the path as-is; the only escaping applied
/// is what URL parsing does on its own.
pub struct RestKeysClient<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> RestKeysClient<C> {
    pub fn new(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<Request> {
        let url = format!("{}{}", self.base_url, path);
        let url: reqwest::Url = url
            .parse()
            .with_context(|| format!("invalid request URL '{url}'"))?;
        Ok(Request::new(method, url))
    }

    fn with_json<B: Serialize>(mut req: Request, body: &B) -> Result<Request> {
        let body = serde_json::to_vec(body)?;
        req.headers_mut().insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        *req.body_mut() = Some(body.into());
        Ok(req)
    }

    /// `PUT /api/keys/{service}`: replaces the key of an existing service.
    pub async fn update_key(&self, service: &str, key: &str) -> Result<()> {
        let req = self.request(Method::PUT, &format!("/api/keys/{service}"))?;
        let credential = Credential {
            service: service.to_string(),
            key: key.to_string(),
        };
        let req = Self::with_json(req, &credential)?;
        send_checked(&self.client, req).await?;
        debug!(service, "Key updated");
        Ok(())
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus> {
        let req = self.request(Method::GET, "/health")?;
        fetch_json(&self.client, req).await
    }
}

#[async_trait]
impl<C: HttpClient> KeysApi for RestKeysClient<C> {
    async fn list_keys(&self) -> Result<KeyMap> {
        let req = self.request(Method::GET, "/api/keys")?;
        let keys: KeyMap = fetch_json(&self.client, req).await?;
        debug!(count = keys.len(), "Key list fetched");
        Ok(keys)
    }

    async fn save_key(&self, credential: &Credential) -> Result<()> {
        let req = self.request(Method::POST, "/api/keys")?;
        let req = Self::with_json(req, credential)?;
        send_checked(&self.client, req).await?;
        Ok(())
    }

    async fn delete_key(&self, service: &str) -> Result<()> {
        let req = self.request(Method::DELETE, &format!("/api/keys/{service}"))?;
        send_checked(&self.client, req).await?;
        Ok(())
    }

    async fn test_key(&self, service: &str) -> Result<TestOutcome> {
        let req = self.request(Method::POST, &format!("/api/keys/{service}/test"))?;
        fetch_json(&self.client, req).await
    }

    async fn config_template(&self) -> Result<String> {
        let req = self.request(Method::GET, "/api/config/template")?;
        let resp: TemplateResponse = fetch_json(&self.client, req).await?;
        Ok(resp.template)
    }

    async fn get_key(&self, service: &str) -> Result<KeyDetail> {
        let req = self.request(Method::GET, &format!("/api/keys/{service}"))?;
        fetch_json(&self.client, req).await
    }

    async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        let req = self.request(Method::GET, "/api/services")?;
        let resp: ServicesResponse = fetch_json(&self.client, req).await?;
        Ok(resp.services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeHttp;

    fn client(fake: &FakeHttp) -> RestKeysClient<FakeHttp> {
        RestKeysClient::new(fake.clone(), "http://localhost:8000/")
    }

    #[tokio::test]
    async fn test_list_keys_parses_object() {
        let fake = FakeHttp::new();
        fake.push_json(200, r#"{"openai":"sk-1","anthropic":"sk-ant-2"}"#);

        let keys = client(&fake).list_keys().await.unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(keys["openai"], "sk-1");
        let sent = fake.requests();
        assert_eq!(sent[0].method, Method::GET);
        assert_eq!(sent[0].url.as_str(), "http://localhost:8000/api/keys");
    }

    #[tokio::test]
    async fn test_save_key_posts_json_body() {
        let fake = FakeHttp::new();
        fake.push_json(200, r#"{"status":"success"}"#);

        let cred = Credential {
            service: "openai".to_string(),
            key: "sk-1".to_string(),
        };
        client(&fake).save_key(&cred).await.unwrap();

        let sent = fake.requests();
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[0].url.path(), "/api/keys");
        assert_eq!(sent[0].headers["content-type"], "application/json");
        let body: serde_json::Value =
            serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"service": "openai", "key": "sk-1"}));
    }

    #[tokio::test]
    async fn test_save_key_surfaces_status_and_body() {
        let fake = FakeHttp::new();
        fake.push_json(500, r#"{"error":"disk full"}"#);

        let cred = Credential {
            service: "openai".to_string(),
            key: "sk-1".to_string(),
        };
        let err = client(&fake).save_key(&cred).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("500"), "{msg}");
        assert!(msg.contains("disk full"), "{msg}");
    }

    #[tokio::test]
    async fn test_update_key_puts_to_service_path() {
        let fake = FakeHttp::new();
        fake.push_json(200, r#"{"service":"openai","status":"success"}"#);

        client(&fake).update_key("openai", "sk-2").await.unwrap();

        let sent = fake.requests();
        assert_eq!(sent[0].method, Method::PUT);
        assert_eq!(sent[0].url.path(), "/api/keys/openai");
        let body: serde_json::Value =
            serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"service": "openai", "key": "sk-2"}));
    }

    #[tokio::test]
    async fn test_update_missing_service_is_error() {
        let fake = FakeHttp::new();
        fake.push_json(404, r#"{"detail":"not found"}"#);

        let err = client(&fake).update_key("nope", "k").await.unwrap_err();
        assert!(err.to_string().contains("404"), "{err}");
    }

    #[tokio::test]
    async fn test_delete_and_test_paths() {
        let fake = FakeHttp::new();
        fake.push_json(200, "{}");
        fake.push_json(200, r#"{"status":"success"}"#);

        let c = client(&fake);
        c.delete_key("news_api").await.unwrap();
        let outcome = c.test_key("news_api").await.unwrap();

        assert!(outcome.is_success());
        let sent = fake.requests();
        assert_eq!(sent[0].method, Method::DELETE);
        assert_eq!(sent[0].url.path(), "/api/keys/news_api");
        assert_eq!(sent[1].method, Method::POST);
        assert_eq!(sent[1].url.path(), "/api/keys/news_api/test");
    }

    #[tokio::test]
    async fn test_config_template_unwraps_field() {
        let fake = FakeHttp::new();
        fake.push_json(200, r#"{"template":"{\"api_keys\":{}}"}"#);

        let template = client(&fake).config_template().await.unwrap();
        assert_eq!(template, r#"{"api_keys":{}}"#);
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let fake = FakeHttp::new();
        fake.push_transport_error();

        let err = client(&fake).list_keys().await.unwrap_err();
        assert!(err.to_string().contains("GET /api/keys failed"));
    }

    #[tokio::test]
    async fn test_services_and_health() {
        let fake = FakeHttp::new();
        fake.push_json(
            200,
            r#"{"services":[{"name":"openai","description":"OpenAI API"}]}"#,
        );
        fake.push_json(200, r#"{"status":"healthy","message":"ok"}"#);

        let c = client(&fake);
        let services = c.list_services().await.unwrap();
        let health = c.health().await.unwrap();

        assert_eq!(services[0].name, "openai");
        assert_eq!(health.status, "healthy");
    }
}
