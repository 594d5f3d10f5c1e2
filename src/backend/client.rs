use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, Response};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use url::Url;

use super::auth::Session;
use super::error::{BackendError, BackendResult};
use super::query::Query;
use super::realtime::RealtimeClient;
use super::services::{
    AgentLogService, ApiKeyService, HealthService, NewsService, PreferenceService,
    ReflectionService, TaskService, UserService, WeatherService,
};
use super::tables::Table;
use crate::fetch::HttpClient;
use crate::fetch::auth::ApiKey;

/// Handle on the hosted backend: table CRUD, auth and realtime.
///
/// Every request carries the project key in an `apikey` header and a bearer
/// token, which is the signed-in session's access token when there is one and
/// the project key otherwise.
pub struct BackendClient<C> {
    http: ApiKey<C>,
    project_url: Url,
    api_key: String,
    session: RwLock<Option<Session>>,
}

impl<C: HttpClient> BackendClient<C> {
    pub fn new(http: C, project_url: &str, api_key: &str) -> BackendResult<Self> {
        let project_url = Url::parse(&format!("{}/", project_url.trim_end_matches('/')))
            .map_err(|e| BackendError::Config(format!("project URL '{project_url}': {e}")))?;
        let http = ApiKey::new(http, "apikey", api_key)
            .map_err(|e| BackendError::Config(e.to_string()))?;
        Ok(Self {
            http,
            project_url,
            api_key: api_key.to_string(),
            session: RwLock::new(None),
        })
    }

    pub fn project_url(&self) -> &Url {
        &self.project_url
    }

    /// Starts a query against `table`.
    pub fn from(&self, table: Table) -> Query<'_, C> {
        Query::new(self, table)
    }

    pub fn users(&self) -> UserService<'_, C> {
        UserService::new(self)
    }

    pub fn api_keys(&self) -> ApiKeyService<'_, C> {
        ApiKeyService::new(self)
    }

    pub fn agent_logs(&self) -> AgentLogService<'_, C> {
        AgentLogService::new(self)
    }

    pub fn preferences(&self) -> PreferenceService<'_, C> {
        PreferenceService::new(self)
    }

    pub fn news(&self) -> NewsService<'_, C> {
        NewsService::new(self)
    }

    pub fn weather(&self) -> WeatherService<'_, C> {
        WeatherService::new(self)
    }

    pub fn health(&self) -> HealthService<'_, C> {
        HealthService::new(self)
    }

    pub fn tasks(&self) -> TaskService<'_, C> {
        TaskService::new(self)
    }

    pub fn reflections(&self) -> ReflectionService<'_, C> {
        ReflectionService::new(self)
    }

    /// Realtime endpoint for this project, authorised with the current
    /// session token if signed in.
    pub fn realtime(&self) -> BackendResult<RealtimeClient> {
        RealtimeClient::new(&self.project_url, &self.api_key, self.access_token())
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        if let Ok(mut guard) = self.session.write() {
            *guard = session;
        }
    }

    pub(crate) fn access_token(&self) -> Option<String> {
        self.session().map(|s| s.access_token)
    }

    /// `{project}/{path}` with `params` appended as query pairs.
    pub(crate) fn endpoint(&self, path: &str, params: &[(String, String)]) -> BackendResult<Url> {
        let mut url = self
            .project_url
            .join(path)
            .map_err(|e| BackendError::Config(format!("endpoint '{path}': {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> Request {
        let mut req = Request::new(method, url);
        let token = self
            .access_token()
            .unwrap_or_else(|| self.api_key.clone());
        if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            value.set_sensitive(true);
            req.headers_mut().insert(AUTHORIZATION, value);
        }
        req
    }

    /// Sends `req`; non-2xx statuses become [`BackendError::Api`].
    pub(crate) async fn send(&self, req: Request) -> BackendResult<Response> {
        let resp = self
            .http
            .execute(req)
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::from_response(status.as_u16(), &body));
        }
        Ok(resp)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, req: Request) -> BackendResult<T> {
        let resp = self.send(req).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}
