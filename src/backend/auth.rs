//! Account calls against the backend's auth endpoints.
//!
//! A successful sign-in (or a sign-up that returns a session) is kept on the
//! [`BackendClient`] so later table calls run as that user.

use chrono::{DateTime, Utc};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::client::BackendClient;
use super::error::{BackendError, BackendResult};
use crate::fetch::HttpClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

/// What a sign-up returns: always a user, plus a session when no email
/// confirmation is required.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthData {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl AuthData {
    fn from_value(value: Value) -> BackendResult<Self> {
        if value.get("access_token").is_some() {
            let session: Session =
                serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
            return Ok(Self {
                user: session.user.clone(),
                session: Some(session),
            });
        }
        let user = match value.get("user") {
            Some(inner) => serde_json::from_value(inner.clone()),
            None => serde_json::from_value(value),
        }
        .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Self {
            user: Some(user),
            session: None,
        })
    }
}

pub struct UserService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> UserService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    fn json_request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: &Value,
    ) -> BackendResult<reqwest::Request> {
        let url = self.client.endpoint(path, params)?;
        let mut req = self.client.request(method, url);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(body.to_string().into());
        Ok(req)
    }

    /// The signed-in user, or `None` without a session.
    pub async fn get_current_user(&self) -> BackendResult<Option<User>> {
        if self.client.access_token().is_none() {
            return Ok(None);
        }
        let url = self.client.endpoint("auth/v1/user", &[])?;
        let user = self
            .client
            .send_json(self.client.request(Method::GET, url))
            .await?;
        Ok(Some(user))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthData> {
        let body = json!({ "email": email, "password": password });
        let req = self.json_request(Method::POST, "auth/v1/signup", &[], &body)?;
        let value: Value = self.client.send_json(req).await?;
        let data = AuthData::from_value(value)?;
        if let Some(session) = &data.session {
            self.client.set_session(Some(session.clone()));
        }
        Ok(data)
    }

    /// Password sign-in.
    pub async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let body = json!({ "email": email, "password": password });
        let params = [("grant_type".to_string(), "password".to_string())];
        let req = self.json_request(Method::POST, "auth/v1/token", &params, &body)?;

        let session: Session = self.client.send_json(req).await?;
        self.client.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Ends the session on the server and forgets it locally. The local
    /// session is dropped even when the server call fails.
    pub async fn sign_out(&self) -> BackendResult<()> {
        if self.client.access_token().is_none() {
            return Ok(());
        }
        let req = self.json_request(Method::POST, "auth/v1/logout", &[], &json!({}))?;
        let result = self.client.send(req).await.map(|_| ());
        self.client.set_session(None);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeHttp;

    const SESSION: &str = r#"{
        "access_token": "jwt-1",
        "refresh_token": "r-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": {"id": "u1", "email": "test@example.com", "role": "authenticated"}
    }"#;

    fn client(fake: &FakeHttp) -> BackendClient<FakeHttp> {
        BackendClient::new(fake.clone(), "https://demo.example.co", "anon").unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_stores_session() {
        let fake = FakeHttp::new();
        fake.push_json(200, SESSION);
        fake.push_json(200, r#"{"id":"u1","email":"test@example.com"}"#);
        let c = client(&fake);

        let session = c.users().sign_in("test@example.com", "pw").await.unwrap();
        let user = c.users().get_current_user().await.unwrap().unwrap();

        assert_eq!(session.access_token, "jwt-1");
        assert_eq!(session.user.unwrap().extra["role"], "authenticated");
        assert_eq!(user.id, "u1");
        let sent = fake.requests();
        assert_eq!(sent[0].url.path(), "/auth/v1/token");
        assert_eq!(sent[0].url.query(), Some("grant_type=password"));
        assert_eq!(sent[1].headers["authorization"], "Bearer jwt-1");
    }

    #[tokio::test]
    async fn test_sign_up_without_session() {
        let fake = FakeHttp::new();
        fake.push_json(200, r#"{"id":"u2","email":"new@example.com"}"#);
        let c = client(&fake);

        let data = c.users().sign_up("new@example.com", "pw123456").await.unwrap();

        assert_eq!(data.user.unwrap().id, "u2");
        assert!(data.session.is_none());
        assert!(c.session().is_none());
        let body: Value = serde_json::from_str(fake.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "new@example.com");
    }

    #[tokio::test]
    async fn test_sign_up_with_session() {
        let fake = FakeHttp::new();
        fake.push_json(200, SESSION);
        let c = client(&fake);

        let data = c.users().sign_up("test@example.com", "pw").await.unwrap();

        assert_eq!(data.user.unwrap().id, "u1");
        assert_eq!(c.session().unwrap().access_token, "jwt-1");
    }

    #[tokio::test]
    async fn test_current_user_without_session_skips_call() {
        let fake = FakeHttp::new();
        let c = client(&fake);

        assert_eq!(c.users().get_current_user().await.unwrap(), None);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_on_error() {
        let fake = FakeHttp::new();
        fake.push_json(200, SESSION);
        fake.push_json(500, r#"{"msg":"boom"}"#);
        let c = client(&fake);

        c.users().sign_in("test@example.com", "pw").await.unwrap();
        let err = c.users().sign_out().await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(c.session().is_none());
        assert_eq!(fake.requests()[1].url.path(), "/auth/v1/logout");
    }

    #[tokio::test]
    async fn test_bad_credentials_are_returned() {
        let fake = FakeHttp::new();
        fake.push_json(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        let c = client(&fake);

        let err = c.users().sign_in("x@example.com", "bad").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(c.session().is_none());
    }
}
