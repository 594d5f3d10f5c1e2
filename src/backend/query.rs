//! Minimal query builder for the backend's REST table API.
//!
//! Filters use the `column=op.value` convention, e.g. `user_id=eq.42`.
//! Writes ask for the affected rows back (`Prefer: return=representation`).

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;

use super::client::BackendClient;
use super::error::{BackendError, BackendResult};
use super::tables::Table;
use crate::fetch::HttpClient;

const PREFER: HeaderName = HeaderName::from_static("prefer");
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

pub struct Query<'a, C> {
    client: &'a BackendClient<C>,
    table: Table,
    params: Vec<(String, String)>,
}

impl<'a, C: HttpClient> Query<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>, table: Table) -> Self {
        Self {
            client,
            table,
            params: Vec::new(),
        }
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        let dir = match order {
            Order::Ascending => "asc",
            Order::Descending => "desc",
        };
        self.params.push(("order".to_string(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    fn build(&self, method: Method, extra: &[(String, String)]) -> BackendResult<Request> {
        let mut params = extra.to_vec();
        params.extend(self.params.iter().cloned());
        let url = self
            .client
            .endpoint(&format!("rest/v1/{}", self.table), &params)?;
        Ok(self.client.request(method, url))
    }

    fn with_body<B: Serialize + ?Sized>(mut req: Request, body: &B) -> BackendResult<Request> {
        let bytes = serde_json::to_vec(body).map_err(|e| BackendError::Decode(e.to_string()))?;
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(bytes.into());
        Ok(req)
    }

    /// Rows matching the filters, restricted to `columns`.
    pub async fn select<T: DeserializeOwned>(self, columns: &str) -> BackendResult<Vec<T>> {
        let req = self.build(Method::GET, &[("select".into(), columns.into())])?;
        self.client.send_json(req).await
    }

    /// Exactly one matching row; zero or several rows is an error from the
    /// backend.
    pub async fn single<T: DeserializeOwned>(self, columns: &str) -> BackendResult<T> {
        let mut req = self.build(Method::GET, &[("select".into(), columns.into())])?;
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        self.client.send_json(req).await
    }

    pub async fn insert<B, T>(self, rows: &B) -> BackendResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = Self::with_body(self.build(Method::POST, &[])?, rows)?;
        req.headers_mut()
            .insert(PREFER, HeaderValue::from_static("return=representation"));
        self.client.send_json(req).await
    }

    /// Insert, or merge into the row that collides on `on_conflict` columns.
    pub async fn upsert<B, T>(self, rows: &B, on_conflict: &str) -> BackendResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.build(Method::POST, &[("on_conflict".into(), on_conflict.into())])?;
        let mut req = Self::with_body(req, rows)?;
        req.headers_mut().insert(
            PREFER,
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        self.client.send_json(req).await
    }

    pub async fn update<B, T>(self, patch: &B) -> BackendResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = Self::with_body(self.build(Method::PATCH, &[])?, patch)?;
        req.headers_mut()
            .insert(PREFER, HeaderValue::from_static("return=representation"));
        self.client.send_json(req).await
    }

    pub async fn delete(self) -> BackendResult<()> {
        let mut req = self.build(Method::DELETE, &[])?;
        req.headers_mut()
            .insert(PREFER, HeaderValue::from_static("return=minimal"));
        self.client.send(req).await?;
        Ok(())
    }
}
