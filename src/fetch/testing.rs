//! In-memory [`HttpClient`] used by unit tests.

use super::HttpClient;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: reqwest::Method,
    pub url: url::Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

enum Canned {
    Response(u16, String),
    TransportError,
}

#[derive(Clone, Default)]
pub struct FakeHttp {
    responses: Arc<Mutex<VecDeque<Canned>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Canned::Response(status, body.to_string()));
    }

    pub fn push_transport_error(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Canned::TransportError);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: req.method().clone(),
            url: req.url().clone(),
            headers: req.headers().clone(),
            body: req
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        });

        let canned = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Canned::Response(404, String::new()));

        match canned {
            Canned::Response(status, body) => {
                let resp = http::Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap();
                Ok(reqwest::Response::from(resp))
            }
            // A request that cannot be built is the simplest public way to get
            // a `reqwest::Error`.
            Canned::TransportError => Err(reqwest::Client::new()
                .get("not a url")
                .build()
                .unwrap_err()),
        }
    }
}
