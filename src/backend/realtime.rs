//! Change-notification channels over the backend's realtime websocket.
//!
//! Speaks the Phoenix channel protocol: a `phx_join` on
//! `realtime:<channel>` carrying the `postgres_changes` filters, then a
//! `heartbeat` on the `phoenix` topic every [`HEARTBEAT_INTERVAL`]. Every
//! `postgres_changes` message is handed to the caller's callback as it
//! arrives. There is no buffering and no reconnect: when the socket closes
//! the subscription ends.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::error::{BackendError, BackendResult};
use super::tables::Table;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    #[serde(rename = "*")]
    All,
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::All => "*",
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// Which row changes a channel wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub event: ChangeKind,
    pub schema: String,
    pub table: Table,
    /// Row filter such as `user_id=eq.42`.
    pub filter: Option<String>,
}

impl ChangeFilter {
    pub fn for_user(event: ChangeKind, table: Table, user_id: &str) -> Self {
        Self {
            event,
            schema: "public".to_string(),
            table,
            filter: Some(format!("user_id=eq.{user_id}")),
        }
    }

    fn to_json(&self) -> Value {
        let mut entry = json!({
            "event": self.event.as_str(),
            "schema": self.schema,
            "table": self.table.as_str(),
        });
        if let Some(filter) = &self.filter {
            entry["filter"] = Value::String(filter.clone());
        }
        entry
    }
}

/// One row change forwarded to the subscriber.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Value,
}

pub(crate) fn socket_url(project_url: &Url, api_key: &str) -> BackendResult<Url> {
    let mut url = project_url
        .join("realtime/v1/websocket")
        .map_err(|e| BackendError::Config(format!("realtime endpoint: {e}")))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(BackendError::Config(format!(
                "unsupported scheme for realtime: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| BackendError::Config(format!("cannot switch scheme to {scheme}")))?;
    url.query_pairs_mut()
        .append_pair("apikey", api_key)
        .append_pair("vsn", "1.0.0");
    Ok(url)
}

pub(crate) fn join_message(
    topic: &str,
    filters: &[ChangeFilter],
    access_token: Option<&str>,
    msg_ref: u64,
) -> Value {
    let mut payload = json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": filters.iter().map(ChangeFilter::to_json).collect::<Vec<_>>(),
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_string());
    }
    json!({
        "topic": topic,
        "event": "phx_join",
        "payload": payload,
        "ref": msg_ref.to_string(),
        "join_ref": msg_ref.to_string(),
    })
}

pub(crate) fn heartbeat_message(msg_ref: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": msg_ref.to_string(),
    })
}

pub(crate) fn leave_message(topic: &str, msg_ref: u64) -> Value {
    json!({
        "topic": topic,
        "event": "phx_leave",
        "payload": {},
        "ref": msg_ref.to_string(),
    })
}

/// Extracts the change carried by a `postgres_changes` frame for `topic`.
/// Replies, heartbeats, presence and system messages yield `None`.
pub(crate) fn parse_change(topic: &str, text: &str) -> Option<ChangeEvent> {
    let frame: Value = serde_json::from_str(text).ok()?;
    if frame.get("topic")?.as_str()? != topic {
        return None;
    }
    if frame.get("event")?.as_str()? != "postgres_changes" {
        return None;
    }
    serde_json::from_value(frame.get("payload")?.get("data")?.clone()).ok()
}

/// A live channel. Dropping it leaves the channel the same way
/// [`Subscription::unsubscribe`] does, without waiting.
pub struct Subscription {
    topic: String,
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Sends `phx_leave`, closes the socket and waits for the task to end.
    pub async fn unsubscribe(mut self) -> BackendResult<()> {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        self.task
            .await
            .map_err(|e| BackendError::Realtime(e.to_string()))
    }

    /// Waits until the server ends the channel.
    pub async fn closed(self) -> BackendResult<()> {
        let Subscription {
            close_tx, task, ..
        } = self;
        let result = task.await.map_err(|e| BackendError::Realtime(e.to_string()));
        drop(close_tx);
        result
    }
}

/// Realtime endpoint of one project.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    url: Url,
    access_token: Option<String>,
    heartbeat: Duration,
}

impl RealtimeClient {
    pub(crate) fn new(
        project_url: &Url,
        api_key: &str,
        access_token: Option<String>,
    ) -> BackendResult<Self> {
        Ok(Self {
            url: socket_url(project_url, api_key)?,
            access_token,
            heartbeat: HEARTBEAT_INTERVAL,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Joins `realtime:<channel>` with `filters` and forwards every change to
    /// `callback`.
    pub async fn subscribe<F>(
        &self,
        channel: &str,
        filters: Vec<ChangeFilter>,
        mut callback: F,
    ) -> BackendResult<Subscription>
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let (stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(self.url.as_str()))
            .await
            .map_err(|_| {
                BackendError::Realtime(format!("connection timeout after {CONNECT_TIMEOUT:?}"))
            })?
            .map_err(|e| BackendError::Realtime(e.to_string()))?;

        let topic = format!("realtime:{channel}");
        let (mut writer, mut reader) = stream.split();

        let join = join_message(&topic, &filters, self.access_token.as_deref(), 1);
        writer
            .send(Message::Text(join.to_string()))
            .await
            .map_err(|e| BackendError::Realtime(e.to_string()))?;

        let (close_tx, mut close_rx) = oneshot::channel::<()>();
        let heartbeat_every = self.heartbeat;
        let task_topic = topic.clone();

        let task = tokio::spawn(async move {
            let mut next_ref: u64 = 2;
            let mut heartbeat = tokio::time::interval(heartbeat_every);
            heartbeat.tick().await;

            loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        let leave = leave_message(&task_topic, next_ref);
                        let _ = writer.send(Message::Text(leave.to_string())).await;
                        let _ = writer.close().await;
                        break;
                    }
                    _ = heartbeat.tick() => {
                        let beat = heartbeat_message(next_ref);
                        next_ref += 1;
                        if writer.send(Message::Text(beat.to_string())).await.is_err() {
                            break;
                        }
                    }
                    frame = reader.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(change) = parse_change(&task_topic, &text) {
                                callback(change);
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = writer.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                }
            }
        });

        Ok(Subscription {
            topic,
            close_tx: Some(close_tx),
            task,
        })
    }

    /// Every change to the user's rows in `api_keys`.
    pub async fn subscribe_to_user_data<F>(&self, user_id: &str, callback: F) -> BackendResult<Subscription>
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let filter = ChangeFilter::for_user(ChangeKind::All, Table::ApiKeys, user_id);
        self.subscribe("user_data", vec![filter], callback).await
    }

    /// New rows in the user's `agent_logs`.
    pub async fn subscribe_to_agent_logs<F>(&self, user_id: &str, callback: F) -> BackendResult<Subscription>
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let filter = ChangeFilter::for_user(ChangeKind::Insert, Table::AgentLogs, user_id);
        self.subscribe("agent_logs", vec![filter], callback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_switches_scheme() {
        let project = Url::parse("https://demo.example.co/").unwrap();
        let url = socket_url(&project, "anon").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://demo.example.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );

        let local = Url::parse("http://localhost:54321/").unwrap();
        assert_eq!(socket_url(&local, "k").unwrap().scheme(), "ws");
    }

    #[test]
    fn test_join_message_carries_filter() {
        let filter = ChangeFilter::for_user(ChangeKind::All, Table::ApiKeys, "u1");
        let msg = join_message("realtime:user_data", &[filter], Some("jwt"), 1);

        assert_eq!(msg["event"], "phx_join");
        assert_eq!(msg["topic"], "realtime:user_data");
        assert_eq!(msg["ref"], "1");
        assert_eq!(msg["payload"]["access_token"], "jwt");
        let change = &msg["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "*");
        assert_eq!(change["schema"], "public");
        assert_eq!(change["table"], "api_keys");
        assert_eq!(change["filter"], "user_id=eq.u1");
    }

    #[test]
    fn test_agent_log_filter_is_insert_only() {
        let filter = ChangeFilter::for_user(ChangeKind::Insert, Table::AgentLogs, "u9");
        assert_eq!(filter.to_json()["event"], "INSERT");
        assert_eq!(filter.to_json()["table"], "agent_logs");
    }

    #[test]
    fn test_heartbeat_uses_phoenix_topic() {
        let msg = heartbeat_message(7);
        assert_eq!(msg["topic"], "phoenix");
        assert_eq!(msg["event"], "heartbeat");
        assert_eq!(msg["ref"], "7");
    }

    #[test]
    fn test_parse_change_frame() {
        let frame = r#"{
            "topic": "realtime:user_data",
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "schema": "public",
                    "table": "api_keys",
                    "commit_timestamp": "2025-01-01T00:00:00Z",
                    "type": "UPDATE",
                    "record": {"service": "openai", "user_id": "u1"},
                    "old_record": {"id": 1},
                    "columns": []
                },
                "ids": [123]
            },
            "ref": null
        }"#;

        let change = parse_change("realtime:user_data", frame).unwrap();
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.table, "api_keys");
        assert_eq!(change.record["service"], "openai");
    }

    #[test]
    fn test_parse_ignores_other_frames() {
        let reply = r#"{"topic":"realtime:user_data","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":"1"}"#;
        assert!(parse_change("realtime:user_data", reply).is_none());

        let other_topic = r#"{"topic":"realtime:agent_logs","event":"postgres_changes","payload":{"data":{"schema":"public","table":"agent_logs","type":"INSERT"}}}"#;
        assert!(parse_change("realtime:user_data", other_topic).is_none());
        assert!(parse_change("realtime:agent_logs", other_topic).is_some());

        assert!(parse_change("realtime:user_data", "garbage").is_none());
    }

    /// Accepts one websocket connection on a random local port and hands it
    /// to `script`, which returns every text frame the client sent.
    async fn local_server<F, Fut>(script: F) -> (Url, JoinHandle<Vec<Value>>)
    where
        F: FnOnce(
                tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
            ) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = Vec<Value>> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            script(ws).await
        });
        (Url::parse(&format!("http://{addr}/")).unwrap(), server)
    }

    fn text_frame(message: Message) -> Option<Value> {
        match message {
            Message::Text(text) => serde_json::from_str(&text).ok(),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_subscribe_forwards_changes_and_leaves() {
        let (project, server) = local_server(|mut ws| async move {
            let mut received = Vec::new();
            let join = text_frame(ws.next().await.unwrap().unwrap()).unwrap();
            received.push(join);

            let change = json!({
                "topic": "realtime:user_data",
                "event": "postgres_changes",
                "payload": {
                    "data": {
                        "schema": "public",
                        "table": "api_keys",
                        "type": "INSERT",
                        "record": {"service": "openai", "user_id": "u1"}
                    }
                },
                "ref": null
            });
            ws.send(Message::Text(change.to_string())).await.unwrap();

            while let Some(Ok(message)) = ws.next().await {
                if let Some(frame) = text_frame(message) {
                    let leaving = frame["event"] == "phx_leave";
                    received.push(frame);
                    if leaving {
                        break;
                    }
                }
            }
            received
        })
        .await;

        let client = RealtimeClient::new(&project, "anon", Some("jwt".to_string())).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = client
            .subscribe_to_user_data("u1", move |change| {
                let _ = tx.send(change);
            })
            .await
            .unwrap();
        assert_eq!(subscription.topic(), "realtime:user_data");

        let change = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.record["service"], "openai");

        subscription.unsubscribe().await.unwrap();

        let frames = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        let join = &frames[0];
        assert_eq!(join["event"], "phx_join");
        assert_eq!(join["topic"], "realtime:user_data");
        assert_eq!(join["payload"]["access_token"], "jwt");
        assert_eq!(
            join["payload"]["config"]["postgres_changes"][0]["filter"],
            "user_id=eq.u1"
        );
        let leave = frames.last().unwrap();
        assert_eq!(leave["event"], "phx_leave");
        assert_eq!(leave["topic"], "realtime:user_data");
    }

    #[tokio::test]
    async fn test_server_close_ends_subscription() {
        let (project, server) = local_server(|mut ws| async move {
            let join = text_frame(ws.next().await.unwrap().unwrap()).unwrap();
            ws.close(None).await.unwrap();
            vec![join]
        })
        .await;

        let client = RealtimeClient::new(&project, "anon", None).unwrap();
        let subscription = client
            .subscribe_to_agent_logs("u9", |_| panic!("no change expected"))
            .await
            .unwrap();

        timeout(Duration::from_secs(5), subscription.closed())
            .await
            .unwrap()
            .unwrap();

        let frames = server.await.unwrap();
        assert_eq!(frames[0]["topic"], "realtime:agent_logs");
        assert_eq!(
            frames[0]["payload"]["config"]["postgres_changes"][0]["event"],
            "INSERT"
        );
        assert!(frames[0]["payload"].get("access_token").is_none());
    }
}
