//! The live event channel shared by all subscriptions against one store.
//!
//! The record store's realtime API works over a single server-sent-events
//! connection: the server assigns a client id in a `PB_CONNECT` event, after
//! which the client POSTs the full set of topics it wants to hear about.
//! Record events then arrive named by topic. The connection is opened lazily
//! on the first subscription, re-submitted when the topic set changes, torn
//! down when it empties, and re-established with a short delay if it drops
//! while subscriptions remain.

use crate::store::http::check_status;
use crate::store::{EventHandler, Unsubscribe};
use crate::sync::RecordEvent;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, trace, warn};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// The subscription key for a collection, with the filter riding along as
/// JSON-encoded options the way the record store's own clients send it.
pub(super) fn topic(collection: &str, filter: Option<String>) -> String {
    match filter {
        None => format!("{collection}/*"),
        Some(filter) => {
            let options = serde_json::json!({ "filter": filter });
            format!("{collection}/*?options={options}")
        }
    }
}

pub(super) struct RealtimeChannel {
    shared: Arc<Shared>,
}

struct Shared {
    base: Url,
    http: reqwest::Client,
    state: Mutex<ChannelState>,
    /// `Some` while a connection is established and identified.
    client_id: watch::Sender<Option<String>>,
    /// Pokes the reader to re-submit the topic set or close an empty
    /// connection.
    resync: Notify,
}

#[derive(Default)]
struct ChannelState {
    subs: HashMap<String, Vec<(u64, EventHandler)>>,
    next_handler: u64,
    reader_running: bool,
}

impl RealtimeChannel {
    pub(super) fn new(base: Url, http: reqwest::Client) -> Self {
        Self {
            shared: Arc::new(Shared {
                base,
                http,
                state: Mutex::new(ChannelState::default()),
                client_id: watch::channel(None).0,
                resync: Notify::new(),
            }),
        }
    }

    /// Registers a handler for `topic` and resolves once the channel is
    /// confirmed open and the topic set has been accepted. On failure the
    /// handler is removed again and nothing is left open that was not open
    /// before.
    pub(super) async fn subscribe(&self, topic: String, handler: EventHandler) -> Result<Unsubscribe> {
        let shared = &self.shared;
        let handler_id = {
            let mut state = shared.lock();
            let handler_id = state.next_handler;
            state.next_handler += 1;
            state.subs.entry(topic.clone()).or_default().push((handler_id, handler));
            if !state.reader_running {
                state.reader_running = true;
                let shared = Arc::clone(shared);
                tokio::spawn(run_reader(shared));
            }
            handler_id
        };

        if let Err(e) = self.confirm(&topic).await {
            // Roll back; the failed subscription must not leave a handler
            // behind to receive events.
            let mut state = shared.lock();
            remove_handler(&mut state, &topic, handler_id);
            drop(state);
            shared.resync.notify_one();
            return Err(e);
        }

        let shared = Arc::clone(shared);
        Ok(Unsubscribe::new(move || {
            let mut state = shared.lock();
            remove_handler(&mut state, &topic, handler_id);
            drop(state);
            shared.resync.notify_one();
        }))
    }

    /// Waits for the connection to identify itself, then submits the
    /// current topic set.
    async fn confirm(&self, topic: &str) -> Result<()> {
        let shared = &self.shared;
        let mut rx = shared.client_id.subscribe();
        let client_id = tokio::time::timeout(CONNECT_TIMEOUT, rx.wait_for(|id| id.is_some()))
            .await
            .map_err(|_| Error::transport("timed out waiting for the realtime connection"))?
            .map_err(|_| Error::transport("realtime connection closed while opening"))?
            .clone()
            .expect("wait_for guarantees an id");
        trace!("confirming subscription to {topic} as client {client_id}");
        submit(shared, &client_id).await
    }
}

fn remove_handler(state: &mut ChannelState, topic: &str, handler_id: u64) {
    if let Some(handlers) = state.subs.get_mut(topic) {
        handlers.retain(|(id, _)| *id != handler_id);
        if handlers.is_empty() {
            state.subs.remove(topic);
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().expect("realtime state lock poisoned")
    }

    fn topics(&self) -> Vec<String> {
        self.lock().subs.keys().cloned().collect()
    }
}

/// POSTs the full subscription set for this client.
async fn submit(shared: &Shared, client_id: &str) -> Result<()> {
    let mut url = shared.base.clone();
    url.set_path("/api/realtime");
    let body = serde_json::json!({
        "clientId": client_id,
        "subscriptions": shared.topics(),
    });
    check_status(shared.http.post(url).json(&body).send().await?).await?;
    Ok(())
}

/// Owns the SSE connection for as long as subscriptions exist.
async fn run_reader(shared: Arc<Shared>) {
    loop {
        {
            let mut state = shared.lock();
            if state.subs.is_empty() {
                state.reader_running = false;
                break;
            }
        }
        match read_stream(&shared).await {
            Ok(()) => trace!("realtime stream ended"),
            Err(e) => warn!("realtime connection failed: {e}"),
        }
        shared.client_id.send_replace(None);
        {
            let mut state = shared.lock();
            if state.subs.is_empty() {
                state.reader_running = false;
                break;
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
    shared.client_id.send_replace(None);
}

/// One connection: reads SSE frames and dispatches them, re-submitting the
/// topic set whenever it changes. Returns `Ok` when the server closes the
/// stream or the topic set empties.
async fn read_stream(shared: &Arc<Shared>) -> Result<()> {
    use futures::StreamExt;

    let mut url = shared.base.clone();
    url.set_path("/api/realtime");
    trace!("opening realtime connection to {url}");
    let response = shared
        .http
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await?;
    let mut stream = check_status(response).await?.bytes_stream();

    let mut buf: Vec<u8> = Vec::new();
    let mut event_name = String::new();
    let mut data = String::new();
    loop {
        tokio::select! {
            chunk = stream.next() => {
                let Some(chunk) = chunk else {
                    return Ok(());
                };
                buf.extend_from_slice(&chunk?);
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let text = String::from_utf8_lossy(&line);
                    let text = text.trim_end_matches(['\r', '\n']);
                    if text.is_empty() {
                        handle_frame(shared, &event_name, &data).await?;
                        event_name.clear();
                        data.clear();
                    } else if let Some(value) = text.strip_prefix("event:") {
                        event_name = value.trim_start().to_string();
                    } else if let Some(value) = text.strip_prefix("data:") {
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(value.trim_start());
                    }
                    // id: fields and comments are not needed here
                }
            }
            _ = shared.resync.notified() => {
                if shared.lock().subs.is_empty() {
                    return Ok(());
                }
                let client_id = shared.client_id.borrow().clone();
                if let Some(client_id) = client_id {
                    submit(shared, &client_id).await?;
                }
            }
        }
    }
}

/// Payload of the server's `PB_CONNECT` event.
#[derive(Debug, Deserialize)]
struct ConnectPayload {
    #[serde(rename = "clientId")]
    client_id: String,
}

async fn handle_frame(shared: &Arc<Shared>, event_name: &str, data: &str) -> Result<()> {
    if event_name.is_empty() && data.is_empty() {
        return Ok(());
    }
    if event_name == "PB_CONNECT" {
        let payload: ConnectPayload = serde_json::from_str(data)
            .map_err(|e| Error::decode("realtime connect payload", e))?;
        debug!("realtime connected as client {}", payload.client_id);
        shared.client_id.send_replace(Some(payload.client_id.clone()));
        return submit(shared, &payload.client_id).await;
    }

    let handlers: Vec<EventHandler> = {
        let state = shared.lock();
        match state.subs.get(event_name) {
            Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return Ok(()),
        }
    };
    match serde_json::from_str::<RecordEvent<Value>>(data) {
        Ok(event) => {
            for handler in handlers {
                handler(event.clone());
            }
        }
        Err(e) => warn!("dropping undecodable realtime event on '{event_name}': {e}"),
    }
    Ok(())
}
