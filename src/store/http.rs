//! Implements `RecordStore` against the record store's HTTP API.

use crate::store::realtime::{topic, RealtimeChannel};
use crate::store::{EventHandler, ListQuery, RecordStore, Unsubscribe};
use crate::sync::CancelToken;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;
use url::Url;

/// Page size used when walking a full listing.
const PER_PAGE: u32 = 500;

/// Talks to a PocketBase-style record store: paged filtered listings, CRUD
/// by id, and a shared server-sent-events channel for subscriptions.
pub struct HttpStore {
    base: Url,
    http: reqwest::Client,
    realtime: RealtimeChannel,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::transport(format!("invalid record store URL '{base_url}': {e}")))?;
        let http = reqwest::Client::new();
        Ok(Self {
            realtime: RealtimeChannel::new(base.clone(), http.clone()),
            base,
            http,
        })
    }

    fn records_url(&self, collection: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("/api/collections/{collection}/records"));
        url
    }

    fn record_url(&self, collection: &str, id: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("/api/collections/{collection}/records/{id}"));
        url
    }

    /// Walks every page of a listing. Run inside a `select!` against the
    /// cancel token by [`RecordStore::list`].
    async fn fetch_all(&self, collection: &str, query: &ListQuery) -> Result<Vec<Value>> {
        let per_page = query.limit.unwrap_or(PER_PAGE);
        let mut page = 1u32;
        let mut items = Vec::new();
        loop {
            let mut url = self.records_url(collection);
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("page", &page.to_string());
                pairs.append_pair("perPage", &per_page.to_string());
                pairs.append_pair("skipTotal", "1");
                if let Some(filter) = &query.filter {
                    pairs.append_pair("filter", filter);
                }
                if let Some(sort) = &query.sort {
                    pairs.append_pair("sort", sort);
                }
            }
            trace!("GET {url}");
            let response = check_status(self.http.get(url).send().await?).await?;
            let body: ListPage = response.json().await?;
            let count = body.items.len() as u32;
            items.extend(body.items);
            if query.limit.is_some() || count < per_page {
                return Ok(items);
            }
            page += 1;
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for HttpStore {
    async fn list(
        &self,
        collection: &str,
        query: &ListQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<Value>> {
        // Dropping the fetch future aborts the in-flight request; the
        // transport is asked to stop, not merely ignored.
        tokio::select! {
            result = self.fetch_all(collection, query) => result,
            _ = cancel.cancelled() => Err(Error::Cancelled),
        }
    }

    async fn create(&self, collection: &str, payload: Value) -> Result<Value> {
        let url = self.records_url(collection);
        trace!("POST {url}");
        let response = self.http.post(url).json(&payload).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn update(&self, collection: &str, id: &str, payload: Value) -> Result<Value> {
        let url = self.record_url(collection, id);
        trace!("PATCH {url}");
        let response = self.http.patch(url).json(&payload).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let url = self.record_url(collection, id);
        trace!("DELETE {url}");
        check_status(self.http.delete(url).send().await?).await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<String>,
        handler: EventHandler,
    ) -> Result<Unsubscribe> {
        self.realtime.subscribe(topic(collection, filter), handler).await
    }
}

/// One page of a listing. Totals are omitted because we request `skipTotal`.
#[derive(Debug, Deserialize)]
struct ListPage {
    items: Vec<Value>,
}

/// Maps a non-success response to `Error::Transport`, carrying the status
/// and whatever body the server sent.
pub(super) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::transport_status(
        status.as_u16(),
        format!("record store answered {status}: {body}"),
    ))
}
