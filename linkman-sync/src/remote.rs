//! Client for the remote bookmark service.
//!
//! A client is built from a settings snapshot at the start of each
//! operation and dropped afterwards, so credential or URL edits take effect
//! on the next run. Every call goes through [`HttpTransport`].

use crate::error::{SyncError, SyncResult};
use crate::transport::{HttpRequest, HttpTransport};
use chrono::{DateTime, SecondsFormat, Utc};
use linkman_types::{BookmarkId, BookmarkRecord, ExtraHeader, NewBookmark, Settings};
use reqwest::Url;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::{debug, warn};

/// Filters for `GET /bookmarks`. Unset filters are omitted from the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free text matched against URL and title.
    pub q: Option<String>,
    pub title: Option<String>,
    /// Every tag must be present on a match.
    pub tags: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl SearchQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            pairs.push(("title", title.to_string()));
        }
        if !self.tags.is_empty() {
            pairs.push(("tag", self.tags.join(",")));
        }
        if let Some(start) = self.start_date {
            pairs.push(("startDate", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = self.end_date {
            pairs.push(("endDate", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        pairs
    }
}

/// Remote bookmark collection scoped to one API key.
#[derive(Debug, Clone)]
pub struct RemoteBookmarks {
    transport: HttpTransport,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl RemoteBookmarks {
    /// Builds a client from a settings snapshot.
    ///
    /// Fails with [`SyncError::Config`] when the backend URL is unset or not
    /// a valid absolute URL; nothing is sent in that case.
    pub fn from_settings(transport: HttpTransport, settings: &Settings) -> SyncResult<Self> {
        let base_url = settings
            .backend_url()
            .ok_or_else(|| SyncError::Config("backend URL is not set".to_string()))?;
        Url::parse(base_url)
            .map_err(|e| SyncError::Config(format!("invalid backend URL {base_url:?}: {e}")))?;

        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", settings.api_key),
        )];
        headers.extend(settings.extra_headers.iter().filter_map(valid_header));

        Ok(Self {
            transport,
            base_url: base_url.to_string(),
            headers,
        })
    }

    /// The normalised base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn read(&self, path: &str) -> HttpRequest {
        self.authorized(HttpRequest::get(format!("{}{path}", self.base_url)))
            .header("Accept", "application/json")
    }

    fn write(&self, req: HttpRequest) -> HttpRequest {
        self.authorized(req).header("Content-Type", "application/json")
    }

    fn authorized(&self, mut req: HttpRequest) -> HttpRequest {
        for (key, value) in &self.headers {
            req = req.header(key.clone(), value.clone());
        }
        req
    }

    async fn fetch_records(&self, req: HttpRequest) -> SyncResult<Vec<BookmarkRecord>> {
        let response = self.transport.request(&req).await?;
        let records: Vec<BookmarkRecord> = response
            .json()
            .await
            .map_err(|e| SyncError::Decode(format!("failed to parse bookmark list: {e}")))?;
        debug!("Fetched {} bookmarks from {}", records.len(), req.url);
        Ok(records)
    }

    /// `GET /bookmarks` with filters.
    pub async fn search(&self, query: &SearchQuery) -> SyncResult<Vec<BookmarkRecord>> {
        let mut req = self.read("/bookmarks");
        for (key, value) in query.to_pairs() {
            req = req.query(key, value);
        }
        self.fetch_records(req).await
    }

    /// `GET /bookmarks/sync`: the full collection, used for mirroring.
    pub async fn fetch_all(&self) -> SyncResult<Vec<BookmarkRecord>> {
        self.fetch_records(self.read("/bookmarks/sync")).await
    }

    /// `POST /bookmarks`: create, or replace the bookmark with the same URL.
    pub async fn create(&self, bookmark: &NewBookmark) -> SyncResult<()> {
        let req = self
            .authorized(HttpRequest::post(format!("{}/bookmarks", self.base_url)))
            .json(serde_json::to_value(bookmark)?);
        self.transport.request(&req).await?;
        Ok(())
    }

    /// `DELETE /bookmarks?url=<url>`.
    pub async fn delete(&self, url: &str) -> SyncResult<()> {
        let req = self
            .write(HttpRequest::delete(format!("{}/bookmarks", self.base_url)))
            .query("url", url);
        self.transport.request(&req).await?;
        Ok(())
    }

    /// `POST /admin/bookmarks/{id}/reprocess`: asks the service to re-tag a
    /// bookmark. The service answers before the work is done.
    pub async fn reprocess(&self, id: &BookmarkId) -> SyncResult<()> {
        let req = self.write(HttpRequest::post(format!(
            "{}/admin/bookmarks/{id}/reprocess",
            self.base_url
        )));
        self.transport.request(&req).await?;
        Ok(())
    }
}

/// Keeps a configured header only if it can be sent as-is.
fn valid_header(header: &ExtraHeader) -> Option<(String, String)> {
    let key = header.key.trim();
    if HeaderName::from_bytes(key.as_bytes()).is_err()
        || HeaderValue::from_str(header.value.trim()).is_err()
    {
        warn!("Skipping invalid extra header {:?}", header.key);
        return None;
    }
    // The bearer token comes from the API key setting only.
    if key.eq_ignore_ascii_case("authorization") {
        warn!("Skipping extra header {:?}: set the API key instead", header.key);
        return None;
    }
    Some((key.to_string(), header.value.trim().to_string()))
}
