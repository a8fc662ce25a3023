//! Server-driven pagination over `@odata.nextLink` cursors.

use anyhow::anyhow;
use futures_util::Stream;
use log::{debug, warn};
use reqwest::Url;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::ODataError;
use crate::http::{Executor, Request};

/// Cursor field pointing at the next page.
pub const NEXT_LINK: &str = "@odata.nextLink";

/// Collection field holding the items of a page.
pub const VALUE: &str = "value";

/// Pages fetched before pagination gives up on a server that never stops
/// sending cursors.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// One page of a collection as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: String,
    pub body: Value,
}

impl Page {
    /// Items of the page; empty when the page has no `value` array.
    pub fn items(&self) -> &[Value] {
        self.body
            .get(VALUE)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn next_link(&self) -> Option<&str> {
        self.body.get(NEXT_LINK).and_then(Value::as_str)
    }
}

/// Lazy sequence of pages starting at an initial request.
///
/// Follow-up pages are plain GETs to the cursor URL with no extra
/// parameters. After an error the sequence is finished.
pub struct Pager {
    executor: Arc<Executor>,
    next: Option<Request>,
    fetched: usize,
    max_pages: usize,
}

impl Pager {
    pub fn new(executor: Arc<Executor>, request: Request, max_pages: usize) -> Self {
        Self {
            executor,
            next: Some(request),
            fetched: 0,
            max_pages,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.fetched
    }

    /// Fetches the next page, or `Ok(None)` once the server omits the cursor.
    ///
    /// A first page that is still failing after every retry ends the sequence
    /// quietly; a later one is an error, since the collection would be
    /// incomplete.
    pub async fn next_page(&mut self) -> Result<Option<Page>, ODataError> {
        let Some(request) = self.next.take() else {
            return Ok(None);
        };

        if self.fetched >= self.max_pages {
            return Err(ODataError::PageLimitExceeded {
                url: request.url().to_string(),
                max_pages: self.max_pages,
            });
        }

        let Some(body) = self.executor.execute(&request).await? else {
            if self.fetched == 0 {
                warn!("No data from {} after exhausting retries", request.url());
                return Ok(None);
            }
            return Err(ODataError::data_fetch(
                request.url(),
                anyhow!(
                    "page {} unavailable after exhausting retries",
                    self.fetched + 1
                ),
            ));
        };

        self.fetched += 1;
        let page = Page {
            url: request.url().to_string(),
            body,
        };

        if let Some(link) = page.next_link() {
            let next_url = resolve_link(&page.url, link)?;
            debug!("Following {} to {}", NEXT_LINK, next_url);
            self.next = Some(Request::get(next_url));
        }

        Ok(Some(page))
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Page, ODataError>> {
        futures_util::stream::try_unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Ok::<_, ODataError>(page.map(|page| (page, pager)))
        })
    }

    /// Drains the sequence into one collection.
    ///
    /// The first page is the accumulator: its other fields are kept, later
    /// pages append their `value` items in arrival order, and the cursor is
    /// removed once the server stops sending one.
    pub async fn collect_all(mut self) -> Result<Value, ODataError> {
        let Some(first) = self.next_page().await? else {
            return Ok(empty_collection());
        };

        let mut aggregate = first.body;
        drop_stale_cursor(&mut aggregate);
        while let Some(page) = self.next_page().await? {
            append_page(&mut aggregate, page);
        }

        debug!("Aggregated {} pages", self.fetched);
        Ok(aggregate)
    }
}

fn empty_collection() -> Value {
    let mut object = Map::new();
    object.insert(VALUE.to_string(), Value::Array(Vec::new()));
    Value::Object(object)
}

fn append_page(aggregate: &mut Value, page: Page) {
    // Only objects carry a cursor, so a follow-up page implies an object here
    let Some(object) = aggregate.as_object_mut() else {
        return;
    };

    let (items, next_link) = match page.body {
        Value::Object(mut body) => {
            let items = match body.remove(VALUE) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (items, body.remove(NEXT_LINK))
        }
        _ => (Vec::new(), None),
    };

    match object
        .entry(VALUE)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(existing) => existing.extend(items),
        other => *other = Value::Array(items),
    }

    match next_link {
        Some(link @ Value::String(_)) => {
            object.insert(NEXT_LINK.to_string(), link);
        }
        _ => {
            object.remove(NEXT_LINK);
        }
    }
}

/// Removes a cursor that is present but not a link, such as `null`.
fn drop_stale_cursor(aggregate: &mut Value) {
    let Some(object) = aggregate.as_object_mut() else {
        return;
    };
    if object.get(NEXT_LINK).is_some_and(|link| !link.is_string()) {
        object.remove(NEXT_LINK);
    }
}

/// Resolves a cursor against the URL of the page that carried it, so both
/// absolute and relative links work.
fn resolve_link(base: &str, link: &str) -> Result<String, ODataError> {
    let base_url = Url::parse(base).map_err(|e| ODataError::data_fetch(base, e))?;
    let next = base_url.join(link).map_err(|e| {
        ODataError::data_fetch(base, anyhow!("Invalid {} '{}': {}", NEXT_LINK, link, e))
    })?;
    Ok(next.to_string())
}
