//! Lazy, page-at-a-time iteration over a paginated collection.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{PageQuery, PageSource};
use crate::error::Result;

/// Pull-based cursor over a paginated endpoint.
///
/// Pages are requested on demand starting at page 1, one round trip per
/// page, until a page comes back shorter than the requested page size.
/// To restart from the beginning, construct a new `Paginator`.
pub struct Paginator<'a> {
    source: &'a dyn PageSource,
    endpoint: String,
    query: PageQuery,
    buffered: VecDeque<Value>,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        endpoint: impl Into<String>,
        per_page: u32,
        since: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            source,
            endpoint: endpoint.into(),
            query: PageQuery::first(per_page, since),
            buffered: VecDeque::new(),
            done: false,
        }
    }

    /// Set the `state` filter sent with every page request.
    pub fn with_state(mut self, state: &'static str) -> Self {
        self.query.state = Some(state);
        self
    }

    /// Next raw item, fetching the next page when the buffer runs dry.
    ///
    /// After an error the sequence is finished; items already returned stay
    /// returned.
    pub async fn next_item(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            if self.done {
                return Ok(None);
            }

            let items = match self.source.fetch_page(&self.endpoint, &self.query).await {
                Ok(items) => items,
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            };
            log::debug!(
                "Fetched page {} of {} ({} items)",
                self.query.page,
                self.endpoint,
                items.len()
            );

            if items.len() < self.query.per_page as usize {
                self.done = true;
            }
            self.query.page = self.query.page.saturating_add(1);
            self.buffered.extend(items);
        }
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.query.page - 1
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::Error;

    /// In-memory page source: each endpoint maps to a list of pages.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub pages: HashMap<String, Vec<Vec<Value>>>,
        pub fail_at: Option<(String, u32)>,
        pub requests: Mutex<Vec<(String, PageQuery)>>,
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_page(&self, endpoint: &str, query: &PageQuery) -> Result<Vec<Value>> {
            self.requests
                .lock()
                .unwrap()
                .push((endpoint.to_string(), query.clone()));
            if let Some((fail_endpoint, fail_page)) = &self.fail_at {
                if fail_endpoint == endpoint && *fail_page == query.page {
                    return Err(Error::Status {
                        endpoint: endpoint.to_string(),
                        status: 502,
                        body: "bad gateway".into(),
                    });
                }
            }
            Ok(self
                .pages
                .get(endpoint)
                .and_then(|pages| pages.get(query.page as usize - 1))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn items(range: std::ops::Range<u64>) -> Vec<Value> {
        range.map(|i| json!({ "id": i })).collect()
    }

    async fn drain(paginator: &mut Paginator<'_>) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        while let Some(item) = paginator.next_item().await? {
            out.push(item);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let mut source = FakeSource::default();
        source
            .pages
            .insert("/things".into(), vec![items(0..2), items(2..3)]);

        let mut paginator = Paginator::new(&source, "/things", 2, None);
        let all = drain(&mut paginator).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(paginator.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let mut source = FakeSource::default();
        source
            .pages
            .insert("/things".into(), vec![items(0..2), items(2..4)]);

        let mut paginator = Paginator::new(&source, "/things", 2, None);
        let all = drain(&mut paginator).await.unwrap();
        assert_eq!(all.len(), 4);
        // Third request returns an empty page and ends the sequence.
        assert_eq!(paginator.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn test_fetches_lazily() {
        let mut source = FakeSource::default();
        source
            .pages
            .insert("/things".into(), vec![items(0..2), items(2..3)]);

        let mut paginator = Paginator::new(&source, "/things", 2, None);
        assert!(paginator.next_item().await.unwrap().is_some());
        assert!(paginator.next_item().await.unwrap().is_some());
        assert_eq!(source.requests.lock().unwrap().len(), 1);
        assert!(paginator.next_item().await.unwrap().is_some());
        assert_eq!(source.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_passes_since_and_state() {
        let since = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let source = FakeSource::default();
        let mut paginator = Paginator::new(&source, "/things", 100, Some(since)).with_state("all");
        assert!(paginator.next_item().await.unwrap().is_none());

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1.state, Some("all"));
        assert_eq!(requests[0].1.since, Some(since));
        assert_eq!(requests[0].1.page, 1);
    }

    #[tokio::test]
    async fn test_error_keeps_yielded_items_and_ends_sequence() {
        let mut source = FakeSource::default();
        source
            .pages
            .insert("/things".into(), vec![items(0..2), items(2..4)]);
        source.fail_at = Some(("/things".into(), 2));

        let mut paginator = Paginator::new(&source, "/things", 2, None);
        assert!(paginator.next_item().await.unwrap().is_some());
        assert!(paginator.next_item().await.unwrap().is_some());
        let err = paginator.next_item().await.unwrap_err();
        assert!(err.is_fetch_error());
        assert!(paginator.next_item().await.unwrap().is_none());
    }
}
