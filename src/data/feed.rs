//! Paginated poll listing ("load more")

use crate::data::query::{QueryError, ServedBy};
use crate::data::router::PulseData;
use crate::models::{Poll, PollFilter};
use crate::subgraph::Paginator;
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of a feed
#[derive(Debug, Clone)]
pub struct FeedState {
    pub polls: Vec<Poll>,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<Arc<QueryError>>,
    pub served_by: Option<ServedBy>,
}

struct FeedInner {
    pager: Paginator<Poll>,
    error: Option<Arc<QueryError>>,
    served_by: Option<ServedBy>,
}

/// A poll listing that grows one page at a time
pub struct PollFeed {
    router: Arc<PulseData>,
    filter: PollFilter,
    inner: Mutex<FeedInner>,
}

impl PollFeed {
    pub fn new(router: Arc<PulseData>, filter: PollFilter, page_size: usize) -> Self {
        Self {
            router,
            filter,
            inner: Mutex::new(FeedInner {
                pager: Paginator::new(page_size),
                error: None,
                served_by: None,
            }),
        }
    }

    pub fn filter(&self) -> &PollFilter {
        &self.filter
    }

    pub fn state(&self) -> FeedState {
        let inner = self.lock();
        FeedState {
            polls: inner.pager.items().to_vec(),
            has_more: inner.pager.has_more(),
            loading: inner.pager.is_loading(),
            error: inner.error.clone(),
            served_by: inner.served_by,
        }
    }

    pub fn has_more(&self) -> bool {
        self.lock().pager.has_more()
    }

    /// Load the first page unless already started
    pub async fn load_first(&self) -> Option<usize> {
        if self.lock().pager.is_started() {
            return None;
        }
        self.load_more().await
    }

    /// Fetch and append the next page. Returns `None` without fetching
    /// when the feed is exhausted or a page is already in flight.
    pub async fn load_more(&self) -> Option<usize> {
        let ticket = self.lock().pager.next_request()?;

        let result = self.router.fetch_polls(&self.filter, ticket.request).await;

        let mut inner = self.lock();
        // a refetch started meanwhile owns the feed now
        if !inner.pager.is_current(&ticket) {
            return Some(0);
        }
        match result.error {
            Some(error) => {
                inner.pager.fail(ticket);
                inner.error = Some(error);
                Some(0)
            }
            None => {
                inner.error = None;
                inner.served_by = result.served_by;
                Some(inner.pager.complete_dedup(ticket, result.data, |p| p.id))
            }
        }
    }

    /// Drop loaded pages and fetch the first one again. A page still in
    /// flight from before is discarded when it arrives.
    pub async fn refetch(&self) -> Option<usize> {
        {
            let mut inner = self.lock();
            inner.pager.reset();
            inner.error = None;
            inner.served_by = None;
        }
        self.load_more().await
    }

    fn lock(&self) -> MutexGuard<'_, FeedInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::mock::{MockProvider, PollFixture};
    use crate::contract::PollsContract;
    use crate::data::source::{ContractSource, PollSource, Resource, SourceError};
    use crate::data::test_support::{poll, FakeSubgraph};
    use crate::models::PageRequest;
    use crate::preferences::{DataSource, DataSourcePreference};
    use crate::storage::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn router(source: Arc<dyn PollSource>) -> Arc<PulseData> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let pref = Arc::new(DataSourcePreference::new(store, DataSource::Subgraph));
        Arc::new(PulseData::new(pref).with_subgraph(source))
    }

    #[tokio::test]
    async fn test_has_more_iff_full_page() {
        let polls: Vec<Poll> = (0..5).rev().map(poll).collect();
        let fake = Arc::new(FakeSubgraph::new(polls));
        let feed = PollFeed::new(router(fake.clone()), PollFilter::default(), 2);

        assert_eq!(feed.load_first().await, Some(2));
        assert!(feed.has_more());
        assert_eq!(feed.load_more().await, Some(2));
        assert!(feed.has_more());
        assert_eq!(feed.load_more().await, Some(1));
        assert!(!feed.has_more());

        let ids: Vec<u64> = feed.state().polls.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1, 0]);

        // exhausted: no fetch
        assert_eq!(feed.load_more().await, None);
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_one_empty_page() {
        let polls: Vec<Poll> = (0..4).rev().map(poll).collect();
        let fake = Arc::new(FakeSubgraph::new(polls));
        let feed = PollFeed::new(router(fake.clone()), PollFilter::default(), 2);

        feed.load_first().await;
        feed.load_more().await;
        assert!(feed.has_more());
        assert_eq!(feed.load_more().await, Some(0));
        assert!(!feed.has_more());
        assert_eq!(feed.state().polls.len(), 4);
    }

    /// Holds a fetch at a given offset until its gate is released
    struct GatedSource {
        gates: std::sync::Mutex<HashMap<usize, Arc<Notify>>>,
        entered: AtomicUsize,
        inner: FakeSubgraph,
    }

    impl GatedSource {
        fn new(inner: FakeSubgraph) -> Self {
            Self {
                gates: std::sync::Mutex::new(HashMap::new()),
                entered: AtomicUsize::new(0),
                inner,
            }
        }

        /// Gate the next fetch at `skip`
        fn gate(&self, skip: usize) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates.lock().unwrap().insert(skip, gate.clone());
            gate
        }

        fn entered(&self) -> usize {
            self.entered.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PollSource for GatedSource {
        fn kind(&self) -> DataSource {
            DataSource::Subgraph
        }

        fn supports(&self, _resource: Resource) -> bool {
            true
        }

        async fn polls(&self, filter: &PollFilter, page: PageRequest) -> Result<Vec<Poll>, SourceError> {
            let gate = self.gates.lock().unwrap().remove(&page.skip);
            self.entered.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.inner.polls(filter, page).await
        }

        async fn poll(&self, poll_id: u64) -> Result<Option<Poll>, SourceError> {
            self.inner.poll(poll_id).await
        }
    }

    async fn wait_for_entries(source: &GatedSource, n: usize) {
        while source.entered() < n {
            tokio::task::yield_now().await;
        }
    }

    fn ids(feed: &PollFeed) -> Vec<u64> {
        feed.state().polls.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_load_more_is_noop_while_in_flight() {
        let source = Arc::new(GatedSource::new(FakeSubgraph::new(
            (0..10).rev().map(poll).collect(),
        )));
        let gate = source.gate(0);
        let feed = Arc::new(PollFeed::new(router(source.clone()), PollFilter::default(), 3));

        let pending = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.load_more().await })
        };

        // wait until the first fetch holds the in-flight slot
        while !feed.state().loading {
            tokio::task::yield_now().await;
        }
        assert_eq!(feed.load_more().await, None);

        gate.notify_one();
        assert_eq!(pending.await.unwrap(), Some(3));
        assert_eq!(source.inner.calls(), 1);
        assert!(!feed.state().loading);
    }

    #[tokio::test]
    async fn test_refetch_discards_page_requested_before_it() {
        let source = Arc::new(GatedSource::new(FakeSubgraph::new(
            (0..10).rev().map(poll).collect(),
        )));
        let feed = Arc::new(PollFeed::new(router(source.clone()), PollFilter::default(), 3));

        assert_eq!(feed.load_first().await, Some(3));
        assert_eq!(ids(&feed), vec![9, 8, 7]);

        let old_gate = source.gate(3);
        let fresh_gate = source.gate(0);

        let old = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.load_more().await })
        };
        wait_for_entries(&source, 2).await;

        let fresh = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.refetch().await })
        };
        wait_for_entries(&source, 3).await;

        // the page from before the refetch lands first
        old_gate.notify_one();
        assert_eq!(old.await.unwrap(), Some(0));
        assert!(feed.state().polls.is_empty());
        assert!(feed.state().loading);

        fresh_gate.notify_one();
        assert_eq!(fresh.await.unwrap(), Some(3));
        assert_eq!(ids(&feed), vec![9, 8, 7]);

        assert_eq!(feed.load_more().await, Some(3));
        assert_eq!(ids(&feed), vec![9, 8, 7, 6, 5, 4]);
        assert!(feed.has_more());
    }

    #[tokio::test]
    async fn test_contract_mode_refuses_status_filter() {
        // newest polls closed, oldest open
        let mut provider = MockProvider::new();
        for id in 0..10 {
            let mut fixture = PollFixture::new(id, "q");
            fixture.is_active = id < 5;
            provider = provider.with_poll(fixture);
        }
        let provider = Arc::new(provider);
        let contract = PollsContract::new(provider.clone(), MockProvider::CONTRACT);

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let pref = Arc::new(DataSourcePreference::new(store, DataSource::Contract));
        let router = Arc::new(PulseData::new(pref).with_contract(Arc::new(ContractSource::new(contract))));

        let feed = PollFeed::new(router.clone(), PollFilter::active(), 3);
        assert_eq!(feed.load_first().await, Some(0));
        let state = feed.state();
        assert!(state.polls.is_empty());
        assert!(!state.loading);
        assert_eq!(
            state.error.map(|e| e.to_string()).as_deref(),
            Some("Polls by status is only available with subgraph data source")
        );
        assert_eq!(provider.calls(), 0);

        // unfiltered listing pages over every id
        let feed = PollFeed::new(router, PollFilter::default(), 3);
        feed.load_first().await;
        while feed.has_more() {
            feed.load_more().await;
        }
        assert_eq!(ids(&feed), (0..10).rev().collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_failure_keeps_loaded_items() {
        let feed = PollFeed::new(
            router(Arc::new(FakeSubgraph::failing())),
            PollFilter::default(),
            2,
        );

        assert_eq!(feed.load_first().await, Some(0));
        let state = feed.state();
        assert!(state.polls.is_empty());
        assert!(state.error.is_some());
        assert!(!state.loading);
        // a failed page can be retried
        assert!(state.has_more);
    }
}
