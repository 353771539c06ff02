//! Unified data router
//!
//! Every read consults the data source preference at call time and goes
//! through one dispatch point. Resources the selected store cannot serve
//! come back as a failed [`QueryResult`] without touching the network.

use crate::backend::StatsBackend;
use crate::contract::PollsContract;
use crate::data::query::{Query, QueryError, QueryResult, ServedBy};
use crate::data::source::{PollSource, Resource, SourceError};
use crate::models::{
    Claim, DailyStats, Distribution, Funding, GlobalStats, PageRequest, Poll, PollFilter, Vote,
};
use crate::preferences::{DataSource, DataSourcePreference};
use alloy_primitives::Address;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// Routes reads between the subgraph and the contract
pub struct PulseData {
    preference: Arc<DataSourcePreference>,
    subgraph: Option<Arc<dyn PollSource>>,
    contract: Option<Arc<dyn PollSource>>,
    admin: Option<PollsContract>,
    stats_backend: Option<Arc<dyn StatsBackend>>,
}

impl PulseData {
    pub fn new(preference: Arc<DataSourcePreference>) -> Self {
        Self {
            preference,
            subgraph: None,
            contract: None,
            admin: None,
            stats_backend: None,
        }
    }

    pub fn with_subgraph(mut self, source: Arc<dyn PollSource>) -> Self {
        self.subgraph = Some(source);
        self
    }

    pub fn with_contract(mut self, source: Arc<dyn PollSource>) -> Self {
        self.contract = Some(source);
        self
    }

    /// Contract used for `owner()` checks
    pub fn with_admin(mut self, contract: PollsContract) -> Self {
        self.admin = Some(contract);
        self
    }

    /// Secondary source for global statistics
    pub fn with_stats_backend(mut self, backend: Arc<dyn StatsBackend>) -> Self {
        self.stats_backend = Some(backend);
        self
    }

    pub fn preference(&self) -> &Arc<DataSourcePreference> {
        &self.preference
    }

    pub fn data_source(&self) -> DataSource {
        self.preference.get()
    }

    fn source_for(&self, resource: Resource) -> Result<Arc<dyn PollSource>, QueryError> {
        let kind = self.preference.get();
        let source = match kind {
            DataSource::Subgraph => self.subgraph.as_ref(),
            DataSource::Contract => self.contract.as_ref(),
        }
        .ok_or(QueryError::NotConfigured(kind))?;

        if !source.supports(resource) {
            return Err(SourceError::Unsupported(resource).into());
        }
        Ok(Arc::clone(source))
    }

    async fn dispatch<T, F, Fut>(&self, resource: Resource, default: T, f: F) -> QueryResult<T>
    where
        F: FnOnce(Arc<dyn PollSource>) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let source = match self.source_for(resource) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!(resource = %resource, error = %e, "Query not dispatched");
                return QueryResult::failed(default, e);
            }
        };

        let kind = source.kind();
        tracing::debug!(resource = %resource, source = %kind, "Dispatching query");

        match f(source).await {
            Ok(data) => QueryResult::ready(data, kind.into()),
            Err(e) => {
                tracing::warn!(resource = %resource, source = %kind, error = %e, "Query failed");
                QueryResult::failed(default, e)
            }
        }
    }

    // ----- one-shot reads -----

    /// Polls, newest first. A creator filter makes this a polls-by-creator
    /// read; an `is_active` filter a polls-by-status read.
    pub async fn fetch_polls(&self, filter: &PollFilter, page: PageRequest) -> QueryResult<Vec<Poll>> {
        let resource = if filter.creator.is_some() {
            Resource::PollsByCreator
        } else if filter.is_active.is_some() {
            Resource::PollsByStatus
        } else {
            Resource::Polls
        };
        self.dispatch(resource, Vec::new(), |s| async move { s.polls(filter, page).await })
            .await
    }

    pub async fn fetch_polls_by_creator(&self, creator: Address, page: PageRequest) -> QueryResult<Vec<Poll>> {
        self.fetch_polls(&PollFilter::by_creator(creator), page).await
    }

    pub async fn fetch_poll(&self, poll_id: u64) -> QueryResult<Option<Poll>> {
        self.dispatch(Resource::Poll, None, |s| async move { s.poll(poll_id).await })
            .await
    }

    pub async fn fetch_poll_fundings(&self, poll_id: u64, page: PageRequest) -> QueryResult<Vec<Funding>> {
        self.dispatch(Resource::PollFundings, Vec::new(), |s| async move {
            s.poll_fundings(poll_id, page).await
        })
        .await
    }

    pub async fn fetch_poll_distributions(
        &self,
        poll_id: u64,
        page: PageRequest,
    ) -> QueryResult<Vec<Distribution>> {
        self.dispatch(Resource::PollDistributions, Vec::new(), |s| async move {
            s.poll_distributions(poll_id, page).await
        })
        .await
    }

    /// Votes on a poll, first vote per address within this page
    pub async fn fetch_poll_voters(&self, poll_id: u64, page: PageRequest) -> QueryResult<Vec<Vote>> {
        self.dispatch(Resource::PollVoters, Vec::new(), |s| async move {
            s.poll_voters(poll_id, page).await
        })
        .await
    }

    pub async fn fetch_claim_history(&self, claimer: Address, page: PageRequest) -> QueryResult<Vec<Claim>> {
        self.dispatch(Resource::ClaimHistory, Vec::new(), |s| async move {
            s.claim_history(&claimer, page).await
        })
        .await
    }

    pub async fn fetch_voted_poll_ids(&self, voter: Address) -> QueryResult<Vec<u64>> {
        self.dispatch(Resource::VotedPolls, Vec::new(), |s| async move {
            s.voted_poll_ids(&voter).await
        })
        .await
    }

    /// Platform totals. In subgraph mode a subgraph failure falls back to
    /// the backend analytics endpoint.
    pub async fn fetch_global_stats(&self) -> QueryResult<GlobalStats> {
        let result = self
            .dispatch(Resource::GlobalStats, GlobalStats::default(), |s| async move {
                s.global_stats().await
            })
            .await;

        let subgraph_failed = matches!(
            result.error.as_deref(),
            Some(QueryError::Source(SourceError::Subgraph(_)))
                | Some(QueryError::NotConfigured(DataSource::Subgraph))
        );
        if !subgraph_failed {
            return result;
        }
        let Some(backend) = &self.stats_backend else {
            return result;
        };

        tracing::warn!(
            error = ?result.error_message(),
            "Subgraph stats unavailable, falling back to backend"
        );
        match backend.global_stats().await {
            Ok(stats) => QueryResult::ready(stats, ServedBy::Backend),
            Err(e) => QueryResult::failed(GlobalStats::default(), e),
        }
    }

    pub async fn fetch_daily_stats(&self, days: usize) -> QueryResult<Vec<DailyStats>> {
        self.dispatch(Resource::DailyStats, Vec::new(), |s| async move {
            s.daily_stats(days).await
        })
        .await
    }

    /// Whether `address` is the contract owner. Always a contract read,
    /// whatever the preference.
    pub async fn is_owner(&self, address: Address) -> QueryResult<bool> {
        let Some(contract) = &self.admin else {
            return QueryResult::failed(false, QueryError::NotConfigured(DataSource::Contract));
        };

        match contract.owner().await {
            Ok(owner) => QueryResult::ready(owner == address, ServedBy::Contract),
            Err(e) => {
                tracing::warn!(error = %e, "Owner lookup failed");
                QueryResult::failed(false, SourceError::from(e))
            }
        }
    }

    // ----- refetchable handles -----

    fn handle<T, F, Fut>(self: &Arc<Self>, f: F) -> Query<T>
    where
        T: Clone + Default + Send + Sync + 'static,
        F: Fn(Arc<PulseData>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<T>> + Send + 'static,
    {
        let router = Arc::clone(self);
        Query::new(move || f(Arc::clone(&router)).boxed())
    }

    pub fn polls_query(self: &Arc<Self>, filter: PollFilter, page: PageRequest) -> Query<Vec<Poll>> {
        self.handle(move |r| {
            let filter = filter.clone();
            async move { r.fetch_polls(&filter, page).await }
        })
    }

    pub fn poll_query(self: &Arc<Self>, poll_id: u64) -> Query<Option<Poll>> {
        self.handle(move |r| async move { r.fetch_poll(poll_id).await })
    }

    pub fn poll_fundings_query(self: &Arc<Self>, poll_id: u64, page: PageRequest) -> Query<Vec<Funding>> {
        self.handle(move |r| async move { r.fetch_poll_fundings(poll_id, page).await })
    }

    pub fn poll_distributions_query(
        self: &Arc<Self>,
        poll_id: u64,
        page: PageRequest,
    ) -> Query<Vec<Distribution>> {
        self.handle(move |r| async move { r.fetch_poll_distributions(poll_id, page).await })
    }

    pub fn poll_voters_query(self: &Arc<Self>, poll_id: u64, page: PageRequest) -> Query<Vec<Vote>> {
        self.handle(move |r| async move { r.fetch_poll_voters(poll_id, page).await })
    }

    pub fn claim_history_query(self: &Arc<Self>, claimer: Address, page: PageRequest) -> Query<Vec<Claim>> {
        self.handle(move |r| async move { r.fetch_claim_history(claimer, page).await })
    }

    pub fn global_stats_query(self: &Arc<Self>) -> Query<GlobalStats> {
        self.handle(|r| async move { r.fetch_global_stats().await })
    }

    pub fn daily_stats_query(self: &Arc<Self>, days: usize) -> Query<Vec<DailyStats>> {
        self.handle(move |r| async move { r.fetch_daily_stats(days).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::contract::mock::{MockProvider, PollFixture};
    use crate::data::source::ContractSource;
    use crate::data::test_support::{poll, FakeSubgraph};
    use crate::storage::{KeyValueStore, MemoryStore};
    use alloy_primitives::U256;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStats {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatsBackend for FixedStats {
        async fn global_stats(&self) -> Result<GlobalStats, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GlobalStats {
                total_polls: 7,
                ..GlobalStats::default()
            })
        }
    }

    fn preference(source: DataSource) -> Arc<DataSourcePreference> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let pref = DataSourcePreference::new(store, DataSource::Subgraph);
        pref.set(source).unwrap();
        Arc::new(pref)
    }

    fn contract_mode() -> (PulseData, Arc<MockProvider>) {
        let provider = Arc::new(
            MockProvider::new()
                .with_owner(Address::repeat_byte(0xaa))
                .with_poll(PollFixture::new(0, "first"))
                .with_poll(PollFixture::new(1, "second").votes(3)),
        );
        let contract = PollsContract::new(provider.clone(), MockProvider::CONTRACT);
        let router = PulseData::new(preference(DataSource::Contract))
            .with_subgraph(Arc::new(FakeSubgraph::new(vec![poll(9)])))
            .with_contract(Arc::new(ContractSource::new(contract.clone())))
            .with_admin(contract);
        (router, provider)
    }

    #[tokio::test]
    async fn test_contract_mode_creator_filter_is_unsupported() {
        let (router, provider) = contract_mode();

        let result = router
            .fetch_polls_by_creator(Address::repeat_byte(0x11), PageRequest::default())
            .await;

        assert!(!result.loading);
        assert!(result.data.is_empty());
        assert_eq!(
            result.error_message().as_deref(),
            Some("Polls by creator is only available with subgraph data source")
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_contract_mode_global_stats_is_unsupported() {
        let backend = Arc::new(FixedStats {
            calls: AtomicUsize::new(0),
        });
        let (router, _) = contract_mode();
        let router = router.with_stats_backend(backend.clone());

        let result = router.fetch_global_stats().await;
        assert!(!result.loading);
        assert_eq!(result.data, GlobalStats::default());
        assert_eq!(
            result.error_message().as_deref(),
            Some("Global statistics is only available with subgraph data source")
        );
        // unsupported is not a subgraph failure
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_contract_mode_polls() {
        let (router, _) = contract_mode();

        let result = router.fetch_polls(&PollFilter::default(), PageRequest::default()).await;
        assert!(result.is_ok());
        assert_eq!(result.served_by, Some(ServedBy::Contract));
        let ids: Vec<u64> = result.data.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 0]);

        let detail = router.fetch_poll(1).await;
        assert_eq!(detail.data.map(|p| p.participant_count), Some(3));
    }

    #[tokio::test]
    async fn test_preference_read_per_call() {
        let (router, _) = contract_mode();
        let first = router.fetch_poll(9).await;
        assert!(first.data.is_none());

        router.preference().set(DataSource::Subgraph).unwrap();
        let second = router.fetch_poll(9).await;
        assert_eq!(second.served_by, Some(ServedBy::Subgraph));
        assert_eq!(second.data.map(|p| p.id), Some(9));
    }

    #[tokio::test]
    async fn test_stats_fall_back_to_backend() {
        let backend = Arc::new(FixedStats {
            calls: AtomicUsize::new(0),
        });
        let router = PulseData::new(preference(DataSource::Subgraph))
            .with_subgraph(Arc::new(FakeSubgraph::failing()))
            .with_stats_backend(backend.clone());

        let result = router.fetch_global_stats().await;
        assert!(result.is_ok());
        assert_eq!(result.served_by, Some(ServedBy::Backend));
        assert_eq!(result.data.total_polls, 7);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subgraph_stats() {
        let router = PulseData::new(preference(DataSource::Subgraph))
            .with_subgraph(Arc::new(FakeSubgraph::new(vec![poll(1), poll(2)])));

        let result = router.fetch_global_stats().await;
        assert_eq!(result.served_by, Some(ServedBy::Subgraph));
        assert_eq!(result.data.total_polls, 2);
        assert_eq!(result.data.total_funding, U256::ZERO);
    }

    #[tokio::test]
    async fn test_missing_source_is_reported() {
        let router = PulseData::new(preference(DataSource::Contract));
        let result = router.fetch_poll(1).await;
        assert!(matches!(
            result.error.as_deref(),
            Some(QueryError::NotConfigured(DataSource::Contract))
        ));
    }

    #[tokio::test]
    async fn test_is_owner() {
        let (router, _) = contract_mode();
        assert!(router.is_owner(Address::repeat_byte(0xaa)).await.data);
        assert!(!router.is_owner(Address::repeat_byte(0xbb)).await.data);

        let bare = PulseData::new(preference(DataSource::Subgraph));
        let result = bare.is_owner(Address::repeat_byte(0xaa)).await;
        assert!(!result.data);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_query_handle_follows_preference() {
        let (router, _) = contract_mode();
        let router = Arc::new(router);
        let query = router.poll_fundings_query(1, PageRequest::default());

        let result = query.refetch().await;
        assert!(result.error.is_some());

        router.preference().set(DataSource::Subgraph).unwrap();
        let result = query.refetch().await;
        assert!(result.is_ok());
        assert_eq!(query.state().await.served_by, Some(ServedBy::Subgraph));
    }
}
