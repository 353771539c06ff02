//! Application Context
//!
//! Builds every long-lived component from configuration and owns the
//! background price refresh. Created once at startup and torn down with
//! [`AppContext::shutdown`].

use crate::backend::{BackendClient, BackendError, StatsBackend};
use crate::cache::{clear_local_caches, ClearReport, PriceCache, VotedPollsCache};
use crate::config::Config;
use crate::contract::{self, ContractError, PollsContract};
use crate::data::{ContractSource, PollFeed, PollSource, PulseData, SubgraphSource, VoteChecker};
use crate::models::PollFilter;
use crate::preferences::{DataSourcePreference, UiPreferences};
use crate::price::{PriceError, PriceService};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult};
use crate::subgraph::{SubgraphClient, SubgraphError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Everything a front end needs, wired from one [`Config`]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn KeyValueStore>,
    pub preference: Arc<DataSourcePreference>,
    pub ui: UiPreferences,
    pub router: Arc<PulseData>,
    pub votes: VoteChecker,
    pub backend: Arc<BackendClient>,
    pub price: Arc<PriceService>,
    /// Present when a polls contract is deployed on the active chain
    pub contract: Option<PollsContract>,
    refresh_handle: Option<JoinHandle<()>>,
}

impl AppContext {
    /// Open the file store under `storage.data_dir` and build the context
    pub fn new(config: Config) -> Result<Self, AppError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.storage.store_path())?);
        Self::with_store(config, store)
    }

    /// Build on a throwaway in-memory store
    pub fn ephemeral(config: Config) -> Result<Self, AppError> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self, AppError> {
        let chain_id = config.network.chain_id;

        let preference = Arc::new(DataSourcePreference::load(
            store.clone(),
            config.data_source.default,
        ));

        // (source, chain its indexer actually serves)
        let subgraph: Option<(Arc<dyn PollSource>, u64)> = match SubgraphClient::new(&config.subgraph, chain_id) {
            Ok(client) => {
                let served_chain = client.chain_id();
                Some((Arc::new(SubgraphSource::new(Arc::new(client))), served_chain))
            }
            Err(e) => {
                tracing::warn!(chain_id, error = %e, "Subgraph source disabled");
                None
            }
        };

        let contract = match contract::connect(&config.contract, chain_id) {
            Ok(contract) => Some(contract),
            Err(ContractError::NotDeployed(_)) => {
                tracing::info!(chain_id, "No polls contract configured; contract source disabled");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let backend = Arc::new(BackendClient::new(&config.backend)?);

        let mut router = PulseData::new(preference.clone())
            .with_stats_backend(backend.clone() as Arc<dyn StatsBackend>);
        let mut votes = VoteChecker::new(VotedPollsCache::new(store.clone()), chain_id);

        if let Some((source, served_chain)) = &subgraph {
            router = router.with_subgraph(source.clone());
            // voted ids from another chain must not land in this chain's cache
            if *served_chain == chain_id {
                votes = votes.with_subgraph(source.clone());
            } else {
                tracing::warn!(
                    chain_id,
                    served_chain,
                    "Subgraph serves another chain; voted-polls refresh disabled"
                );
            }
        }
        if let Some(contract) = &contract {
            let source = ContractSource::new(contract.clone()).verify_chain(chain_id);
            router = router
                .with_contract(Arc::new(source))
                .with_admin(contract.clone());
            votes = votes.with_contract(contract.clone());
        }

        let price = Arc::new(PriceService::from_config(
            &config.price,
            Arc::new(PriceCache::new()),
        )?);

        tracing::info!(
            chain_id,
            source = %preference.get(),
            subgraph = subgraph.is_some(),
            contract = contract.is_some(),
            "BasePulse context ready"
        );

        Ok(Self {
            ui: UiPreferences::new(store.clone()),
            config: Arc::new(config),
            store,
            preference,
            router: Arc::new(router),
            votes,
            backend,
            price,
            contract,
            refresh_handle: None,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.config.network.chain_id
    }

    /// Start refreshing the ETH price on `price.refresh_interval_secs`
    pub fn start_price_refresh(&mut self) {
        if self.refresh_handle.is_some() {
            return;
        }
        let interval = self.config.price.refresh_interval_secs;
        self.refresh_handle = Some(self.price.clone().start_background_refresh(interval));
    }

    pub fn is_refreshing_price(&self) -> bool {
        self.refresh_handle.is_some()
    }

    /// Poll listing sized by `subgraph.page_size`
    pub fn poll_feed(&self, filter: PollFilter) -> PollFeed {
        PollFeed::new(self.router.clone(), filter, self.config.subgraph.page_size)
    }

    pub fn clear_local_caches(&self) -> StorageResult<ClearReport> {
        let report = clear_local_caches(&self.store)?;
        // in-memory state falls back to the configured default
        self.preference.hydrate();
        self.price.cache().clear();
        Ok(report)
    }

    /// Stop background work
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.refresh_handle.take() {
            handle.abort();
            tracing::debug!("Price refresh stopped");
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Errors that can occur while building the context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Subgraph error: {0}")]
    Subgraph(#[from] SubgraphError),

    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Price feed error: {0}")]
    Price(#[from] PriceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BASE_SEPOLIA;
    use crate::data::QueryError;
    use crate::preferences::DataSource;
    use alloy_primitives::Address;
    use crate::storage::keys;

    #[tokio::test]
    async fn test_ephemeral_context() {
        let mut ctx = AppContext::ephemeral(Config::default()).unwrap();
        assert_eq!(ctx.chain_id(), BASE_SEPOLIA);
        assert_eq!(ctx.preference.get(), DataSource::Subgraph);
        // default config carries no contract address
        assert!(ctx.contract.is_none());

        ctx.start_price_refresh();
        assert!(ctx.is_refreshing_price());
        ctx.shutdown();
        assert!(!ctx.is_refreshing_price());
    }

    #[tokio::test]
    async fn test_fallback_subgraph_does_not_feed_vote_cache() {
        let mut config = Config::default();
        config.network.chain_id = 1;
        let ctx = AppContext::ephemeral(config).unwrap();
        let voter = Address::repeat_byte(0x42);

        assert!(matches!(
            ctx.votes.refresh(voter).await,
            Err(QueryError::NotConfigured(DataSource::Subgraph))
        ));
        assert!(ctx.votes.cached(voter).is_none());
    }

    #[tokio::test]
    async fn test_stored_preference_is_hydrated() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(keys::DATA_SOURCE, "contract").unwrap();

        let ctx = AppContext::with_store(Config::default(), store).unwrap();
        assert_eq!(ctx.preference.get(), DataSource::Contract);

        // contract mode without a deployment reports it instead of panicking
        let result = ctx.router.fetch_poll(1).await;
        assert!(!result.loading);
        assert!(result.data.is_none());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_clear_resets_preference() {
        let ctx = AppContext::ephemeral(Config::default()).unwrap();
        ctx.preference.set(DataSource::Contract).unwrap();

        let report = ctx.clear_local_caches().unwrap();
        assert!(report.data_source_cleared);
        assert_eq!(ctx.preference.get(), DataSource::Subgraph);
    }

    #[test]
    fn test_file_store_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_string_lossy().to_string();

        let ctx = AppContext::new(config).unwrap();
        ctx.ui.set_sidebar_collapsed(true).unwrap();
        drop(ctx);

        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_string_lossy().to_string();
        let ctx = AppContext::new(config).unwrap();
        assert!(ctx.ui.sidebar_collapsed().unwrap());
    }
}
