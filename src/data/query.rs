//! Query results and refetchable handles

use crate::backend::BackendError;
use crate::data::source::SourceError;
use crate::preferences::DataSource;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Which store answered a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    Subgraph,
    Contract,
    Backend,
}

impl From<DataSource> for ServedBy {
    fn from(source: DataSource) -> Self {
        match source {
            DataSource::Subgraph => ServedBy::Subgraph,
            DataSource::Contract => ServedBy::Contract,
        }
    }
}

impl fmt::Display for ServedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServedBy::Subgraph => "subgraph",
            ServedBy::Contract => "contract",
            ServedBy::Backend => "backend",
        })
    }
}

/// Router errors; the display text is what a dashboard shows
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Backend fallback failed: {0}")]
    Backend(#[from] BackendError),

    #[error("{0} data source is not configured")]
    NotConfigured(DataSource),
}

/// Uniform outcome of a routed read.
///
/// `data` always holds something renderable: the fetched value, or the
/// type's default when `error` is set.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<Arc<QueryError>>,
    pub served_by: Option<ServedBy>,
}

impl<T> QueryResult<T> {
    /// Not fetched yet
    pub fn pending(data: T) -> Self {
        Self {
            data,
            loading: true,
            error: None,
            served_by: None,
        }
    }

    pub fn ready(data: T, served_by: ServedBy) -> Self {
        Self {
            data,
            loading: false,
            error: None,
            served_by: Some(served_by),
        }
    }

    pub fn failed(data: T, error: impl Into<QueryError>) -> Self {
        Self {
            data,
            loading: false,
            error: Some(Arc::new(error.into())),
            served_by: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            data: f(self.data),
            loading: self.loading,
            error: self.error,
            served_by: self.served_by,
        }
    }
}

type Fetcher<T> = Box<dyn Fn() -> BoxFuture<'static, QueryResult<T>> + Send + Sync>;

/// A read that can be re-run, holding its latest result
pub struct Query<T> {
    state: Arc<RwLock<QueryResult<T>>>,
    fetcher: Fetcher<T>,
}

impl<T> Query<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Starts in the loading state with default data; nothing runs until
    /// [`refetch`](Self::refetch)
    pub fn new<F>(fetcher: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, QueryResult<T>> + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(RwLock::new(QueryResult::pending(T::default()))),
            fetcher: Box::new(fetcher),
        }
    }

    /// Snapshot of the latest result
    pub async fn state(&self) -> QueryResult<T> {
        self.state.read().await.clone()
    }

    /// Run the fetch again. Previous data stays visible while loading.
    pub async fn refetch(&self) -> QueryResult<T> {
        self.state.write().await.loading = true;

        let result = (self.fetcher)().await;
        *self.state.write().await = result.clone();
        result
    }
}
