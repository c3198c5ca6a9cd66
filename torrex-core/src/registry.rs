use std::sync::Arc;

use torrex_model::IndexerDescriptor;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::ports::IndexerDirectory;

/// Source of the indexer list for a search.
///
/// Each call refreshes the list from the directory; the returned slice is
/// shared read-only by every task of the search that requested it.
#[derive(Clone)]
pub struct IndexerRegistry {
    directory: Arc<dyn IndexerDirectory>,
}

impl std::fmt::Debug for IndexerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerRegistry").finish_non_exhaustive()
    }
}

impl IndexerRegistry {
    /// Registry reading from `directory` on every search.
    pub fn new(directory: Arc<dyn IndexerDirectory>) -> Self {
        Self { directory }
    }

    /// Fetch the current indexer list.
    ///
    /// Fails with `BackendUnavailable` when the directory cannot be read;
    /// that aborts the whole search.
    #[instrument(skip_all)]
    pub async fn list_indexers(&self) -> Result<Arc<[IndexerDescriptor]>> {
        let indexers = self.directory.list_indexers().await.inspect_err(|e| {
            warn!(error = %e, "indexer directory unavailable");
        })?;
        info!(count = indexers.len(), "indexer registry refreshed");
        Ok(indexers.into())
    }
}
