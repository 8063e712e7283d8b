use async_trait::async_trait;

use crate::domain::{CategoryGroup, Profile, ProfileUpdate, SearchFilter};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Store gateway for the profile document collection. Query planning,
/// indexing and per-document atomicity are the implementation's concern.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts a new document, assigning an id when the profile has none.
    async fn insert(&self, profile: &mut Profile) -> Result<()>;

    /// Looks a document up by its natural key (profile URL).
    async fn find_by_url(&self, url: &str) -> Result<Option<Profile>>;

    /// Insert-if-absent-else-update keyed by profile URL. On update the
    /// stored document id is kept and the stored category survives when the
    /// incoming record has none. Empty-URL profiles always insert fresh.
    async fn upsert(&self, profile: &mut Profile) -> Result<UpsertOutcome>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>>;

    /// Filtered listing sorted by `last_scraped_at` descending. `None` limit
    /// returns everything past `skip`. Documents that fail to coerce into the
    /// canonical shape are skipped, never fatal.
    async fn find_many(
        &self,
        filter: &SearchFilter,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Profile>>;

    async fn count(&self, filter: &SearchFilter) -> Result<u64>;

    /// Groups documents by category (missing category reported as
    /// "Uncategorized"), count-descending, capping each group's profile list.
    async fn aggregate_by_category(&self, per_group: usize) -> Result<Vec<CategoryGroup>>;

    /// Applies the provided fields to one document. Returns the updated
    /// document, or `None` when the id is unknown.
    async fn update_fields(&self, id: &str, update: &ProfileUpdate) -> Result<Option<Profile>>;

    /// Returns whether a document was actually deleted.
    async fn delete_by_id(&self, id: &str) -> Result<bool>;

    async fn total(&self) -> Result<u64>;
}
