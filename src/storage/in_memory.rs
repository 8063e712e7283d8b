use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::traits::{ProfileStore, UpsertOutcome};
use crate::domain::{CategoryGroup, Profile, ProfileUpdate, SearchFilter};
use crate::error::{Result, TalentError};

/// In-memory store for tests and `serve --in-memory` development runs.
#[derive(Default)]
pub struct InMemoryStore {
    profiles: Mutex<HashMap<String, Profile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_matches(&self, filter: &SearchFilter) -> Vec<Profile> {
        let profiles = self.profiles.lock().unwrap();
        let mut matches: Vec<Profile> = profiles
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.last_scraped_at.cmp(&a.last_scraped_at));
        matches
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn insert(&self, profile: &mut Profile) -> Result<()> {
        let id = profile
            .id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        let mut profiles = self.profiles.lock().unwrap();
        profiles.insert(id.clone(), profile.clone());
        debug!("inserted profile {} with id {}", profile.profile_id, id);
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles
            .values()
            .find(|p| !p.profile_url.is_empty() && p.profile_url == url)
            .cloned())
    }

    async fn upsert(&self, profile: &mut Profile) -> Result<UpsertOutcome> {
        if !profile.profile_url.is_empty() {
            if let Some(mut existing) = self.find_by_url(&profile.profile_url).await? {
                existing.apply_import(profile);
                let mut profiles = self.profiles.lock().unwrap();
                let id = existing.id.clone().unwrap_or_default();
                profiles.insert(id, existing.clone());
                *profile = existing;
                return Ok(UpsertOutcome::Updated);
            }
        }
        self.insert(profile).await?;
        Ok(UpsertOutcome::Inserted)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.get(id).cloned())
    }

    async fn find_many(
        &self,
        filter: &SearchFilter,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Profile>> {
        let matches = self.sorted_matches(filter);
        let iter = matches.into_iter().skip(skip);
        Ok(match limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    async fn count(&self, filter: &SearchFilter) -> Result<u64> {
        Ok(self.sorted_matches(filter).len() as u64)
    }

    async fn aggregate_by_category(&self, per_group: usize) -> Result<Vec<CategoryGroup>> {
        let all = self.sorted_matches(&SearchFilter::default());
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<Profile>> = HashMap::new();
        for profile in all {
            let label = profile
                .category
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Uncategorized".to_string());
            if !grouped.contains_key(&label) {
                order.push(label.clone());
            }
            grouped.entry(label).or_default().push(profile);
        }

        let mut groups: Vec<CategoryGroup> = order
            .into_iter()
            .map(|label| {
                let members = grouped.remove(&label).unwrap_or_default();
                let count = members.len() as u64;
                CategoryGroup {
                    category: label,
                    count,
                    profiles: members.into_iter().take(per_group).collect(),
                }
            })
            .collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(groups)
    }

    async fn update_fields(&self, id: &str, update: &ProfileUpdate) -> Result<Option<Profile>> {
        let mut profiles = self.profiles.lock().unwrap();
        if !profiles.contains_key(id) {
            return Ok(None);
        }
        // A URL change must not land on another document's natural key.
        if let Some(new_url) = update.profile_url.as_deref() {
            if !new_url.is_empty()
                && profiles
                    .iter()
                    .any(|(other_id, p)| other_id != id && p.profile_url == new_url)
            {
                return Err(TalentError::InvalidRequest(
                    "Profile URL already belongs to another profile".to_string(),
                ));
            }
        }
        let Some(profile) = profiles.get_mut(id) else {
            return Ok(None);
        };
        update.apply(profile);
        Ok(Some(profile.clone()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let mut profiles = self.profiles.lock().unwrap();
        Ok(profiles.remove(id).is_some())
    }

    async fn total(&self) -> Result<u64> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.len() as u64)
    }
}
