use std::collections::HashSet;

use crate::domain::Profile;

/// Removes duplicate profiles within one batch, keyed by non-empty profile
/// URL. Single pass, first occurrence wins, order preserved. Records with an
/// empty URL have no dedup key and are always kept.
pub fn deduplicate_profiles(profiles: Vec<Profile>) -> Vec<Profile> {
    let mut seen_urls = HashSet::new();
    let mut unique = Vec::with_capacity(profiles.len());
    for profile in profiles {
        if profile.profile_url.is_empty() || seen_urls.insert(profile.profile_url.clone()) {
            unique.push(profile);
        }
    }
    unique
}
