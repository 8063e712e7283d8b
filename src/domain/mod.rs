use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Canonical profile document. Every import converges to this shape; the
/// original row survives verbatim in `raw_json` for later reprocessing.
///
/// All fields default on deserialization so that partially-shaped documents
/// read back from storage still coerce instead of failing a whole listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Document id assigned by the store on insert.
    #[serde(default)]
    pub id: Option<String>,
    /// Identifier derived from the profile URL, or a generated fallback.
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_role: String,
    #[serde(default)]
    pub current_company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub total_experience: Option<String>,
    /// Natural key: at most one stored document per non-empty URL.
    #[serde(default)]
    pub profile_url: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_timestamp")]
    pub last_scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub raw_json: Map<String, Value>,
}

impl Profile {
    /// Overwrite this stored document with a freshly cleaned record.
    ///
    /// The document id stays; the stored category survives when the incoming
    /// record carries none (imports without a category must not erase one).
    pub fn apply_import(&mut self, incoming: &Profile) {
        let id = self.id.take();
        let category = self.category.take();
        *self = incoming.clone();
        self.id = id;
        if self.category.is_none() {
            self.category = category;
        }
    }
}

/// Partial update payload for the PUT endpoint. Only provided fields are
/// written; an all-`None` payload is rejected before touching storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<Vec<Experience>>,
    pub education: Option<Vec<Education>>,
    pub total_experience: Option<String>,
    pub profile_url: Option<String>,
    pub category: Option<String>,
    pub raw_json: Option<Map<String, Value>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.current_role.is_none()
            && self.current_company.is_none()
            && self.location.is_none()
            && self.skills.is_none()
            && self.experience.is_none()
            && self.education.is_none()
            && self.total_experience.is_none()
            && self.profile_url.is_none()
            && self.category.is_none()
            && self.raw_json.is_none()
    }

    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(current_role) = &self.current_role {
            profile.current_role = current_role.clone();
        }
        if let Some(current_company) = &self.current_company {
            profile.current_company = current_company.clone();
        }
        if let Some(location) = &self.location {
            profile.location = location.clone();
        }
        if let Some(skills) = &self.skills {
            profile.skills = skills.clone();
        }
        if let Some(experience) = &self.experience {
            profile.experience = experience.clone();
        }
        if let Some(education) = &self.education {
            profile.education = education.clone();
        }
        if let Some(total_experience) = &self.total_experience {
            profile.total_experience = Some(total_experience.clone());
        }
        if let Some(profile_url) = &self.profile_url {
            profile.profile_url = profile_url.clone();
        }
        if let Some(category) = &self.category {
            profile.category = Some(category.clone());
        }
        if let Some(raw_json) = &self.raw_json {
            profile.raw_json = raw_json.clone();
        }
    }
}

/// Query-string filters for search, export and counting. Per-field filters
/// are case-insensitive substring matches ANDed together; `category` matches
/// exactly; `q` is ORed across name/role/company/location/skills/category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilter {
    pub role: Option<String>,
    pub location: Option<String>,
    pub skill: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl SearchFilter {
    pub fn matches(&self, profile: &Profile) -> bool {
        if let Some(role) = &self.role {
            if !contains_ci(&profile.current_role, role) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !contains_ci(&profile.location, location) {
                return false;
            }
        }
        if let Some(skill) = &self.skill {
            if !profile.skills.iter().any(|s| contains_ci(s, skill)) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if profile.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(q) = &self.q {
            let category = profile.category.as_deref().unwrap_or_default();
            let hit = contains_ci(&profile.name, q)
                || contains_ci(&profile.current_role, q)
                || contains_ci(&profile.current_company, q)
                || contains_ci(&profile.location, q)
                || profile.skills.iter().any(|s| contains_ci(s, q))
                || contains_ci(category, q);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// One group produced by the by-category aggregation: the full member count
/// plus a capped sample of profiles, ordered by count descending.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub count: u64,
    pub profiles: Vec<Profile>,
}
