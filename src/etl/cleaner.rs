//! Maps raw spreadsheet rows into canonical [`Profile`] records.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{Education, Experience, Profile};
use crate::enrich::CompanyDetector;
use crate::etl::normalize::{
    clean_text, extract_profile_identifier, normalize_company_name, split_delimited,
};

/// Fixed source-column → canonical-field table. Matched case-sensitively
/// against header cells; unmapped columns never reach the cleaner. Later
/// entries win when two source columns map to the same field.
pub const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("Name", "name"),
    ("Current Role", "current_role"),
    ("Title", "current_role"),
    ("Current Company", "current_company"),
    ("Location", "location"),
    ("Education", "education"),
    ("Experience Details", "experience"),
    ("Total Experience", "total_experience"),
    ("Skills", "skills"),
    ("Profile URL", "profile_url"),
];

fn map_columns(row: &Map<String, Value>) -> Map<String, Value> {
    let mut mapped = Map::new();
    for (source, field) in COLUMN_MAPPING {
        if let Some(value) = row.get(*source) {
            mapped.insert((*field).to_string(), value.clone());
        }
    }
    mapped
}

/// Splits a raw education/experience cell into its descriptive entries: each
/// element of a list value, or the pipe-separated pieces of a scalar.
fn descriptive_entries(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(clean_text)
            .filter(|text| !text.is_empty())
            .collect(),
        Some(value) => clean_text(value)
            .split('|')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

pub fn education_entries(value: Option<&Value>) -> Vec<Education> {
    descriptive_entries(value)
        .into_iter()
        .map(|institute| Education {
            degree: String::new(),
            institute,
            year: None,
        })
        .collect()
}

pub fn experience_entries(value: Option<&Value>) -> Vec<Experience> {
    descriptive_entries(value)
        .into_iter()
        .map(|role| Experience {
            company: String::new(),
            role,
            start_date: None,
            end_date: None,
        })
        .collect()
}

/// Turns raw rows into canonical profiles, consulting the injected
/// [`CompanyDetector`] when the company column is empty.
pub struct RowCleaner {
    detector: Arc<dyn CompanyDetector>,
}

impl RowCleaner {
    pub fn new(detector: Arc<dyn CompanyDetector>) -> Self {
        Self { detector }
    }

    /// Cleans one raw row. A row missing every mapped column still cleans to
    /// a record with empty fields; it never fails.
    pub async fn clean(&self, row: &Map<String, Value>, category: Option<&str>) -> Profile {
        let mapped = map_columns(row);
        let text = |field: &str| mapped.get(field).map(clean_text).unwrap_or_default();

        let profile_url = text("profile_url");
        let total_experience = text("total_experience");
        let mut profile = Profile {
            id: None,
            profile_id: extract_profile_identifier(&profile_url),
            name: text("name"),
            current_role: text("current_role"),
            current_company: normalize_company_name(&text("current_company")),
            location: text("location"),
            skills: split_delimited(&text("skills")),
            experience: experience_entries(mapped.get("experience")),
            education: education_entries(mapped.get("education")),
            total_experience: (!total_experience.is_empty()).then_some(total_experience),
            profile_url,
            category: category.map(str::to_string),
            last_scraped_at: Utc::now(),
            raw_json: row.clone(),
        };

        if profile.current_company.is_empty() {
            match self.detector.detect(&profile).await {
                Ok(Some(company))
                    if !company.is_empty() && !company.eq_ignore_ascii_case("unknown") =>
                {
                    profile.current_company = normalize_company_name(&company);
                }
                Ok(_) => {}
                Err(err) => {
                    // Detection is best-effort; the record ships without a company.
                    warn!(name = %profile.name, error = %err, "company detection failed");
                }
            }
        }

        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::NoopDetector;
    use crate::error::{Result, TalentError};
    use async_trait::async_trait;
    use serde_json::json;

    fn cleaner() -> RowCleaner {
        RowCleaner::new(Arc::new(NoopDetector))
    }

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn cleans_a_typical_row() {
        let raw = row(json!({
            "Name": "  Jane Doe ",
            "Title": "Engineer",
            "Current Company": "Acme Corp.",
            "Skills": "Go, Rust",
            "Profile URL": "https://x.com/in/janedoe",
            "Education": "BSc Physics | MSc CS",
        }));
        let profile = cleaner().clean(&raw, Some("Engineer")).await;

        assert_eq!(profile.profile_id, "janedoe");
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.current_role, "Engineer");
        assert_eq!(profile.current_company, "Acme");
        assert_eq!(profile.skills, vec!["Go", "Rust"]);
        assert_eq!(profile.category.as_deref(), Some("Engineer"));
        let institutes: Vec<&str> = profile
            .education
            .iter()
            .map(|e| e.institute.as_str())
            .collect();
        assert_eq!(institutes, vec!["BSc Physics", "MSc CS"]);
        // Original row is kept verbatim for reprocessing
        assert_eq!(profile.raw_json.get("Name"), Some(&json!("  Jane Doe ")));
    }

    #[tokio::test]
    async fn row_without_mapped_columns_yields_empty_record() {
        let raw = row(json!({"Unmapped": "value", "Another": 3}));
        let profile = cleaner().clean(&raw, None).await;

        assert!(profile.name.is_empty());
        assert!(profile.current_role.is_empty());
        assert!(profile.current_company.is_empty());
        assert!(profile.location.is_empty());
        assert!(profile.skills.is_empty());
        assert!(profile.experience.is_empty());
        assert!(profile.education.is_empty());
        assert!(profile.profile_url.is_empty());
        assert!(profile.total_experience.is_none());
        assert!(!profile.profile_id.is_empty());
        assert_eq!(profile.raw_json.len(), 2);
    }

    #[tokio::test]
    async fn experience_list_value_maps_to_role_entries() {
        let raw = row(json!({
            "Experience Details": ["Engineer at Acme", "", "Lead at Globex"],
        }));
        let profile = cleaner().clean(&raw, None).await;
        let roles: Vec<&str> = profile.experience.iter().map(|e| e.role.as_str()).collect();
        assert_eq!(roles, vec!["Engineer at Acme", "Lead at Globex"]);
        assert!(profile.experience.iter().all(|e| e.company.is_empty()));
    }

    struct FixedDetector(&'static str);

    #[async_trait]
    impl CompanyDetector for FixedDetector {
        async fn detect(&self, _profile: &Profile) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl CompanyDetector for FailingDetector {
        async fn detect(&self, _profile: &Profile) -> Result<Option<String>> {
            Err(TalentError::InvalidRequest("inference down".to_string()))
        }
    }

    #[tokio::test]
    async fn detector_fills_missing_company() {
        let cleaner = RowCleaner::new(Arc::new(FixedDetector("globex corp")));
        let raw = row(json!({"Name": "John"}));
        let profile = cleaner.clean(&raw, None).await;
        assert_eq!(profile.current_company, "Globex");
    }

    #[tokio::test]
    async fn unknown_answer_and_failures_leave_company_empty() {
        let cleaner = RowCleaner::new(Arc::new(FixedDetector("Unknown")));
        let raw = row(json!({"Name": "John"}));
        assert!(cleaner.clean(&raw, None).await.current_company.is_empty());

        let cleaner = RowCleaner::new(Arc::new(FailingDetector));
        assert!(cleaner.clean(&raw, None).await.current_company.is_empty());
    }

    #[tokio::test]
    async fn detector_is_not_consulted_when_company_present() {
        let cleaner = RowCleaner::new(Arc::new(FixedDetector("Globex")));
        let raw = row(json!({"Current Company": "Acme Inc."}));
        let profile = cleaner.clean(&raw, None).await;
        assert_eq!(profile.current_company, "Acme");
    }
}
