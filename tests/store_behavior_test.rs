use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::Map;

use talentbase::domain::{Profile, ProfileUpdate, SearchFilter};
use talentbase::storage::{DatabaseStore, InMemoryStore, ProfileStore, UpsertOutcome};

fn profile(name: &str, url: &str, role: &str, category: Option<&str>, age_minutes: i64) -> Profile {
    Profile {
        id: None,
        profile_id: name.to_lowercase().replace(' ', ""),
        name: name.to_string(),
        current_role: role.to_string(),
        current_company: String::new(),
        location: "Seattle, WA".to_string(),
        skills: vec!["Rust".to_string()],
        experience: vec![],
        education: vec![],
        total_experience: None,
        profile_url: url.to_string(),
        category: category.map(str::to_string),
        last_scraped_at: Utc::now() - Duration::minutes(age_minutes),
        raw_json: Map::new(),
    }
}

fn stores() -> Vec<(&'static str, Arc<dyn ProfileStore>)> {
    vec![
        ("in-memory", Arc::new(InMemoryStore::new())),
        (
            "sqlite",
            Arc::new(DatabaseStore::open_in_memory().expect("open sqlite")),
        ),
    ]
}

#[tokio::test]
async fn upsert_inserts_then_updates_by_url() -> Result<()> {
    for (kind, store) in stores() {
        let mut first = profile("Jane Doe", "https://x.com/in/janedoe", "Engineer", None, 10);
        assert_eq!(store.upsert(&mut first).await?, UpsertOutcome::Inserted, "{kind}");
        let first_id = first.id.clone().expect("id assigned");

        let mut second = profile(
            "Jane A. Doe",
            "https://x.com/in/janedoe",
            "Staff Engineer",
            Some("Engineer"),
            0,
        );
        assert_eq!(store.upsert(&mut second).await?, UpsertOutcome::Updated, "{kind}");
        assert_eq!(second.id.as_deref(), Some(first_id.as_str()), "{kind}");

        let stored = store.find_by_id(&first_id).await?.expect("stored profile");
        assert_eq!(stored.name, "Jane A. Doe", "{kind}");
        assert_eq!(stored.current_role, "Staff Engineer", "{kind}");
        assert_eq!(stored.category.as_deref(), Some("Engineer"), "{kind}");
        assert_eq!(store.total().await?, 1, "{kind}");
    }
    Ok(())
}

#[tokio::test]
async fn empty_url_profiles_never_collide() -> Result<()> {
    for (kind, store) in stores() {
        let mut a = profile("Anon One", "", "Engineer", None, 5);
        let mut b = profile("Anon Two", "", "Engineer", None, 3);
        assert_eq!(store.upsert(&mut a).await?, UpsertOutcome::Inserted, "{kind}");
        assert_eq!(store.upsert(&mut b).await?, UpsertOutcome::Inserted, "{kind}");
        assert_eq!(store.total().await?, 2, "{kind}");
        assert!(store.find_by_url("").await?.is_none(), "{kind}");
    }
    Ok(())
}

#[tokio::test]
async fn find_many_sorts_filters_and_paginates() -> Result<()> {
    for (kind, store) in stores() {
        let mut profiles = vec![
            profile("Oldest", "https://x.com/in/a", "Engineer", Some("Eng"), 30),
            profile("Middle", "https://x.com/in/b", "Engineer", Some("Eng"), 20),
            profile("Newest", "https://x.com/in/c", "Designer", Some("Design"), 10),
        ];
        for p in &mut profiles {
            store.insert(p).await?;
        }

        // Most recently scraped first
        let all = store.find_many(&SearchFilter::default(), 0, None).await?;
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Newest", "Middle", "Oldest"], "{kind}");

        let page = store.find_many(&SearchFilter::default(), 1, Some(1)).await?;
        assert_eq!(page[0].name, "Middle", "{kind}");

        let engineers = SearchFilter {
            role: Some("engineer".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count(&engineers).await?, 2, "{kind}");

        let combined = SearchFilter {
            role: Some("engineer".to_string()),
            category: Some("Design".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count(&combined).await?, 0, "{kind}");

        let free_text = SearchFilter {
            q: Some("design".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count(&free_text).await?, 1, "{kind}");

        let by_skill = SearchFilter {
            skill: Some("rust".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count(&by_skill).await?, 3, "{kind}");
    }
    Ok(())
}

#[tokio::test]
async fn aggregation_groups_and_caps() -> Result<()> {
    for (kind, store) in stores() {
        let mut profiles = vec![
            profile("A", "https://x.com/in/a", "Engineer", Some("Eng"), 4),
            profile("B", "https://x.com/in/b", "Engineer", Some("Eng"), 3),
            profile("C", "https://x.com/in/c", "Engineer", Some("Eng"), 2),
            profile("D", "https://x.com/in/d", "Designer", None, 1),
        ];
        for p in &mut profiles {
            store.insert(p).await?;
        }

        let groups = store.aggregate_by_category(2).await?;
        assert_eq!(groups.len(), 2, "{kind}");
        assert_eq!(groups[0].category, "Eng", "{kind}");
        assert_eq!(groups[0].count, 3, "{kind}");
        assert_eq!(groups[0].profiles.len(), 2, "{kind}");
        assert_eq!(groups[1].category, "Uncategorized", "{kind}");
        assert_eq!(groups[1].count, 1, "{kind}");
    }
    Ok(())
}

#[tokio::test]
async fn update_rejects_url_owned_by_another_profile() -> Result<()> {
    for (kind, store) in stores() {
        let mut a = profile("Jane", "https://x.com/in/jane", "Engineer", None, 1);
        let mut b = profile("John", "https://x.com/in/john", "Manager", None, 0);
        store.insert(&mut a).await?;
        store.insert(&mut b).await?;
        let b_id = b.id.clone().expect("id assigned");

        let collision = ProfileUpdate {
            profile_url: Some("https://x.com/in/jane".to_string()),
            ..Default::default()
        };
        let err = store.update_fields(&b_id, &collision).await.unwrap_err();
        assert!(
            err.to_string().contains("already belongs"),
            "{kind}: {err}"
        );

        // Both documents survive, untouched
        assert_eq!(store.total().await?, 2, "{kind}");
        let b_stored = store.find_by_id(&b_id).await?.expect("profile exists");
        assert_eq!(b_stored.profile_url, "https://x.com/in/john", "{kind}");

        // Re-asserting a profile's own URL is not a collision
        let own_url = ProfileUpdate {
            profile_url: Some("https://x.com/in/john".to_string()),
            ..Default::default()
        };
        assert!(store.update_fields(&b_id, &own_url).await?.is_some(), "{kind}");

        // Clearing the URL is always allowed
        let cleared = ProfileUpdate {
            profile_url: Some(String::new()),
            ..Default::default()
        };
        let updated = store
            .update_fields(&b_id, &cleared)
            .await?
            .expect("profile exists");
        assert_eq!(updated.profile_url, "", "{kind}");
    }
    Ok(())
}

#[tokio::test]
async fn update_and_delete_by_id() -> Result<()> {
    for (kind, store) in stores() {
        let mut p = profile("Jane", "https://x.com/in/jane", "Engineer", None, 0);
        store.insert(&mut p).await?;
        let id = p.id.clone().expect("id assigned");

        let update = ProfileUpdate {
            location: Some("Tacoma, WA".to_string()),
            ..Default::default()
        };
        let updated = store
            .update_fields(&id, &update)
            .await?
            .expect("profile exists");
        assert_eq!(updated.location, "Tacoma, WA", "{kind}");
        // Untouched fields survive the partial update
        assert_eq!(updated.name, "Jane", "{kind}");

        assert!(store.update_fields("missing", &update).await?.is_none(), "{kind}");

        assert!(store.delete_by_id(&id).await?, "{kind}");
        assert!(!store.delete_by_id(&id).await?, "{kind}");
        assert_eq!(store.total().await?, 0, "{kind}");
    }
    Ok(())
}
