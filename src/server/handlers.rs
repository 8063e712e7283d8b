use std::io::Write;
use std::path::Path;

use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{export, ApiError, AppState};
use crate::domain::{Profile, ProfileUpdate, SearchFilter};
use crate::error::TalentError;
use crate::etl::cleaner::education_entries;
use crate::etl::importer::Importer;
use crate::etl::normalize::normalize_company_name;

fn default_limit() -> usize {
    10
}

#[derive(Deserialize)]
pub struct CategoryParams {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct FolderParams {
    pub folder_path: String,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub role: Option<String>,
    pub location: Option<String>,
    pub skill: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl SearchParams {
    fn filter(&self) -> SearchFilter {
        SearchFilter {
            role: self.role.clone(),
            location: self.location.clone(),
            skill: self.skill.clone(),
            category: self.category.clone(),
            q: self.q.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct GroupParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Serves the bundled UI, falling back to a plain banner without one.
pub async fn index() -> impl IntoResponse {
    match tokio::fs::read_to_string("static/index.html").await {
        Ok(content) => Html(content).into_response(),
        Err(_) => "Talentbase profile API".into_response(),
    }
}

/// Import profiles from an uploaded CSV/Excel file.
pub async fn import_profiles(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TalentError::InvalidRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload.csv").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| TalentError::InvalidRequest(e.to_string()))?;
            upload = Some((file_name, bytes.to_vec()));
            break;
        }
    }
    let Some((file_name, bytes)) = upload else {
        return Err(TalentError::InvalidRequest("missing 'file' field".to_string()).into());
    };

    // Spill to a scratch file carrying the original extension so the importer
    // can pick the right reader.
    let suffix = Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let mut scratch = tempfile::Builder::new()
        .suffix(&suffix)
        .tempfile()
        .map_err(TalentError::from)?;
    scratch.write_all(&bytes).map_err(TalentError::from)?;

    let importer = Importer::new(state.store.clone(), state.detector.clone());
    let stats = importer
        .import_file(scratch.path(), params.category.as_deref())
        .await?;
    Ok(Json(json!({ "message": "Import completed", "stats": stats })))
}

/// Import all CSV/Excel files from a server-local folder.
pub async fn import_profiles_folder(
    State(state): State<AppState>,
    Query(params): Query<FolderParams>,
) -> Result<Json<Value>, ApiError> {
    let importer = Importer::new(state.store.clone(), state.detector.clone());
    let results = importer
        .import_folder(Path::new(&params.folder_path), params.category.as_deref())
        .await?;
    Ok(Json(
        json!({ "message": "Folder import completed", "stats": results }),
    ))
}

/// Paginated listing, most recently imported first.
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    let profiles = state
        .store
        .find_many(&SearchFilter::default(), page.skip, Some(page.limit))
        .await?;
    Ok(Json(profiles))
}

pub async fn search_profiles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    let profiles = state
        .store
        .find_many(&params.filter(), params.skip, Some(params.limit))
        .await?;
    Ok(Json(profiles))
}

/// Search returning items plus the total match count for pagination UIs.
pub async fn search_profiles_advanced(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let filter = params.filter();
    let total = state.store.count(&filter).await?;
    let items = state
        .store
        .find_many(&filter, params.skip, Some(params.limit))
        .await?;
    Ok(Json(json!({ "items": items, "total": total })))
}

pub async fn profiles_by_category(
    State(state): State<AppState>,
    Query(params): Query<GroupParams>,
) -> Result<Json<Value>, ApiError> {
    let groups = state.store.aggregate_by_category(params.limit).await?;
    Ok(Json(json!(groups)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    UrlPath(profile_id): UrlPath<String>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .store
        .find_by_id(&profile_id)
        .await?
        .ok_or_else(|| TalentError::NotFound("Profile not found".to_string()))?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    UrlPath(profile_id): UrlPath<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
    if update.is_empty() {
        return Err(TalentError::InvalidRequest("No fields to update".to_string()).into());
    }
    let updated = state
        .store
        .update_fields(&profile_id, &update)
        .await?
        .ok_or_else(|| TalentError::NotFound("Profile not found".to_string()))?;
    Ok(Json(updated))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    UrlPath(profile_id): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_by_id(&profile_id).await? {
        return Err(TalentError::NotFound("Profile not found".to_string()).into());
    }
    Ok(Json(json!({ "message": "Profile deleted" })))
}

/// Export filtered profiles as a CSV attachment.
pub async fn export_profiles_csv(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let profiles = state.store.find_many(&filter, 0, None).await?;
    let body = export::render_csv(&profiles)?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=profiles_export.csv",
        ),
    ];
    Ok((headers, body))
}

pub async fn profile_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = state.store.total().await?;
    Ok(Json(json!({ "total_profiles": total })))
}

/// One-time helper: fill an empty education list from the raw row's
/// Education column.
pub async fn backfill_education(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let profiles = state
        .store
        .find_many(&SearchFilter::default(), 0, None)
        .await?;
    let mut updated = 0;
    for profile in profiles {
        if !profile.education.is_empty() {
            continue;
        }
        let raw_education = profile
            .raw_json
            .get("Education")
            .or_else(|| profile.raw_json.get("education"));
        let entries = education_entries(raw_education);
        if entries.is_empty() {
            continue;
        }
        let Some(id) = profile.id.as_deref() else {
            continue;
        };
        let update = ProfileUpdate {
            education: Some(entries),
            ..Default::default()
        };
        if state.store.update_fields(id, &update).await?.is_some() {
            updated += 1;
        }
    }
    Ok(Json(json!({ "updated": updated })))
}

/// Run the company detector for one stored profile and persist a hit.
pub async fn detect_company(
    State(state): State<AppState>,
    UrlPath(profile_id): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    let profile = state
        .store
        .find_by_id(&profile_id)
        .await?
        .ok_or_else(|| TalentError::NotFound("Profile not found".to_string()))?;
    if !profile.current_company.is_empty() {
        return Ok(Json(json!({
            "message": "Current company already set",
            "current_company": profile.current_company,
        })));
    }

    let detected = match state.detector.detect(&profile).await {
        Ok(answer) => answer,
        Err(err) => {
            warn!(profile = %profile_id, error = %err, "company detection failed");
            None
        }
    };
    match detected.filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("unknown")) {
        Some(company) => {
            let company = normalize_company_name(&company);
            let update = ProfileUpdate {
                current_company: Some(company.clone()),
                ..Default::default()
            };
            state.store.update_fields(&profile_id, &update).await?;
            Ok(Json(json!({
                "message": "Company detected and updated",
                "current_company": company,
            })))
        }
        None => Ok(Json(json!({ "message": "Could not detect company" }))),
    }
}
