//! SQLite-backed document store. Each profile is one row: the full document
//! as JSON in `data`, plus extracted columns for the natural key and the
//! filterable fields so the indexes below can serve searches.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection};
use tracing::warn;
use uuid::Uuid;

use super::traits::{ProfileStore, UpsertOutcome};
use crate::domain::{CategoryGroup, Profile, ProfileUpdate, SearchFilter};
use crate::error::{Result, TalentError};

pub struct DatabaseStore {
    conn: Mutex<Connection>,
}

impl DatabaseStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Private database for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS profiles (
                id              TEXT PRIMARY KEY,
                profile_url     TEXT NOT NULL DEFAULT '',
                name            TEXT NOT NULL DEFAULT '',
                current_role    TEXT NOT NULL DEFAULT '',
                current_company TEXT NOT NULL DEFAULT '',
                location        TEXT NOT NULL DEFAULT '',
                skills_text     TEXT NOT NULL DEFAULT '',
                category        TEXT,
                last_scraped_at TEXT NOT NULL,
                data            TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_url
                ON profiles(profile_url) WHERE profile_url <> '';
            CREATE INDEX IF NOT EXISTS idx_profiles_role ON profiles(current_role);
            CREATE INDEX IF NOT EXISTS idx_profiles_location ON profiles(location);
            CREATE INDEX IF NOT EXISTS idx_profiles_category ON profiles(category);
            CREATE INDEX IF NOT EXISTS idx_profiles_skills ON profiles(skills_text);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn encode(profile: &Profile) -> Result<String> {
    serde_json::to_string(profile).map_err(|e| TalentError::Database {
        message: format!("failed to serialize profile: {e}"),
    })
}

/// Coerces a stored document back into a profile. Malformed documents are
/// skipped rather than failing the whole request.
fn decode(id: String, data: &str) -> Option<Profile> {
    match serde_json::from_str::<Profile>(data) {
        Ok(mut profile) => {
            profile.id = Some(id);
            Some(profile)
        }
        Err(err) => {
            warn!(document = %id, error = %err, "skipping malformed profile document");
            None
        }
    }
}

fn write_row(conn: &Connection, profile: &Profile) -> Result<()> {
    let data = encode(profile)?;
    conn.execute(
        "INSERT OR REPLACE INTO profiles
            (id, profile_url, name, current_role, current_company, location,
             skills_text, category, last_scraped_at, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            profile.id.as_deref().unwrap_or_default(),
            profile.profile_url,
            profile.name,
            profile.current_role,
            profile.current_company,
            profile.location,
            profile.skills.join("; "),
            profile.category,
            // Fixed precision keeps lexicographic order equal to time order
            profile
                .last_scraped_at
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            data,
        ],
    )?;
    Ok(())
}

/// Builds the WHERE clause for a filter. Substring filters use
/// `instr(lower(...))`; category matches exactly; `q` ORs across the
/// searchable columns. Every parameter is a plain string.
fn filter_clause(filter: &SearchFilter) -> (String, Vec<String>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    let mut substring = |column: &str, needle: &Option<String>| {
        if let Some(needle) = needle {
            clauses.push(format!("instr(lower({column}), lower(?)) > 0"));
            params.push(needle.clone());
        }
    };
    substring("current_role", &filter.role);
    substring("location", &filter.location);
    substring("skills_text", &filter.skill);

    if let Some(category) = &filter.category {
        clauses.push("category = ?".to_string());
        params.push(category.clone());
    }
    if let Some(q) = &filter.q {
        let columns = [
            "name",
            "current_role",
            "current_company",
            "location",
            "skills_text",
            "coalesce(category, '')",
        ];
        let ors: Vec<String> = columns
            .iter()
            .map(|column| format!("instr(lower({column}), lower(?)) > 0"))
            .collect();
        clauses.push(format!("({})", ors.join(" OR ")));
        params.extend(std::iter::repeat(q.clone()).take(columns.len()));
    }

    let clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (clause, params)
}

fn select_profiles(
    conn: &Connection,
    clause: &str,
    params: &[String],
    skip: usize,
    limit: Option<usize>,
) -> Result<Vec<Profile>> {
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let sql = format!(
        "SELECT id, data FROM profiles{clause}
         ORDER BY last_scraped_at DESC LIMIT {limit} OFFSET {skip}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut profiles = Vec::new();
    for row in rows {
        let (id, data) = row?;
        if let Some(profile) = decode(id, &data) {
            profiles.push(profile);
        }
    }
    Ok(profiles)
}

#[async_trait]
impl ProfileStore for DatabaseStore {
    async fn insert(&self, profile: &mut Profile) -> Result<()> {
        profile
            .id
            .get_or_insert_with(|| Uuid::new_v4().to_string());
        let conn = self.conn.lock().unwrap();
        write_row(&conn, profile)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, data FROM profiles WHERE profile_url = ?1 AND profile_url <> ''",
        )?;
        let mut rows = stmt.query(params![url])?;
        if let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let data: String = row.get(1)?;
            Ok(decode(id, &data))
        } else {
            Ok(None)
        }
    }

    async fn upsert(&self, profile: &mut Profile) -> Result<UpsertOutcome> {
        if !profile.profile_url.is_empty() {
            if let Some(mut existing) = self.find_by_url(&profile.profile_url).await? {
                existing.apply_import(profile);
                let conn = self.conn.lock().unwrap();
                write_row(&conn, &existing)?;
                *profile = existing;
                return Ok(UpsertOutcome::Updated);
            }
        }
        self.insert(profile).await?;
        Ok(UpsertOutcome::Inserted)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT data FROM profiles WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            let data: String = row.get(0)?;
            Ok(decode(id.to_string(), &data))
        } else {
            Ok(None)
        }
    }

    async fn find_many(
        &self,
        filter: &SearchFilter,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let (clause, params) = filter_clause(filter);
        select_profiles(&conn, &clause, &params, skip, limit)
    }

    async fn count(&self, filter: &SearchFilter) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let (clause, params) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM profiles{clause}");
        let count: i64 =
            conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn aggregate_by_category(&self, per_group: usize) -> Result<Vec<CategoryGroup>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT coalesce(category, '') AS cat, COUNT(*) FROM profiles
             GROUP BY cat ORDER BY COUNT(*) DESC",
        )?;
        let counted: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut groups = Vec::with_capacity(counted.len());
        for (raw_category, count) in counted {
            let profiles = {
                let mut stmt = conn.prepare(
                    "SELECT id, data FROM profiles WHERE coalesce(category, '') = ?1
                     ORDER BY last_scraped_at DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![raw_category, per_group as i64], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                let mut profiles = Vec::new();
                for row in rows {
                    let (id, data) = row?;
                    if let Some(profile) = decode(id, &data) {
                        profiles.push(profile);
                    }
                }
                profiles
            };
            let category = if raw_category.is_empty() {
                "Uncategorized".to_string()
            } else {
                raw_category
            };
            groups.push(CategoryGroup {
                category,
                count: count as u64,
                profiles,
            });
        }
        Ok(groups)
    }

    async fn update_fields(&self, id: &str, update: &ProfileUpdate) -> Result<Option<Profile>> {
        let Some(mut profile) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        // A URL change must not land on another document's natural key;
        // INSERT OR REPLACE would satisfy the unique index by dropping it.
        if let Some(new_url) = update.profile_url.as_deref() {
            if !new_url.is_empty() && new_url != profile.profile_url {
                if self.find_by_url(new_url).await?.is_some() {
                    return Err(TalentError::InvalidRequest(
                        "Profile URL already belongs to another profile".to_string(),
                    ));
                }
            }
        }
        update.apply(&mut profile);
        let conn = self.conn.lock().unwrap();
        write_row(&conn, &profile)?;
        Ok(Some(profile))
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM profiles WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    async fn total(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
