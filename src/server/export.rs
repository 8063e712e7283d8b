use crate::domain::Profile;
use crate::error::Result;

pub const EXPORT_HEADER: [&str; 10] = [
    "Profile ID",
    "Name",
    "Current Role",
    "Current Company",
    "Location",
    "Skills",
    "Experience",
    "Education",
    "Profile URL",
    "Category",
];

/// Renders profiles as CSV in the fixed export column order. Skills are
/// joined with "; ", experience as "role at company", education as
/// "degree from institute".
pub fn render_csv(profiles: &[Profile]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(EXPORT_HEADER)?;
        for profile in profiles {
            let experience = profile
                .experience
                .iter()
                .map(|e| format!("{} at {}", e.role, e.company))
                .collect::<Vec<_>>()
                .join("; ");
            let education = profile
                .education
                .iter()
                .map(|e| format!("{} from {}", e.degree, e.institute))
                .collect::<Vec<_>>()
                .join("; ");
            let skills = profile.skills.join("; ");
            writer.write_record([
                profile.profile_id.as_str(),
                profile.name.as_str(),
                profile.current_role.as_str(),
                profile.current_company.as_str(),
                profile.location.as_str(),
                skills.as_str(),
                experience.as_str(),
                education.as_str(),
                profile.profile_url.as_str(),
                profile.category.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Education, Experience};
    use chrono::Utc;
    use serde_json::Map;

    #[test]
    fn renders_fixed_columns_with_joined_lists() {
        let profile = Profile {
            id: Some("doc".to_string()),
            profile_id: "janedoe".to_string(),
            name: "Jane Doe".to_string(),
            current_role: "Engineer".to_string(),
            current_company: "Acme".to_string(),
            location: "Seattle".to_string(),
            skills: vec!["Go".to_string(), "Rust".to_string()],
            experience: vec![Experience {
                company: "Acme".to_string(),
                role: "Engineer".to_string(),
                start_date: None,
                end_date: None,
            }],
            education: vec![Education {
                degree: "BSc".to_string(),
                institute: "UW".to_string(),
                year: None,
            }],
            total_experience: None,
            profile_url: "https://x.com/in/janedoe".to_string(),
            category: None,
            last_scraped_at: Utc::now(),
            raw_json: Map::new(),
        };

        let bytes = render_csv(&[profile]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Profile ID,Name,Current Role,Current Company,Location,Skills,Experience,Education,Profile URL,Category"
        );
        assert_eq!(
            lines.next().unwrap(),
            "janedoe,Jane Doe,Engineer,Acme,Seattle,Go; Rust,Engineer at Acme,BSc from UW,https://x.com/in/janedoe,"
        );
    }
}
