//! Pure string-cleaning helpers applied to every spreadsheet field.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

static COMPANY_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(inc|llc|ltd|corp|corporation|company|co)\.?$").unwrap());

static PROFILE_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/in/([^/?]+)").unwrap());

/// Returns the trimmed string form of a cell, or an empty string for
/// null/NaN-like inputs.
pub fn clean_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("nan") {
                String::new()
            } else {
                trimmed.to_string()
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Lower-cases, strips a single trailing legal-entity suffix (anchored at the
/// end of the string, optional trailing period), then title-cases.
pub fn normalize_company_name(company: &str) -> String {
    let lowered = company.trim().to_lowercase();
    let stripped = COMPANY_SUFFIX_RE.replace(&lowered, "");
    title_case(&stripped)
}

/// Splits on comma, semicolon or pipe; trims each piece and drops empties.
pub fn split_delimited(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(|c| matches!(c, ',' | ';' | '|'))
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts the `/in/<segment>` identifier from a profile URL. URLs without
/// the expected pattern get a freshly generated UUID, so callers must not
/// assume idempotence for them.
pub fn extract_profile_identifier(url: &str) -> String {
    if let Some(caps) = PROFILE_SEGMENT_RE.captures(url) {
        return caps[1].to_string();
    }
    Uuid::new_v4().to_string()
}

/// Python-style title casing: a letter is upper-cased whenever the previous
/// character is not a letter, lower-cased otherwise.
pub(crate) fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_text_handles_missing_and_nan_cells() {
        assert_eq!(clean_text(&Value::Null), "");
        assert_eq!(clean_text(&json!("NaN")), "");
        assert_eq!(clean_text(&json!("  spaced out  ")), "spaced out");
        assert_eq!(clean_text(&json!(12.5)), "12.5");
    }

    #[test]
    fn company_suffixes_are_stripped_once() {
        assert_eq!(normalize_company_name("Acme Corp."), "Acme");
        assert_eq!(normalize_company_name("foo LLC"), "Foo");
        assert_eq!(normalize_company_name("Wayne Enterprises Inc"), "Wayne Enterprises");
        // Only a single trailing suffix goes away
        assert_eq!(normalize_company_name("Acme Co Inc"), "Acme Co");
        // Suffix words elsewhere in the name are untouched
        assert_eq!(normalize_company_name("Company of Heroes"), "Company Of Heroes");
    }

    #[test]
    fn split_delimited_supports_mixed_delimiters() {
        assert_eq!(split_delimited("a, b; c|d"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_delimited(""), Vec::<String>::new());
        assert_eq!(split_delimited(" ; , "), Vec::<String>::new());
    }

    #[test]
    fn profile_identifier_comes_from_url_segment() {
        assert_eq!(
            extract_profile_identifier("https://linkedin.com/in/jdoe123?x=1"),
            "jdoe123"
        );
        assert_eq!(
            extract_profile_identifier("https://linkedin.com/in/jdoe123/details"),
            "jdoe123"
        );
    }

    #[test]
    fn unmatched_url_gets_fresh_identifier_each_call() {
        let first = extract_profile_identifier("https://example.com/nothing");
        let second = extract_profile_identifier("https://example.com/nothing");
        assert!(!first.is_empty());
        assert!(!second.is_empty());
        assert_ne!(first, second);
    }

    #[test]
    fn title_case_matches_python_semantics() {
        assert_eq!(title_case("senior software engineer"), "Senior Software Engineer");
        assert_eq!(title_case("o'brien & co"), "O'Brien & Co");
    }
}
