//! Pure field parsers for the string-encoded columns of the snapshot:
//! pipe-delimited multi-value fields, the JSON-encoded external-link list,
//! and the sequel-title heuristic.

use regex::Regex;
use std::sync::OnceLock;

/// Split a delimited multi-value field, trimming whitespace and dropping
/// empty tokens. `"Action|Comedy| Drama "` -> `["Action","Comedy","Drama"]`.
pub fn split_multi(field: &str, delimiter: &str) -> Vec<String> {
    field
        .split(delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Genre-specific variant of [`split_multi`] for the pipe-delimited
/// `genres` column.
pub fn extract_genres(raw: &str) -> Vec<String> {
    split_multi(raw, "|")
}

/// Extract the `site` names from an `externalLinks_json` cell, a JSON array
/// of `{"site": ..., ...}` objects.
///
/// This function never fails: the snapshot contains rows with the bare token
/// `NaN` inside the JSON (rewritten to `null` before parsing) as well as
/// outright garbage, and a single corrupt row must not abort an aggregate
/// spanning thousands of rows. Malformed input yields an empty list.
pub fn parse_external_links(json_text: &str) -> Vec<String> {
    let cleaned = json_text.trim().replace("NaN", "null");
    let value: serde_json::Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| entry.get("site"))
        .filter_map(|site| site.as_str())
        .map(String::from)
        .collect()
}

fn sequel_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Substring heuristic, not a franchise lookup. Titles containing "V" or
    // "II" as ordinary words will match; that is the documented behavior.
    RE.get_or_init(|| {
        Regex::new(r"(?i)Season|2nd|3rd|II|III|IV|V|VI").expect("sequel pattern is valid")
    })
}

/// Heuristic sequel detection on a title string.
pub fn is_sequel(title: &str) -> bool {
    sequel_pattern().is_match(title)
}

/// Canonical form of a studio name for capacity matching: lowercase,
/// alphanumerics only, so `"J.C.Staff"`, `"J.C. STAFF"` and `"j.c.staff"`
/// all compare equal. Idempotent.
pub fn normalize_studio_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_multi_trims_and_drops_empties() {
        assert_eq!(
            split_multi("Action|Comedy| Drama ", "|"),
            vec!["Action", "Comedy", "Drama"]
        );
        assert_eq!(split_multi("", "|"), Vec::<String>::new());
        assert_eq!(split_multi("| | |", "|"), Vec::<String>::new());
        assert_eq!(split_multi("solo", "|"), vec!["solo"]);
    }

    #[test]
    fn extract_genres_is_pipe_delimited() {
        assert_eq!(extract_genres("Action|Fantasy"), vec!["Action", "Fantasy"]);
    }

    #[test]
    fn external_links_happy_path() {
        let json = r#"[{"site": "Crunchyroll", "url": "x"}, {"site": "Netflix"}]"#;
        assert_eq!(parse_external_links(json), vec!["Crunchyroll", "Netflix"]);
    }

    #[test]
    fn external_links_tolerates_nan_token() {
        let json = r#"[{"site": "Hulu", "language": NaN}]"#;
        assert_eq!(parse_external_links(json), vec!["Hulu"]);
    }

    #[test]
    fn external_links_never_fails() {
        assert_eq!(parse_external_links(""), Vec::<String>::new());
        assert_eq!(parse_external_links("not json"), Vec::<String>::new());
        assert_eq!(parse_external_links("{}"), Vec::<String>::new());
        assert_eq!(parse_external_links("[1, 2, 3]"), Vec::<String>::new());
        assert_eq!(
            parse_external_links("[{\"url\": \"x\"}]"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn sequel_heuristic() {
        assert!(is_sequel("Attack on Titan Season 2"));
        assert!(is_sequel("Overlord III"));
        assert!(is_sequel("Mushoku Tensei 2nd Season"));
        assert!(!is_sequel("Attack on Titan"));
        // Known false positive of the substring heuristic, preserved.
        assert!(is_sequel("Hellsing Ultimate V"));
    }

    #[test]
    fn studio_normalization_idempotent_and_insensitive() {
        assert_eq!(normalize_studio_name("J.C.STAFF"), "jcstaff");
        assert_eq!(normalize_studio_name("J.C. Staff"), "jcstaff");
        assert_eq!(normalize_studio_name("j.c.staff"), "jcstaff");
        let once = normalize_studio_name("Production I.G");
        assert_eq!(normalize_studio_name(&once), once);
    }
}
