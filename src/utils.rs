use crate::results::JobRecord;
use sha2::{Digest, Sha256};
use url::Url;

/// Convert a string to a sanitized filename
pub fn sanitize_filename(url: &str) -> String {
    // Remove protocol and replace invalid filename characters
    let mut name = url.replace("http://", "").replace("https://", "");
    name = name.replace(['/', ':', '?', '&', '=', '#', '%'], "_");

    // Limit filename length
    if name.chars().count() > 100 {
        name.chars().take(100).collect()
    } else {
        name
    }
}

/// Stable cache key for a job URL: the last non-empty path segment
pub fn cache_key(job_url: &str) -> String {
    Url::parse(job_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(sanitize_filename)
        })
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| sanitize_filename(job_url))
}

/// Collection name derived from a record's location
///
/// Uses the first of several comma-separated locations, lowercased, with
/// spaces and hyphens turned into underscores and anything else that is
/// not alphanumeric dropped. Returns `None` when nothing usable remains.
pub fn location_collection_name(location: &str) -> Option<String> {
    let first = location.split(',').next().unwrap_or_default().trim();

    let name: String = first
        .to_lowercase()
        .replace([' ', '-'], "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if name.is_empty() { None } else { Some(name) }
}

/// Identifier for a record that has no reference URL
///
/// SHA-256 over the JSON of the listing attributes, so the same listing
/// maps to the same identifier no matter what enrichment is attached.
pub fn synthetic_identifier(record: &JobRecord) -> String {
    let listing = serde_json::to_string(&record.listing_only()).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(listing.as_bytes());
    format!("job_{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_uses_last_segment() {
        assert_eq!(
            cache_key("https://internshala.com/job/detail/python-developer-job-1739"),
            "python-developer-job-1739"
        );
        assert_eq!(
            cache_key("https://internshala.com/job/detail/python-developer-job-1739/"),
            "python-developer-job-1739"
        );
        assert_eq!(cache_key("not a url"), "not a url");
    }

    #[test]
    fn test_location_collection_name() {
        assert_eq!(
            location_collection_name("Bangalore, Mumbai").as_deref(),
            Some("bangalore")
        );
        assert_eq!(
            location_collection_name("Navi Mumbai").as_deref(),
            Some("navi_mumbai")
        );
        assert_eq!(
            location_collection_name("Work from home").as_deref(),
            Some("work_from_home")
        );
        assert_eq!(
            location_collection_name("Thiruvananthapuram-East (Kerala)").as_deref(),
            Some("thiruvananthapuram_east_kerala")
        );
        assert_eq!(location_collection_name(" , Pune"), None);
        assert_eq!(location_collection_name("N/A").as_deref(), Some("na"));
    }

    #[test]
    fn test_synthetic_identifier_ignores_detail() {
        let mut record = JobRecord::unavailable();
        record.title = "Data Analyst".to_string();
        let id = synthetic_identifier(&record);

        assert!(id.starts_with("job_"));
        assert_eq!(id.len(), 4 + 64);

        record.detailed_info = Some(crate::results::DetailOutcome::Failed("x".to_string()));
        assert_eq!(synthetic_identifier(&record), id);

        record.title = "Data Engineer".to_string();
        assert_ne!(synthetic_identifier(&record), id);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("https://example.com/a?b=c"),
            "example.com_a_b_c"
        );
        assert_eq!(sanitize_filename(&"x".repeat(150)).len(), 100);
    }
}
