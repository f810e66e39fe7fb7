use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value stored for any listing attribute the page did not provide
pub const NOT_AVAILABLE: &str = "N/A";

/// Detail-field label holding the application link
pub const APPLY_NOW_LINK: &str = "Apply Now Link";

/// Section label holding the company website
pub const COMPANY_WEBSITE: &str = "Company Website";

/// Section labels rendered as bullet lists
const LIST_SECTIONS: [&str; 2] = ["Skill(s) required", "Earn certifications in these skills"];

/// One job listing as it appears on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub logo: String,
    pub location: String,
    pub experience: String,
    pub application_status: String,
    pub salary: String,
    pub posted_time: String,
    pub job_type: String,

    /// Absolute URL of the job page; doubles as the record's identity
    pub url: String,

    /// Enrichment attached by the dispatcher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_info: Option<DetailOutcome>,
}

impl JobRecord {
    /// Create a record with every attribute set to [`NOT_AVAILABLE`]
    pub fn unavailable() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            title: na(),
            company: na(),
            logo: na(),
            location: na(),
            experience: na(),
            application_status: na(),
            salary: na(),
            posted_time: na(),
            job_type: na(),
            url: na(),
            detailed_info: None,
        }
    }

    /// The reference URL, or `None` when the listing had no stable link
    pub fn identity(&self) -> Option<&str> {
        let url = self.url.trim();
        if url.is_empty() || url == NOT_AVAILABLE {
            None
        } else {
            Some(url)
        }
    }

    /// Whether the card carried a job title
    pub fn has_title(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty() && title != NOT_AVAILABLE
    }

    /// Copy of the listing attributes without any enrichment payload
    pub fn listing_only(&self) -> Self {
        Self {
            detailed_info: None,
            ..self.clone()
        }
    }

    /// Structured detail, if enrichment succeeded
    pub fn detail(&self) -> Option<&JobDetail> {
        match &self.detailed_info {
            Some(DetailOutcome::Detail(detail)) => Some(detail),
            _ => None,
        }
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(80);
        writeln!(f, "{rule}")?;
        writeln!(f, "Job: {}", self.title)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Company: {}", self.company)?;
        writeln!(f, "Location: {}", self.location)?;
        writeln!(f, "Experience: {}", self.experience)?;
        writeln!(f, "Status: {}", self.application_status)?;
        writeln!(f, "Salary: {}", self.salary)?;
        writeln!(f, "Posted: {}", self.posted_time)?;
        writeln!(f, "Type: {}", self.job_type)?;
        write!(f, "URL: {}", self.url)?;

        match &self.detailed_info {
            Some(DetailOutcome::Detail(detail)) => write!(f, "\n{detail}"),
            Some(DetailOutcome::Failed(reason)) => write!(f, "\nDetails unavailable: {reason}"),
            None => Ok(()),
        }
    }
}

/// Result of enriching a record from its job page
///
/// A plain string marks failure; callers must not mistake it for data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailOutcome {
    Detail(JobDetail),
    Failed(String),
}

impl DetailOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DetailOutcome::Failed(_))
    }
}

/// Sub-fields scraped from a single job page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    /// Short labelled values (profile, dates, compensation, ...)
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// Longer free-text sections keyed by their heading
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sections: BTreeMap<String, String>,
}

impl JobDetail {
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields.get(label).map(String::as_str)
    }

    pub fn section(&self, label: &str) -> Option<&str> {
        self.sections.get(label).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.sections.is_empty()
    }
}

impl fmt::Display for JobDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(40);
        writeln!(f, "{rule}")?;
        writeln!(f, "DETAILED JOB INFORMATION")?;
        writeln!(f, "{rule}")?;

        for (label, value) in self.fields.iter().filter(|(k, _)| *k != APPLY_NOW_LINK) {
            writeln!(f, "{label}: {value}")?;
        }

        if let Some(link) = self.field(APPLY_NOW_LINK).filter(|l| *l != NOT_AVAILABLE) {
            writeln!(f, "Application Link: {link}")?;
        }

        for (heading, content) in self.sections.iter().filter(|(k, _)| *k != COMPANY_WEBSITE) {
            writeln!(f, "\n{heading}")?;

            if heading.starts_with("About ") {
                if let Some(website) = self.section(COMPANY_WEBSITE) {
                    writeln!(f, "{website}")?;
                }
            }

            if LIST_SECTIONS.contains(&heading.as_str()) {
                for item in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    writeln!(f, "• {item}")?;
                }
            } else {
                writeln!(f, "{content}")?;
            }
        }

        Ok(())
    }
}
