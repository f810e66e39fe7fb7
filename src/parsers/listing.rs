//! Listing-page parsing
//!
//! Every listing card yields one [`JobRecord`]. Attributes are extracted
//! independently; a missing element only leaves its own attribute at
//! [`NOT_AVAILABLE`].

use crate::parsers::html::{absolute_url, first, first_text, selector, stripped_text};
use crate::results::{JobRecord, NOT_AVAILABLE};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// CSS selector of a listing card; also the readiness signal for a page
pub const CARD_SELECTOR: &str = "div.individual_internship";

const EARLY_APPLICANT: &str = "Be an early applicant";
const ACTIVELY_HIRING: &str = "Actively hiring";

static CARD: LazyLock<Selector> = LazyLock::new(|| selector(CARD_SELECTOR));
static META: LazyLock<Selector> = LazyLock::new(|| selector("div.internship_meta"));
static LOGO: LazyLock<Selector> = LazyLock::new(|| selector("div.internship_logo"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("a.job-title-href"));
static COMPANY: LazyLock<Selector> = LazyLock::new(|| selector("div.company_name"));
static DETAIL_ROW: LazyLock<Selector> = LazyLock::new(|| selector("div.detail-row-1"));
static ROW_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("div.row-1-item"));
static MONEY_ICON: LazyLock<Selector> = LazyLock::new(|| selector("i.ic-16-money"));
static BRIEFCASE_ICON: LazyLock<Selector> = LazyLock::new(|| selector("i.ic-16-briefcase"));
static DESKTOP_SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span.desktop"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static LOCATIONS: LazyLock<Selector> = LazyLock::new(|| selector("p.row-1-item.locations"));
static POSTED: LazyLock<Selector> = LazyLock::new(|| selector("div.color-labels"));
static EARLY_BANNER: LazyLock<Selector> =
    LazyLock::new(|| selector("div.early_applicant_wrapper span"));
static HIRING_BADGE: LazyLock<Selector> = LazyLock::new(|| selector("div.actively-hiring-badge"));
static GRAY_LABELS: LazyLock<Selector> = LazyLock::new(|| selector("div.gray-labels"));

/// Card ids used for promotional and advertising cards
static PROMO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^a-z0-9])(?:pgc|ad)_").expect("valid promo id pattern"));

/// Posted-time wording that counts as recent
static RECENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)today|hours? ago|days? ago").expect("valid recency pattern")
});

/// The attributes a listing card can provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingField {
    Title,
    Url,
    Company,
    Logo,
    Location,
    Experience,
    ApplicationStatus,
    Salary,
    PostedTime,
    JobType,
}

impl ListingField {
    pub const ALL: [ListingField; 10] = [
        ListingField::Title,
        ListingField::Url,
        ListingField::Company,
        ListingField::Logo,
        ListingField::Location,
        ListingField::Experience,
        ListingField::ApplicationStatus,
        ListingField::Salary,
        ListingField::PostedTime,
        ListingField::JobType,
    ];

    /// The record attribute this field fills
    pub fn slot(self, record: &mut JobRecord) -> &mut String {
        match self {
            ListingField::Title => &mut record.title,
            ListingField::Url => &mut record.url,
            ListingField::Company => &mut record.company,
            ListingField::Logo => &mut record.logo,
            ListingField::Location => &mut record.location,
            ListingField::Experience => &mut record.experience,
            ListingField::ApplicationStatus => &mut record.application_status,
            ListingField::Salary => &mut record.salary,
            ListingField::PostedTime => &mut record.posted_time,
            ListingField::JobType => &mut record.job_type,
        }
    }
}

/// Parses rendered listing pages into records
#[derive(Debug, Clone)]
pub struct ListingParser {
    origin: Url,
}

impl ListingParser {
    /// `origin` resolves the relative job links found on the page
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    /// All records on the page, in page order
    ///
    /// Promotional cards and cards without a meta block are skipped.
    /// Records without a job link are kept with [`NOT_AVAILABLE`] as URL.
    pub fn parse(&self, html: &str) -> Vec<JobRecord> {
        let doc = Html::parse_document(html);

        let records = doc
            .select(&CARD)
            .filter(|card| !is_promotional(*card))
            .filter_map(|card| ListingCard::new(card, &self.origin))
            .map(|card| card.to_record())
            .collect::<Vec<_>>();

        ::log::debug!("Listing parser found {} records", records.len());
        records
    }
}

/// Whether the card's id marks it as an advert rather than a job
pub fn is_promotional(card: ElementRef<'_>) -> bool {
    card.value().id().is_some_and(|id| PROMO_ID.is_match(id))
}

/// Cleans the posted-time label and tags recent listings that show the
/// early-applicant banner
pub fn annotate_posted_time(raw: &str, early_applicant_banner: bool) -> String {
    let posted = raw.replace("Posted Time:", "").trim().to_string();
    if !early_applicant_banner {
        return posted;
    }

    let posted = posted.replace(EARLY_APPLICANT, "").trim().to_string();
    if RECENT.is_match(&posted) {
        format!("{} ({})", posted, EARLY_APPLICANT)
    } else {
        posted
    }
}

/// One listing card with its required meta block
struct ListingCard<'a> {
    card: ElementRef<'a>,
    meta: ElementRef<'a>,
    origin: &'a Url,
}

impl<'a> ListingCard<'a> {
    fn new(card: ElementRef<'a>, origin: &'a Url) -> Option<Self> {
        let meta = first(card, &META)?;
        Some(Self { card, meta, origin })
    }

    fn to_record(&self) -> JobRecord {
        let mut record = JobRecord::unavailable();
        for field in ListingField::ALL {
            if let Some(value) = self.extract(field) {
                *field.slot(&mut record) = value;
            }
        }
        record
    }

    fn extract(&self, field: ListingField) -> Option<String> {
        match field {
            ListingField::Title => first_text(self.meta, &TITLE),
            ListingField::Url => first(self.meta, &TITLE)
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| absolute_url(self.origin, href)),
            ListingField::Company => first_text(self.meta, &COMPANY).map(|name| {
                match name.strip_suffix(ACTIVELY_HIRING) {
                    Some(rest) => rest.trim().to_string(),
                    None => name,
                }
            }),
            ListingField::Logo => first(self.card, &LOGO)
                .and_then(|logo| first(logo, &IMG))
                .map(|img| img.value().attr("src").unwrap_or(NOT_AVAILABLE).to_string()),
            ListingField::Location => {
                first(self.detail_row()?, &LOCATIONS).map(stripped_text)
            }
            ListingField::Experience => self
                .row_item_with(&BRIEFCASE_ICON)
                .and_then(|item| first_text(item, &SPAN)),
            ListingField::ApplicationStatus => {
                first(self.card, &HIRING_BADGE).map(|_| ACTIVELY_HIRING.to_string())
            }
            ListingField::Salary => self
                .row_item_with(&MONEY_ICON)
                .and_then(|item| first_text(item, &DESKTOP_SPAN)),
            ListingField::PostedTime => first_text(self.card, &POSTED).map(|raw| {
                annotate_posted_time(&raw, first(self.card, &EARLY_BANNER).is_some())
            }),
            ListingField::JobType => {
                let labels = first(self.card, &GRAY_LABELS)?
                    .select(&SPAN)
                    .map(stripped_text)
                    .collect::<Vec<_>>();
                (!labels.is_empty()).then(|| labels.join(" . "))
            }
        }
    }

    fn detail_row(&self) -> Option<ElementRef<'a>> {
        first(self.meta, &DETAIL_ROW)
    }

    /// Detail-row item marked by `icon`; siblings share a class and only
    /// the icon tells salary and experience apart
    fn row_item_with(&self, icon: &Selector) -> Option<ElementRef<'a>> {
        self.detail_row()?
            .select(&ROW_ITEM)
            .find(|item| first(*item, icon).is_some())
    }
}
