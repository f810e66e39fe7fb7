use crate::parsers::html::{
    absolute_url, find_by_text, find_leaf_containing, find_next, first, first_text, raw_text,
    selector, stripped_text,
};
use crate::parsers::listing::CARD_SELECTOR;
use crate::parsers::text::{format_description, normalize_whitespace_in_segment};
use crate::results::{APPLY_NOW_LINK, COMPANY_WEBSITE, JobDetail, NOT_AVAILABLE};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector(CARD_SELECTOR));
static PROFILE: LazyLock<Selector> = LazyLock::new(|| selector("div.profile"));
static COMPANY_LINK: LazyLock<Selector> = LazyLock::new(|| selector("div.company_name a"));
static LOCATION: LazyLock<Selector> = LazyLock::new(|| selector("p#location_names"));
static START_DATE: LazyLock<Selector> = LazyLock::new(|| selector("div#start-date-first"));
static SALARY: LazyLock<Selector> = LazyLock::new(|| selector("div.salary"));
static DESKTOP_SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span.desktop"));
static EXPERIENCE: LazyLock<Selector> = LazyLock::new(|| selector("div.job-experience-item"));
static DESKTOP_TEXT: LazyLock<Selector> = LazyLock::new(|| selector("div.desktop-text"));
static DIV: LazyLock<Selector> = LazyLock::new(|| selector("div"));
static ITEM_BODY: LazyLock<Selector> = LazyLock::new(|| selector("div.item_body"));
static POSTED: LazyLock<Selector> = LazyLock::new(|| selector("div.status-success"));
static JOB_TYPE: LazyLock<Selector> = LazyLock::new(|| selector("div.status-inactive"));
static APPLICANTS: LazyLock<Selector> = LazyLock::new(|| selector("div.applications_message"));
static BUTTONS: LazyLock<Selector> = LazyLock::new(|| selector("div.buttons_container"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));

static DETAILS: LazyLock<Selector> = LazyLock::new(|| selector("div.internship_details"));
static H2: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static H3: LazyLock<Selector> = LazyLock::new(|| selector("h3"));
static P: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static TEXT_CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector("div.text-container"));
static SKILLS_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h3.skills_heading"));
static ROUND_TABS: LazyLock<Selector> = LazyLock::new(|| selector("div.round_tabs_container"));
static ROUND_TAB: LazyLock<Selector> = LazyLock::new(|| selector("span.round_tabs"));
static PROBATION: LazyLock<Selector> =
    LazyLock::new(|| selector("div.probation-salary-container"));
static SALARY_CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector("div.salary_container"));
static COMPANY_HEADING: LazyLock<Selector> =
    LazyLock::new(|| selector("h2.section_heading.heading_5_5"));
static SECTION_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h2.section_heading"));
static ABOUT_COMPANY_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector("div.text-container.about_company_text_container"));
static WEBSITE_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector("div.text-container.website_link a"));
static TRAINING: LazyLock<Selector> = LazyLock::new(|| selector("div.training_skills_container"));
static TRAINING_HEADING: LazyLock<Selector> =
    LazyLock::new(|| selector("div.training_skills_container_heading"));
static TRAINING_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.training_link_tag"));
static ACTIVITY_SECTION: LazyLock<Selector> = LazyLock::new(|| selector("div.activity_section"));
static ACTIVITY_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("div.heading_activity"));
static ACTIVITY: LazyLock<Selector> = LazyLock::new(|| selector("div.activity"));
static ACTIVITY_TEXT: LazyLock<Selector> = LazyLock::new(|| selector("div.text"));

const CERTIFICATIONS: &str = "Earn certifications in these skills";

/// Labelled values read from the header of a job page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    Profile,
    Company,
    Location,
    StartDate,
    Salary,
    Experience,
    ApplyBy,
    PostedTime,
    JobType,
    Applicants,
}

impl DetailField {
    pub const ALL: [DetailField; 10] = [
        DetailField::Profile,
        DetailField::Company,
        DetailField::Location,
        DetailField::StartDate,
        DetailField::Salary,
        DetailField::Experience,
        DetailField::ApplyBy,
        DetailField::PostedTime,
        DetailField::JobType,
        DetailField::Applicants,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DetailField::Profile => "Job Profile",
            DetailField::Company => "Company Name",
            DetailField::Location => "Location",
            DetailField::StartDate => "Start Date",
            DetailField::Salary => "Salary/CTC",
            DetailField::Experience => "Experience Required",
            DetailField::ApplyBy => "Apply By",
            DetailField::PostedTime => "Posted Time",
            DetailField::JobType => "Job Type",
            DetailField::Applicants => "Number of Applicants",
        }
    }

    fn extract(self, container: ElementRef<'_>) -> Option<String> {
        match self {
            DetailField::Profile => first_text(container, &PROFILE),
            DetailField::Company => first_text(container, &COMPANY_LINK),
            DetailField::Location => first_text(container, &LOCATION),
            DetailField::StartDate => first_text(container, &START_DATE),
            DetailField::Salary => {
                first(container, &SALARY).and_then(|salary| first_text(salary, &DESKTOP_SPAN))
            }
            DetailField::Experience => first(container, &EXPERIENCE)
                .and_then(|item| first_text(item, &DESKTOP_TEXT)),
            DetailField::ApplyBy => find_by_text(container, &DIV, "Apply By")
                .and_then(|label| find_next(container, label, &ITEM_BODY))
                .map(stripped_text),
            DetailField::PostedTime => first_text(container, &POSTED),
            DetailField::JobType => {
                let types = container
                    .select(&JOB_TYPE)
                    .map(|e| normalize_whitespace_in_segment(&raw_text(e)))
                    .collect::<Vec<_>>();
                (!types.is_empty()).then(|| types.join(", "))
            }
            DetailField::Applicants => first_text(container, &APPLICANTS),
        }
    }
}

/// Parses a rendered job page
///
/// Returns `None` when the page has no job container at all; otherwise
/// every field and section that could be found.
pub fn parse(html: &str, origin: &Url) -> Option<JobDetail> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let container = first(root, &CONTAINER)?;

    let mut detail = JobDetail::default();

    for field in DetailField::ALL {
        if let Some(value) = field.extract(container) {
            detail.fields.insert(field.label().to_string(), value);
        }
    }

    let apply_link = first(root, &BUTTONS)
        .and_then(|buttons| first(buttons, &ANCHOR))
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolute_url(origin, href))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    detail.fields.insert(APPLY_NOW_LINK.to_string(), apply_link);

    if let Some(details) = first(root, &DETAILS) {
        let sections = Sections { root, details };
        sections.collect_into(&mut detail);
    }

    Some(detail)
}

/// The free-text sections below the job header
struct Sections<'a> {
    root: ElementRef<'a>,
    details: ElementRef<'a>,
}

impl<'a> Sections<'a> {
    fn collect_into(&self, detail: &mut JobDetail) {
        let mut add = |heading: String, content: Option<String>| {
            if let Some(content) = content {
                detail.sections.insert(heading, content);
            }
        };

        add(
            "About the job".to_string(),
            self.text_after(&H2, "About the job").map(|t| format_description(&t)),
        );
        add("Skill(s) required".to_string(), self.skills());
        add(
            "Who can apply".to_string(),
            self.text_after(&P, "Who can apply").map(|t| format_description(&t)),
        );
        add(
            "Other requirements".to_string(),
            self.text_after(&H3, "Other requirements").map(|t| format_description(&t)),
        );
        add("Salary".to_string(), self.salary());
        add(
            "Number of openings".to_string(),
            self.text_after(&H3, "Number of openings")
                .map(|t| normalize_whitespace_in_segment(&t)),
        );

        if let Some((heading, about, website)) = self.about_company() {
            add(heading, about);
            add(COMPANY_WEBSITE.to_string(), website);
        }

        add(CERTIFICATIONS.to_string(), self.certifications());

        if let Some((heading, activity)) = self.activity() {
            add(heading, Some(activity));
        }
    }

    /// Raw text of the first text container following the heading
    fn text_after(&self, heading: &Selector, label: &str) -> Option<String> {
        let heading = find_by_text(self.details, heading, label)?;
        find_next(self.root, heading, &TEXT_CONTAINER).map(raw_text)
    }

    fn skills(&self) -> Option<String> {
        let heading = first(self.details, &SKILLS_HEADING)?;
        let tabs = find_next(self.root, heading, &ROUND_TABS)?;
        let skills = tabs.select(&ROUND_TAB).map(stripped_text).collect::<Vec<_>>();
        (!skills.is_empty()).then(|| skills.join("\n"))
    }

    fn salary(&self) -> Option<String> {
        let heading = find_by_text(self.details, &DIV, "Salary")?;
        let mut lines = Vec::new();

        if let Some(probation) = find_next(self.root, heading, &PROBATION)
            .filter(|p| p.value().attr("style") != Some("display: none"))
        {
            if let Some(duration) = find_leaf_containing(probation, &DIV, "Duration:") {
                lines.push(format!(
                    "Probation: \nDuration: {}",
                    raw_text(duration).replace("Duration:", "").trim()
                ));
            }
            if let Some(pay) = find_leaf_containing(probation, &DIV, "Salary during probation:") {
                lines.push(format!(
                    "Salary during probation: {}",
                    raw_text(pay).replace("Salary during probation:", "").trim()
                ));
            }
            if find_leaf_containing(probation, &DIV, "After probation:").is_some() {
                lines.push("After probation:".to_string());
            }
        }

        if let Some(container) = find_next(self.root, heading, &SALARY_CONTAINER) {
            lines.push(format_description(&raw_text(container)));
        }

        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    /// Company heading, its description and website link
    fn about_company(&self) -> Option<(String, Option<String>, Option<String>)> {
        let (heading, website) = match first(self.details, &COMPANY_HEADING) {
            Some(heading) => {
                let website = first(self.details, &WEBSITE_LINK)
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string);
                (heading, website)
            }
            None => {
                let heading = self
                    .details
                    .select(&SECTION_HEADING)
                    .find(|h| stripped_text(*h).contains("About"))?;
                (heading, None)
            }
        };

        let about = first(self.details, &ABOUT_COMPANY_TEXT)
            .or_else(|| find_next(self.root, heading, &TEXT_CONTAINER))
            .map(|container| format_description(&raw_text(container)));

        Some((stripped_text(heading), about, website))
    }

    fn certifications(&self) -> Option<String> {
        self.details
            .select(&TRAINING)
            .filter(|c| first_text(*c, &TRAINING_HEADING).as_deref() == Some(CERTIFICATIONS))
            .filter_map(|c| {
                let links = c.select(&TRAINING_LINK).map(stripped_text).collect::<Vec<_>>();
                (!links.is_empty()).then(|| links.join("\n"))
            })
            .last()
    }

    fn activity(&self) -> Option<(String, String)> {
        let section = first(self.details, &ACTIVITY_SECTION)?;
        let heading = first_text(section, &ACTIVITY_HEADING)?;

        let entries = section
            .select(&ACTIVITY)
            .filter_map(|a| first_text(a, &ACTIVITY_TEXT))
            .collect::<Vec<_>>();

        (!entries.is_empty()).then(|| (heading, entries.join(", ")))
    }
}
