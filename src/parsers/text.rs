/// Words that mark a line as a section heading
const HEADING_KEYWORDS: [&str; 7] = [
    "responsibilities",
    "requirements",
    "perks",
    "details",
    "skills",
    "qualifications",
    "benefits",
];

/// Lines at least this long are never headings
const MAX_HEADING_CHARS: usize = 50;

/// Configuration options for description formatting
#[derive(Debug, Clone, Copy)]
pub struct DescriptionOptions {
    /// Whether to end detected headings with a colon and a blank line
    pub mark_headings: bool,
    /// Whether to insert a blank line before numbered or bulleted lists
    pub separate_lists: bool,
}

impl Default for DescriptionOptions {
    fn default() -> Self {
        Self {
            mark_headings: true,
            separate_lists: true,
        }
    }
}

/// Formats free-text job descriptions with default options
///
/// Cosmetic only: the output is meant for reading, so the heuristics
/// below are best effort and never reject input.
pub fn format_description(text: &str) -> String {
    format_description_with_options(text, &DescriptionOptions::default())
}

/// Formats a job description with specific options
pub fn format_description_with_options(text: &str, options: &DescriptionOptions) -> String {
    let lines = split_into_lines(text);
    if lines.is_empty() {
        return String::new();
    }

    let mut formatted: Vec<String> = Vec::with_capacity(lines.len() * 2);

    for (i, line) in lines.iter().enumerate() {
        let next = lines.get(i + 1).copied();
        let heading = options.mark_headings && is_heading(line, next);

        if heading && !line.ends_with(':') {
            formatted.push(format!("{}:", line));
        } else {
            formatted.push(line.to_string());
        }

        if heading {
            formatted.push(String::new());
        }

        if options.separate_lists
            && next.is_some_and(starts_list)
            && formatted.last().is_some_and(|l| !l.is_empty())
        {
            formatted.push(String::new());
        }
    }

    formatted.join("\n")
}

/// Trimmed, non-empty lines of `text`
pub fn split_into_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Whether `line` reads as a heading, given the line that follows it
pub fn is_heading(line: &str, next: Option<&str>) -> bool {
    if line.chars().count() >= MAX_HEADING_CHARS {
        return false;
    }

    let lower = line.to_lowercase();
    line.ends_with(':')
        || next.is_some_and(|n| n.starts_with("1."))
        || HEADING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Whether `line` opens a numbered or bulleted list
pub fn starts_list(line: &str) -> bool {
    line.starts_with("1.") || line.starts_with('•')
}

/// Normalizes whitespace within a single line or paragraph
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}
