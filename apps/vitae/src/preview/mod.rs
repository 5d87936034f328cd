//! Preview Renderer: read-only projection of a `ProfileRecord` into the
//! display sections shown before generation.
//!
//! Rules:
//! - The contact block is always rendered, even when every field is empty.
//! - A section whose data is absent is omitted. A section that is present
//!   but empty keeps its header and lists nothing.
//! - Sequences keep the collaborator's order; nothing is sorted.

use std::fmt;

use serde::Serialize;

use crate::models::{Certification, DateRange, Education, Experience, ProfileRecord};
use crate::themes::ThemeKind;
use crate::workflow::state::ErrorInfo;

const DETAIL_SEPARATOR: &str = " • ";
const ONGOING: &str = "Present";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactBlock {
    pub name: String,
    /// Email and location joined by a bullet.
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceItem {
    pub title: String,
    pub company: String,
    pub location: String,
    pub dates: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationItem {
    pub school: String,
    /// "<degree> in <field>".
    pub credential: String,
    pub dates: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificationItem {
    pub name: String,
    pub issuer: String,
    pub dates: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum PreviewSection {
    Summary { text: String },
    Experience { entries: Vec<ExperienceItem> },
    Education { entries: Vec<EducationItem> },
    Skills { items: Vec<String> },
    Certifications { entries: Vec<CertificationItem> },
    Languages { items: Vec<String> },
}

impl PreviewSection {
    pub fn title(&self) -> &'static str {
        match self {
            PreviewSection::Summary { .. } => "Summary",
            PreviewSection::Experience { .. } => "Experience",
            PreviewSection::Education { .. } => "Education",
            PreviewSection::Skills { .. } => "Skills",
            PreviewSection::Certifications { .. } => "Certifications",
            PreviewSection::Languages { .. } => "Languages",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumePreview {
    pub profile_id: String,
    pub contact: ContactBlock,
    pub sections: Vec<PreviewSection>,
}

#[cfg(test)]
impl ResumePreview {
    pub fn section(&self, title: &str) -> Option<&PreviewSection> {
        self.sections.iter().find(|s| s.title() == title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeOption {
    pub key: ThemeKind,
    pub label: &'static str,
}

/// The theme picker. Picking an option posts the key to the session's theme
/// route, which starts generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeSelector {
    pub options: Vec<ThemeOption>,
    pub enabled: bool,
    pub status: &'static str,
}

impl ThemeSelector {
    fn new(is_generating: bool) -> Self {
        Self {
            options: ThemeKind::ALL
                .iter()
                .map(|kind| ThemeOption {
                    key: *kind,
                    label: kind.label(),
                })
                .collect(),
            enabled: !is_generating,
            status: if is_generating {
                "Generating..."
            } else {
                "Download PDF"
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewView {
    pub preview: ResumePreview,
    pub theme_selector: ThemeSelector,
    /// Banner shown above the preview after a failed generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn join_present<'a>(parts: impl IntoIterator<Item = &'a Option<String>>, sep: &str) -> String {
    parts
        .into_iter()
        .filter_map(|p| p.as_deref().map(str::trim))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn format_dates(dates: &DateRange) -> String {
    let start = text(&dates.start);
    let end = text(&dates.end);
    match (start.is_empty(), end.is_empty()) {
        (true, true) => String::new(),
        (true, false) => end,
        (false, true) => format!("{start} - {ONGOING}"),
        (false, false) => format!("{start} - {end}"),
    }
}

fn experience_item(exp: &Experience) -> ExperienceItem {
    ExperienceItem {
        title: text(&exp.title),
        company: text(&exp.company),
        location: text(&exp.location),
        dates: format_dates(&exp.dates),
        description: text(&exp.description),
    }
}

fn education_item(edu: &Education) -> EducationItem {
    EducationItem {
        school: text(&edu.school),
        credential: join_present([&edu.degree, &edu.field], " in "),
        dates: format_dates(&edu.dates),
    }
}

fn certification_item(cert: &Certification) -> CertificationItem {
    let dates = match (text(&cert.date), text(&cert.expires)) {
        (issued, expires) if expires.is_empty() => issued,
        (issued, expires) if issued.is_empty() => format!("Expires {expires}"),
        (issued, expires) => format!("{issued} - {expires}"),
    };
    CertificationItem {
        name: text(&cert.name),
        issuer: text(&cert.issuer),
        dates,
    }
}

/// Drops blank lines the parser emits when splitting an empty block.
fn non_blank(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn render_resume(profile: &ProfileRecord) -> ResumePreview {
    let data = &profile.sections;
    let contact = ContactBlock {
        name: text(&data.contact.name),
        details: join_present([&data.contact.email, &data.contact.location], DETAIL_SEPARATOR),
        linkedin_url: data
            .contact
            .linkedin_url
            .clone()
            .filter(|u| !u.trim().is_empty()),
    };

    let mut sections = Vec::new();

    if let Some(summary) = data.summary.as_deref().map(str::trim) {
        if !summary.is_empty() {
            sections.push(PreviewSection::Summary {
                text: summary.to_string(),
            });
        }
    }
    if let Some(experience) = &data.experience {
        sections.push(PreviewSection::Experience {
            entries: experience.iter().map(experience_item).collect(),
        });
    }
    if let Some(education) = &data.education {
        sections.push(PreviewSection::Education {
            entries: education.iter().map(education_item).collect(),
        });
    }
    if let Some(skills) = &data.skills {
        sections.push(PreviewSection::Skills {
            items: non_blank(skills),
        });
    }
    if let Some(certifications) = &data.certifications {
        sections.push(PreviewSection::Certifications {
            entries: certifications.iter().map(certification_item).collect(),
        });
    }
    if let Some(languages) = &data.languages {
        sections.push(PreviewSection::Languages {
            items: non_blank(languages),
        });
    }

    ResumePreview {
        profile_id: profile.profile_id.clone(),
        contact,
        sections,
    }
}

/// Full preview page: the resume, the theme picker and the session's error
/// banner, if any.
pub fn render_preview(
    profile: &ProfileRecord,
    is_generating: bool,
    error: Option<&ErrorInfo>,
) -> PreviewView {
    PreviewView {
        preview: render_resume(profile),
        theme_selector: ThemeSelector::new(is_generating),
        error: error.cloned(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Plain-text output
// ────────────────────────────────────────────────────────────────────────────

fn write_heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(title.len()))
}

/// Writes `left` and, when present, `right` separated by two spaces.
fn write_row(f: &mut fmt::Formatter<'_>, left: &str, right: &str) -> fmt::Result {
    match (left.is_empty(), right.is_empty()) {
        (_, true) => writeln!(f, "{left}"),
        (true, false) => writeln!(f, "{right}"),
        (false, false) => writeln!(f, "{left}  ({right})"),
    }
}

impl fmt::Display for ResumePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.contact.name)?;
        if !self.contact.details.is_empty() {
            writeln!(f, "{}", self.contact.details)?;
        }
        if let Some(url) = &self.contact.linkedin_url {
            writeln!(f, "{url}")?;
        }

        for section in &self.sections {
            write_heading(f, section.title())?;
            match section {
                PreviewSection::Summary { text } => writeln!(f, "{text}")?,
                PreviewSection::Experience { entries } => {
                    for e in entries {
                        write_row(f, &e.title, &e.dates)?;
                        let at: Vec<&str> = [e.company.as_str(), e.location.as_str()]
                            .into_iter()
                            .filter(|s| !s.is_empty())
                            .collect();
                        if !at.is_empty() {
                            writeln!(f, "{}", at.join(", "))?;
                        }
                        if !e.description.is_empty() {
                            writeln!(f, "{}", e.description)?;
                        }
                    }
                }
                PreviewSection::Education { entries } => {
                    for e in entries {
                        write_row(f, &e.school, &e.dates)?;
                        if !e.credential.is_empty() {
                            writeln!(f, "{}", e.credential)?;
                        }
                    }
                }
                PreviewSection::Certifications { entries } => {
                    for c in entries {
                        write_row(f, &c.name, &c.dates)?;
                        if !c.issuer.is_empty() {
                            writeln!(f, "{}", c.issuer)?;
                        }
                    }
                }
                PreviewSection::Skills { items } | PreviewSection::Languages { items } => {
                    if !items.is_empty() {
                        writeln!(f, "{}", items.join(DETAIL_SEPARATOR))?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for PreviewView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            writeln!(f, "Error: {}", error.message)?;
            writeln!(f)?;
        }
        write!(f, "{}", self.preview)
    }
}
