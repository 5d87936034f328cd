//! Structured profile produced by the parsing collaborator.
//!
//! Every section is optional: the collaborator's heuristics routinely miss
//! sections, and `null` is treated the same as a missing field. Only the
//! `profile_id` is mandatory, and it is attached by the transfer layer rather
//! than read from `profile_data`.

use serde::{Deserialize, Deserializer, Serialize};

/// Maps an explicit JSON `null` to `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    /// Absent means the position is ongoing.
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dates: DateRange,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dates: DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
}

/// The `profile_data` object returned by the parsing collaborator.
///
/// `None` on a sequence means the section was not delivered at all, which is
/// distinct from `Some(vec![])` (delivered, but empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSections {
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact: Contact,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub experience: Option<Vec<Experience>>,
    #[serde(default)]
    pub education: Option<Vec<Education>>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub certifications: Option<Vec<Certification>>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

/// A parsed profile together with the identifier the generation collaborator
/// uses to find it again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRecord {
    pub profile_id: String,
    #[serde(flatten)]
    pub sections: ProfileSections,
}

impl ProfileRecord {
    /// Returns `None` when `profile_id` is blank or a dot segment, neither of
    /// which can address the profile in a collaborator URL.
    pub fn new(profile_id: impl Into<String>, sections: ProfileSections) -> Option<Self> {
        let profile_id = profile_id.into();
        if profile_id.trim().is_empty() || matches!(profile_id.as_str(), "." | "..") {
            return None;
        }
        Some(Self {
            profile_id,
            sections,
        })
    }
}

/// Filename attached to the generated PDF for a profile.
pub fn download_filename(profile_id: &str) -> String {
    format!("resume_{profile_id}.pdf")
}
