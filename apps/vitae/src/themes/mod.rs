//! Theme Catalog: fixed, read-only mapping from a theme key to the visual
//! parameters forwarded to the rendering collaborator.
//!
//! The table is compiled into the binary. There is no mutation path: callers
//! only ever receive `&'static ThemeConfig`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Theme parameter enums
// ────────────────────────────────────────────────────────────────────────────

/// Font families understood by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    Helvetica,
    Times,
}

/// How section headings are decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStyle {
    /// Bold heading with an accent-coloured rule underneath.
    Modern,
    /// Small caps heading with a plain rule.
    Classic,
    /// Heading only.
    Basic,
}

/// Overall page arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Modern,
    Traditional,
}

/// Visual parameters for one rendered resume.
///
/// Colours are RGB triples joined by commas (`"50,50,50"`), font size is a
/// point-size string (`"11pt"`). Field names serialize exactly as the
/// generation collaborator expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeConfig {
    pub primary_color: &'static str,
    pub accent_color: &'static str,
    pub font_family: FontFamily,
    pub section_style: SectionStyle,
    pub layout: Layout,
    pub font_size: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Theme keys
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown theme '{0}' (expected one of: modern, classic, minimal)")]
pub struct UnknownThemeKind(pub String);

/// The fixed set of selectable themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeKind {
    Modern,
    Classic,
    Minimal,
}

impl ThemeKind {
    pub const ALL: [ThemeKind; 3] = [ThemeKind::Modern, ThemeKind::Classic, ThemeKind::Minimal];

    pub fn key(&self) -> &'static str {
        match self {
            ThemeKind::Modern => "modern",
            ThemeKind::Classic => "classic",
            ThemeKind::Minimal => "minimal",
        }
    }

    /// Human-facing label shown in the theme selector.
    pub fn label(&self) -> &'static str {
        match self {
            ThemeKind::Modern => "Modern Theme",
            ThemeKind::Classic => "Classic Theme",
            ThemeKind::Minimal => "Minimal Theme",
        }
    }

    pub fn config(&self) -> &'static ThemeConfig {
        match self {
            ThemeKind::Modern => &MODERN,
            ThemeKind::Classic => &CLASSIC,
            ThemeKind::Minimal => &MINIMAL,
        }
    }
}

impl fmt::Display for ThemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ThemeKind {
    type Err = UnknownThemeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modern" => Ok(ThemeKind::Modern),
            "classic" => Ok(ThemeKind::Classic),
            "minimal" => Ok(ThemeKind::Minimal),
            other => Err(UnknownThemeKind(other.to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

static MODERN: ThemeConfig = ThemeConfig {
    primary_color: "0,0,0",
    accent_color: "100,100,100",
    font_family: FontFamily::Helvetica,
    section_style: SectionStyle::Modern,
    layout: Layout::Modern,
    font_size: "11pt",
};

static CLASSIC: ThemeConfig = ThemeConfig {
    primary_color: "50,50,50",
    accent_color: "150,150,150",
    font_family: FontFamily::Times,
    section_style: SectionStyle::Classic,
    layout: Layout::Traditional,
    font_size: "12pt",
};

static MINIMAL: ThemeConfig = ThemeConfig {
    primary_color: "0,0,0",
    accent_color: "200,200,200",
    font_family: FontFamily::Helvetica,
    section_style: SectionStyle::Basic,
    layout: Layout::Traditional,
    font_size: "10pt",
};

/// Resolves a theme key to its configuration.
pub fn lookup(key: &str) -> Result<&'static ThemeConfig, UnknownThemeKind> {
    key.parse::<ThemeKind>().map(|kind| kind.config())
}

/// One catalog row, as listed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeEntry {
    pub key: ThemeKind,
    pub label: &'static str,
    pub config: &'static ThemeConfig,
}

/// The whole catalog in its fixed display order.
pub fn catalog() -> Vec<ThemeEntry> {
    ThemeKind::ALL
        .iter()
        .map(|kind| ThemeEntry {
            key: *kind,
            label: kind.label(),
            config: kind.config(),
        })
        .collect()
}
