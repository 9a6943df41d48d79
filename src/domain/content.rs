//! Typed shapes of the GROQ projections the site reads.
//!
//! Every field is optional in the CMS, so required-looking fields default to
//! empty values instead of rejecting the whole document.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use time::OffsetDateTime;

use super::image::ImageRef;
use super::portable_text::PortableText;
use super::serde_helpers::{compact_list, compact_strings, lenient_datetime, null_as_default};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoFields {
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub noindex: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub hero_title: String,
    #[serde(default)]
    pub hero_subtitle: Option<String>,
    #[serde(default)]
    pub hero_image: Option<ImageRef>,
    #[serde(default)]
    pub hero_cta_label: Option<String>,
    #[serde(default)]
    pub hero_cta_link: Option<String>,
    #[serde(default, deserialize_with = "compact_list")]
    pub featured_news: Vec<PostSummary>,
    #[serde(default)]
    pub seo: Option<SeoFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default, deserialize_with = "compact_strings")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub body: PortableText,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "compact_strings")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub seo: Option<SeoFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub content: PortableText,
    #[serde(default)]
    pub seo: Option<SeoFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hero_image: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coop {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hero_image: Option<ImageRef>,
    #[serde(default, deserialize_with = "compact_list")]
    pub announcements: Vec<Announcement>,
    #[serde(default, deserialize_with = "compact_list")]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub seo: Option<SeoFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub featured_image: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionsPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub hero_title: String,
    #[serde(default)]
    pub hero_subtitle: Option<String>,
    #[serde(default)]
    pub hero_image: Option<ImageRef>,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default)]
    pub cta_link: Option<String>,
    #[serde(default)]
    pub overview: PortableText,
    #[serde(default, deserialize_with = "compact_list")]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default, deserialize_with = "compact_list")]
    pub timeline: Vec<TimelineItem>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub seo: Option<SeoFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Highlight {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaqItem {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: PortableText,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralPage {
    #[serde(default)]
    pub page_key: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hero_title: String,
    #[serde(default)]
    pub hero_subtitle: Option<String>,
    #[serde(default)]
    pub hero_image: Option<ImageRef>,
    #[serde(default)]
    pub body: PortableText,
    #[serde(default, deserialize_with = "compact_list")]
    pub highlights: Vec<Highlight>,
    #[serde(default, deserialize_with = "compact_list")]
    pub faq_items: Vec<FaqItem>,
    #[serde(default, deserialize_with = "compact_list")]
    pub gallery: Vec<ImageRef>,
    #[serde(default)]
    pub seo: Option<SeoFields>,
}

/// The marketing pages backed by a `generalPage` document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralPageKey {
    About,
    Faq,
    Gallery,
    Alumni,
}

impl GeneralPageKey {
    pub const ALL: [Self; 4] = [Self::About, Self::Faq, Self::Gallery, Self::Alumni];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Faq => "faq",
            Self::Gallery => "gallery",
            Self::Alumni => "alumni",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::About => "/about",
            Self::Faq => "/faq",
            Self::Gallery => "/gallery",
            Self::Alumni => "/alumni",
        }
    }

    /// Title shown when the document has not been published yet.
    pub fn fallback_title(self) -> &'static str {
        match self {
            Self::About => "About JHA",
            Self::Faq => "Frequently Asked Questions",
            Self::Gallery => "Gallery",
            Self::Alumni => "Alumni Network",
        }
    }

    /// Studio name of the singleton document, used in the unpublished notice.
    pub fn document_label(self) -> &'static str {
        match self {
            Self::About => "About Page",
            Self::Faq => "FAQ Page",
            Self::Gallery => "Gallery Page",
            Self::Alumni => "Alumni Page",
        }
    }
}

impl fmt::Display for GeneralPageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneralPageKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| format!("unknown general page `{value}`"))
    }
}
