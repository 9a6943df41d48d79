//! Route slug normalization.

use serde::Deserialize;

/// A document projected down to its slug, as returned by the slug queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlugDocument {
    #[serde(default)]
    pub slug: Option<String>,
}

/// Trim a slug route parameter; blank slugs are treated as absent.
pub fn normalize_slug_param(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First usable slug of a multi-valued parameter.
pub fn first_slug<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    values
        .into_iter()
        .find_map(|value| normalize_slug_param(Some(value)))
}

/// Usable slugs of a slug query result, in order, skipping blanks.
pub fn collect_slugs(documents: &[SlugDocument]) -> Vec<String> {
    documents
        .iter()
        .filter_map(|document| normalize_slug_param(document.slug.as_deref()))
        .collect()
}
