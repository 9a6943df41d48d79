//! Lenient deserializers for CMS documents.
//!
//! GROQ projections yield `null` for unset fields and for dereferenced
//! documents that no longer exist, so list fields must tolerate both.

use serde::{Deserialize, Deserializer};
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

/// `null` or missing decodes to `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A list of optional entries with the `null` holes removed.
pub fn compact_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let entries = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(entries.unwrap_or_default().into_iter().flatten().collect())
}

/// A list of strings with `null`, blank and surrounding whitespace removed.
pub fn compact_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<String> = compact_list(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let trimmed = entry.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect())
}

/// A datetime that accepts RFC 3339 or a bare `YYYY-MM-DD`; anything else
/// decodes to `None` instead of failing the whole document.
pub fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_datetime))
}

pub fn parse_datetime(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
