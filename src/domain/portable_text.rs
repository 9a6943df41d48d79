//! Portable text: the CMS rich-text format.
//!
//! A document is a list of blocks. Text blocks hold spans with marks; a mark
//! is either a decorator (`strong`, `em`, ...) or the `_key` of an entry in
//! the block's `markDefs` (links). Unknown block types are kept as
//! `Unknown` so that renderers can skip them.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::image::ImageRef;
use super::serde_helpers::null_as_default;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortableText(Vec<PortableBlock>);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "_type")]
pub enum PortableBlock {
    #[serde(rename = "block")]
    Text(TextBlock),
    #[serde(rename = "image")]
    Image(ImageRef),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub list_item: Option<String>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mark_defs: Vec<MarkDef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Span {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub marks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key", default)]
    pub key: String,
    #[serde(rename = "_type", default)]
    pub kind: String,
    #[serde(default)]
    pub href: Option<String>,
}

impl PortableText {
    pub fn new(blocks: Vec<PortableBlock>) -> Self {
        Self(blocks)
    }

    pub fn blocks(&self) -> &[PortableBlock] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|block| match block {
            PortableBlock::Text(text) => text.plain_text().trim().is_empty(),
            PortableBlock::Image(image) => image.asset_id().is_none(),
            PortableBlock::Unknown => true,
        })
    }

    /// Text content with one blank line between blocks; non-text blocks and
    /// empty blocks are skipped.
    pub fn to_plain_text(&self) -> String {
        self.0
            .iter()
            .filter_map(|block| match block {
                PortableBlock::Text(text) => Some(text.plain_text()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
            .trim()
            .to_string()
    }
}

impl TextBlock {
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn style(&self) -> &str {
        self.style.as_deref().unwrap_or("normal")
    }

    pub fn mark_def(&self, key: &str) -> Option<&MarkDef> {
        self.mark_defs.iter().find(|def| def.key == key)
    }
}

impl<'de> Deserialize<'de> for PortableText {
    /// Accepts a block list, a single block or `null`. Entries that are not
    /// objects or do not decode as a block are dropped.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let entries = match raw {
            Value::Null => Vec::new(),
            Value::Array(entries) => entries,
            single @ Value::Object(_) => vec![single],
            _ => Vec::new(),
        };

        Ok(Self(
            entries
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
        ))
    }
}
