//! Image references as the CMS returns them.
//!
//! Asset references encode the asset id, pixel size and format:
//! `image-<id>-<width>x<height>-<format>`.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetRef>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref", alias = "_id", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub metadata: Option<AssetMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssetMetadata {
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn aspect_ratio(self) -> Option<f64> {
        (self.width > 0 && self.height > 0).then(|| f64::from(self.width) / f64::from(self.height))
    }
}

/// Parsed form of an asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetId {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl AssetId {
    pub fn parse(reference: &str) -> Option<Self> {
        let rest = reference.strip_prefix("image-")?;
        let (rest, format) = rest.rsplit_once('-')?;
        let (id, size) = rest.rsplit_once('-')?;
        let (width, height) = size.split_once('x')?;
        let width = width.parse().ok()?;
        let height = height.parse().ok()?;
        if id.is_empty() || format.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            width,
            height,
            format: format.to_string(),
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

impl ImageRef {
    pub fn asset_id(&self) -> Option<AssetId> {
        self.asset
            .as_ref()
            .and_then(|asset| asset.reference.as_deref())
            .and_then(AssetId::parse)
    }

    /// Pixel size from asset metadata, falling back to the size encoded in
    /// the reference.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.asset
            .as_ref()
            .and_then(|asset| asset.metadata.as_ref())
            .and_then(|metadata| metadata.dimensions)
            .filter(|dimensions| dimensions.aspect_ratio().is_some())
            .or_else(|| self.asset_id().map(|asset| asset.dimensions()))
    }

    /// Trimmed alt text, when the editor supplied one.
    pub fn alt_text(&self) -> Option<&str> {
        self.alt
            .as_deref()
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
    }
}
