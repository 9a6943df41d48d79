use std::fmt::Write as _;

use crate::domain::image::{AssetId, ImageRef};

const CDN_ORIGIN: &str = "https://cdn.sanity.io";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Clip,
    Crop,
    Fill,
    FillMax,
    Max,
    Scale,
    Min,
}

impl Fit {
    pub fn as_str(self) -> &'static str {
        match self {
            Fit::Clip => "clip",
            Fit::Crop => "crop",
            Fit::Fill => "fill",
            Fit::FillMax => "fillmax",
            Fit::Max => "max",
            Fit::Scale => "scale",
            Fit::Min => "min",
        }
    }
}

/// Builds image CDN URLs for one project and dataset.
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    /// `None` when the image has no parseable asset reference.
    pub fn image(&self, image: &ImageRef) -> Option<ImageUrl<'_>> {
        image.asset_id().map(|asset| ImageUrl {
            builder: self,
            asset,
            width: None,
            height: None,
            fit: None,
            auto_format: false,
            quality: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ImageUrl<'a> {
    builder: &'a ImageUrlBuilder,
    asset: AssetId,
    width: Option<u32>,
    height: Option<u32>,
    fit: Option<Fit>,
    auto_format: bool,
    quality: Option<u8>,
}

impl ImageUrl<'_> {
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn fit(mut self, fit: Fit) -> Self {
        self.fit = Some(fit);
        self
    }

    pub fn auto_format(mut self) -> Self {
        self.auto_format = true;
        self
    }

    /// Clamped to 0..=100.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.min(100));
        self
    }

    pub fn url(&self) -> String {
        let asset = &self.asset;
        let mut url = format!(
            "{CDN_ORIGIN}/images/{}/{}/{}-{}x{}.{}",
            self.builder.project_id,
            self.builder.dataset,
            asset.id,
            asset.width,
            asset.height,
            asset.format
        );

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(width) = self.width {
            params.push(("w", width.to_string()));
        }
        if let Some(height) = self.height {
            params.push(("h", height.to_string()));
        }
        if let Some(quality) = self.quality {
            params.push(("q", quality.to_string()));
        }
        if let Some(fit) = self.fit {
            params.push(("fit", fit.as_str().to_string()));
        }
        if self.auto_format {
            params.push(("auto", "format".to_string()));
        }

        for (index, (name, value)) in params.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            let _ = write!(url, "{separator}{name}={value}");
        }
        url
    }
}
