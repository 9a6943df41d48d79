//! Portable text to sanitized HTML.

use std::collections::HashSet;
use std::fmt::Write as _;

use ammonia::Builder as AmmoniaBuilder;

use crate::domain::image::ImageRef;
use crate::domain::portable_text::{PortableBlock, PortableText, Span, TextBlock};
use crate::infra::sanity::{Fit, ImageUrlBuilder};

pub const CONTENT_IMAGE_WIDTH: u32 = 1600;
/// Height used when the asset carries no usable dimensions (16:9).
pub const CONTENT_IMAGE_DEFAULT_HEIGHT: u32 = 900;
pub const CONTENT_IMAGE_DEFAULT_ALT: &str = "Program content image";

pub struct PortableTextRenderer {
    images: ImageUrlBuilder,
    sanitizer: AmmoniaBuilder<'static>,
}

impl PortableTextRenderer {
    pub fn new(images: ImageUrlBuilder) -> Self {
        Self {
            images,
            sanitizer: build_sanitizer(),
        }
    }

    /// `None` when nothing renderable is left, so pages can show their
    /// placeholder copy instead of an empty section.
    pub fn render(&self, content: &PortableText) -> Option<String> {
        let mut html = String::new();
        let mut lists = ListStack::default();

        for block in content.blocks() {
            match block {
                PortableBlock::Text(text) if text.list_item.is_some() => {
                    lists.item(&mut html, text, render_inline(text));
                }
                PortableBlock::Text(text) => {
                    lists.close_all(&mut html);
                    render_text_block(&mut html, text);
                }
                PortableBlock::Image(image) => {
                    lists.close_all(&mut html);
                    self.render_image(&mut html, image);
                }
                PortableBlock::Unknown => {}
            }
        }
        lists.close_all(&mut html);

        if html.is_empty() {
            return None;
        }
        let cleaned = self.sanitizer.clean(&html).to_string();
        (!cleaned.trim().is_empty()).then_some(cleaned)
    }

    fn render_image(&self, html: &mut String, image: &ImageRef) {
        let (width, height) = content_image_size(image);
        let Some(url) = self.images.image(image) else {
            return;
        };
        let src = url
            .width(width)
            .height(height)
            .fit(Fit::Crop)
            .auto_format()
            .url();
        let alt = image.alt_text().unwrap_or(CONTENT_IMAGE_DEFAULT_ALT);

        let _ = write!(
            html,
            "<figure class=\"content-image\"><img src=\"{}\" alt=\"{}\" width=\"{width}\" height=\"{height}\">",
            escape(&src),
            escape(alt)
        );
        if let Some(caption) = image.alt_text() {
            let _ = write!(html, "<figcaption>{}</figcaption>", escape(caption));
        }
        html.push_str("</figure>");
    }
}

/// Fixed width; height follows the asset's aspect ratio.
pub fn content_image_size(image: &ImageRef) -> (u32, u32) {
    let height = image
        .dimensions()
        .and_then(|dimensions| dimensions.aspect_ratio())
        .map(|ratio| (f64::from(CONTENT_IMAGE_WIDTH) / ratio).round() as u32)
        .filter(|height| *height > 0)
        .unwrap_or(CONTENT_IMAGE_DEFAULT_HEIGHT);
    (CONTENT_IMAGE_WIDTH, height)
}

fn render_text_block(html: &mut String, block: &TextBlock) {
    let inner = render_inline(block);
    if inner.trim().is_empty() {
        return;
    }
    let tag = match block.style() {
        "h2" => "h2",
        "h3" => "h3",
        "h4" => "h4",
        "blockquote" => "blockquote",
        _ => "p",
    };
    let _ = write!(html, "<{tag}>{inner}</{tag}>");
}

fn render_inline(block: &TextBlock) -> String {
    block
        .children
        .iter()
        .map(|span| render_span(block, span))
        .collect()
}

fn render_span(block: &TextBlock, span: &Span) -> String {
    let mut html = span
        .text
        .split('\n')
        .map(escape)
        .collect::<Vec<_>>()
        .join("<br>");
    for mark in span.marks.iter().rev() {
        html = match mark.as_str() {
            "strong" => format!("<strong>{html}</strong>"),
            "em" => format!("<em>{html}</em>"),
            "code" => format!("<code>{html}</code>"),
            "underline" => format!("<u>{html}</u>"),
            "strike-through" => format!("<s>{html}</s>"),
            key => match block.mark_def(key) {
                Some(def) if def.kind == "link" => match def.href.as_deref() {
                    Some(href) if !href.trim().is_empty() => link(href.trim(), &html),
                    _ => html,
                },
                _ => html,
            },
        };
    }
    html
}

fn link(href: &str, inner: &str) -> String {
    let target = if href.starts_with("http") {
        " target=\"_blank\""
    } else {
        ""
    };
    format!("<a href=\"{}\"{target}>{inner}</a>", escape(href))
}

#[derive(Default)]
struct ListStack {
    open: Vec<OpenList>,
}

struct OpenList {
    tag: &'static str,
    item_open: bool,
}

impl ListStack {
    fn item(&mut self, html: &mut String, block: &TextBlock, inner: String) {
        let tag = match block.list_item.as_deref() {
            Some("number") => "ol",
            _ => "ul",
        };
        let level = usize::from(block.level.unwrap_or(1).max(1));

        while self.open.len() > level {
            self.close_one(html);
        }
        if self.open.len() == level && self.open.last().is_some_and(|list| list.tag != tag) {
            self.close_one(html);
        }
        while self.open.len() < level {
            let _ = write!(html, "<{tag}>");
            self.open.push(OpenList {
                tag,
                item_open: false,
            });
        }

        if let Some(list) = self.open.last_mut() {
            if list.item_open {
                html.push_str("</li>");
            }
            let _ = write!(html, "<li>{inner}");
            list.item_open = true;
        }
    }

    fn close_one(&mut self, html: &mut String) {
        if let Some(list) = self.open.pop() {
            if list.item_open {
                html.push_str("</li>");
            }
            let _ = write!(html, "</{}>", list.tag);
        }
    }

    fn close_all(&mut self, html: &mut String) {
        while !self.open.is_empty() {
            self.close_one(html);
        }
    }
}

fn escape(value: &str) -> String {
    ammonia::clean_text(value)
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "em",
        "figcaption",
        "figure",
        "h2",
        "h3",
        "h4",
        "img",
        "li",
        "ol",
        "p",
        "s",
        "strong",
        "u",
        "ul",
    ]);
    builder.tags(tags);
    builder.add_tag_attributes("a", &["href", "target"]);
    builder.add_tag_attributes("img", &["src", "alt", "width", "height"]);
    builder.add_tag_attributes("figure", &["class"]);

    builder
}
