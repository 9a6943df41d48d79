//! Sanity-compatible CMS adapters: the query API client and the image CDN
//! URL builder.

mod client;
mod image;

pub use client::SanityClient;
pub use image::{Fit, ImageUrl, ImageUrlBuilder};
