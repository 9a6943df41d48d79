//! Application services: CMS reads, page loaders, sitemap and the
//! revalidation webhook.

pub mod content;
pub mod error;
pub mod fetch;
pub mod queries;
pub mod repos;
pub mod revalidate;
pub mod sitemap;
