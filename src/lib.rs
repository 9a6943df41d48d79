//! CMS-backed academy website: page rendering, two-layer caching and the
//! revalidation webhook the CMS calls after a publish.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
