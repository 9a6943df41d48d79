//! Askama views, page mapping and portable-text rendering.

pub mod pages;
pub mod portable_text;
pub mod views;
