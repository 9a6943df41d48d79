//! Domain layer: CMS document shapes and the pure helpers around them.

pub mod content;
pub mod image;
pub mod portable_text;
pub mod serde_helpers;
pub mod slug;
