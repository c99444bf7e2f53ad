//! Draft artifact generation and domain tagging

pub mod markdown;
pub mod tags;

pub use markdown::{truncate_chars, ArtifactBuilder};
pub use tags::infer_domain_tags;
