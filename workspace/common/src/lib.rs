//! Storage-free building blocks shared by the engine and the HTTP layer.
//! Slug handling and the template-to-variant table live here so that both
//! sides agree on how a public path segment maps to a card page.

mod slug;
mod variant;

pub use slug::{derive_slug, is_well_formed_slug, normalize_slug, random_suffix, slugify};
pub use variant::RenderVariant;
