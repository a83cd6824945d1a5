//! Slug Resolution Engine.
//!
//! Maps a public path segment to a card and the variant it is rendered with.
//! Resolution is read-only and idempotent, and distinguishes three outcomes:
//!
//! * [`SlugResolution::Defer`]: the segment is not a card route at all (it
//!   looks like a file, or it is a reserved word); the caller should carry on
//!   with its normal static/route handling.
//! * [`SlugResolution::NotFound`]: no card is served. A missing card, a
//!   suspended card and a card whose owner is suspended all end up here and
//!   are indistinguishable to the caller.
//! * [`SlugResolution::Card`]: the card plus its [`RenderVariant`].

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{RenderVariant, is_well_formed_slug, normalize_slug};
use model::entities::{card, user};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::{debug, instrument, trace};

use crate::error::{EngineError, Result};

/// Version of the built-in reserved word list.
pub const BUILTIN_RESERVED_VERSION: u32 = 1;

const BUILTIN_RESERVED: &[&str] = &[
    // system routes
    "api",
    "admin",
    "auth",
    "login",
    "logout",
    "register",
    "signup",
    "dashboard",
    "enterprise",
    "settings",
    "health",
    "swagger-ui",
    "api-docs",
    "public",
    // static roots
    "static",
    "assets",
    "templates",
    "uploads",
    "images",
    // known assets
    "favicon.ico",
    "robots.txt",
    "sitemap.xml",
    "manifest.json",
];

/// Versioned set of path segments that must never resolve to a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedWords {
    version: u32,
    words: BTreeSet<String>,
}

impl Default for ReservedWords {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReservedWords {
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_RESERVED_VERSION,
            words: BUILTIN_RESERVED.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Adds configured words on top of the current set and records the
    /// configured version.
    pub fn extended<I, S>(mut self, version: u32, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.version = version;
        self.words.extend(
            extra
                .into_iter()
                .map(|w| normalize_slug(w.as_ref()))
                .filter(|w| !w.is_empty()),
        );
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.words.contains(&normalize_slug(segment))
    }
}

/// Outcome of resolving a path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SlugResolution {
    Defer,
    NotFound,
    Card {
        card: card::Model,
        variant: RenderVariant,
    },
}

#[derive(Debug, Clone)]
pub struct SlugResolver {
    reserved: Arc<ReservedWords>,
}

impl Default for SlugResolver {
    fn default() -> Self {
        Self::new(Arc::new(ReservedWords::builtin()))
    }
}

impl SlugResolver {
    pub fn new(reserved: Arc<ReservedWords>) -> Self {
        Self { reserved }
    }

    pub fn reserved(&self) -> &ReservedWords {
        &self.reserved
    }

    /// Whether the segment belongs to static/route handling rather than to
    /// card resolution.
    pub fn is_deferred(&self, segment: &str) -> bool {
        let normalized = normalize_slug(segment);
        normalized.is_empty() || segment.contains('.') || self.reserved.contains(&normalized)
    }

    /// Resolves a path segment to a card page.
    #[instrument(skip(self, db))]
    pub async fn resolve<C: ConnectionTrait>(&self, db: &C, segment: &str) -> Result<SlugResolution> {
        trace!("Entering SlugResolver::resolve");

        if self.is_deferred(segment) {
            debug!("Segment '{}' deferred to static/route handling", segment);
            return Ok(SlugResolution::Defer);
        }

        match self.find_active(db, segment).await? {
            Some(card) => {
                let variant = RenderVariant::from_template_id(card.template_id.as_deref());
                debug!("Slug '{}' resolved to card {} ({:?})", segment, card.id, variant);
                Ok(SlugResolution::Card { card, variant })
            }
            None => Ok(SlugResolution::NotFound),
        }
    }

    /// Card lookup shared by page resolution and the public card API:
    /// case-insensitive, whitespace tolerant, and blind to suspended cards
    /// and cards of suspended owners.
    #[instrument(skip(self, db))]
    pub async fn find_active<C: ConnectionTrait>(
        &self,
        db: &C,
        slug: &str,
    ) -> Result<Option<card::Model>> {
        let normalized = normalize_slug(slug);
        if normalized.is_empty() {
            return Ok(None);
        }

        let found = card::Entity::find()
            .filter(card::Column::Slug.eq(normalized.as_str()))
            .find_also_related(user::Entity)
            .one(db)
            .await?;

        let active = match found {
            Some((card, Some(owner))) if !card.is_suspended && !owner.is_suspended => Some(card),
            Some((card, _)) => {
                // Same outcome as a miss so suspension does not leak.
                debug!("Card {} is hidden (card or owner suspended)", card.id);
                None
            }
            None => None,
        };
        Ok(active)
    }

    /// Validates and normalizes a slug chosen for a card. Reserved words and
    /// anything that would be deferred are refused so a card can never be
    /// shadowed by a system route.
    pub fn check_assignable(&self, raw: &str) -> Result<String> {
        let slug = normalize_slug(raw);
        if !is_well_formed_slug(&slug) {
            return Err(EngineError::Validation(format!(
                "slug '{}' must be 1-64 characters of a-z, 0-9 and inner dashes",
                raw.trim()
            )));
        }
        if self.is_deferred(&slug) {
            return Err(EngineError::Validation(format!(
                "slug '{slug}' is reserved"
            )));
        }
        Ok(slug)
    }

    /// Whether a normalized slug is already used by any card (suspended ones
    /// included).
    pub async fn is_taken<C: ConnectionTrait>(&self, db: &C, slug: &str) -> Result<bool> {
        let count = card::Entity::find()
            .filter(card::Column::Slug.eq(slug))
            .count(db)
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_card, insert_user, set_card_suspended, set_user_suspended, setup_db};
    use model::entities::user::UserRole;

    #[test]
    fn dotted_and_reserved_segments_are_deferred() {
        let resolver = SlugResolver::default();
        assert!(resolver.is_deferred("favicon.ico"));
        assert!(resolver.is_deferred("style.css"));
        assert!(resolver.is_deferred("API"));
        assert!(resolver.is_deferred(" login "));
        assert!(resolver.is_deferred(""));
        assert!(!resolver.is_deferred("jane-doe"));
    }

    #[test]
    fn configured_words_extend_builtin_set() {
        let words = ReservedWords::builtin().extended(2, ["Pricing", " "]);
        assert_eq!(words.version(), 2);
        assert!(words.contains("pricing"));
        assert!(words.contains("api"));
        assert_eq!(words.len(), BUILTIN_RESERVED.len() + 1);
    }

    #[test]
    fn assignable_slugs_are_normalized() {
        let resolver = SlugResolver::default();
        assert_eq!(resolver.check_assignable("  Jane-Doe ").unwrap(), "jane-doe");
        assert!(matches!(
            resolver.check_assignable("dashboard"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            resolver.check_assignable("jane.doe"),
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn resolves_case_insensitively_with_variant() {
        let db = setup_db().await;
        let owner = insert_user(&db, "jane@example.com", UserRole::Staff, None, 0).await;
        let card = insert_card(&db, owner.id, "jane-doe", None, Some("modern")).await;
        let resolver = SlugResolver::default();

        let outcome = resolver.resolve(&db, "  JANE-Doe ").await.unwrap();
        assert_eq!(
            outcome,
            SlugResolution::Card {
                card: card.clone(),
                variant: RenderVariant::Modern
            }
        );

        // Idempotent without intervening writes
        let again = resolver.resolve(&db, "jane-doe").await.unwrap();
        assert_eq!(outcome, again);
    }

    #[tokio::test]
    async fn suspension_is_indistinguishable_from_absence() {
        let db = setup_db().await;
        let owner = insert_user(&db, "s@example.com", UserRole::Staff, None, 0).await;
        let card = insert_card(&db, owner.id, "hidden-card", None, None).await;
        let other = insert_user(&db, "t@example.com", UserRole::Staff, None, 0).await;
        insert_card(&db, other.id, "owner-hidden", None, None).await;
        let resolver = SlugResolver::default();

        let missing = resolver.resolve(&db, "no-such-card").await.unwrap();

        set_card_suspended(&db, card.id, true).await;
        let card_suspended = resolver.resolve(&db, "hidden-card").await.unwrap();

        set_user_suspended(&db, other.id, true).await;
        let owner_suspended = resolver.resolve(&db, "owner-hidden").await.unwrap();

        assert_eq!(missing, SlugResolution::NotFound);
        assert_eq!(card_suspended, missing);
        assert_eq!(owner_suspended, missing);
    }

    #[tokio::test]
    async fn reserved_word_shadows_existing_card() {
        let db = setup_db().await;
        let owner = insert_user(&db, "legacy@example.com", UserRole::Staff, None, 0).await;
        // A card created before "pricing" became a system route
        insert_card(&db, owner.id, "pricing", None, None).await;

        let before = SlugResolver::default();
        assert!(matches!(
            before.resolve(&db, "pricing").await.unwrap(),
            SlugResolution::Card { .. }
        ));

        let after = SlugResolver::new(Arc::new(ReservedWords::builtin().extended(2, ["pricing"])));
        assert_eq!(after.resolve(&db, "pricing").await.unwrap(), SlugResolution::Defer);
    }

    #[tokio::test]
    async fn unknown_template_uses_default_variant() {
        let db = setup_db().await;
        let owner = insert_user(&db, "d@example.com", UserRole::Staff, None, 0).await;
        insert_card(&db, owner.id, "plain", None, Some("neon-glow")).await;

        match SlugResolver::default().resolve(&db, "plain").await.unwrap() {
            SlugResolution::Card { variant, .. } => assert_eq!(variant, RenderVariant::Classic),
            other => panic!("expected a card, got {other:?}"),
        }
    }
}
