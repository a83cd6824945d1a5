//! Card creation and editing on top of the quota and slug rules.

use chrono::Utc;
use common::derive_slug;
use model::entities::{card, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{EngineError, Result};
use crate::quota;
use crate::slug::SlugResolver;

/// Attempts at finding a free derived slug before giving up.
pub const SLUG_ATTEMPTS: usize = 5;

/// Profile content of a card.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardDraft {
    pub name: String,
    pub slug: Option<String>,
    pub template_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub socials: Option<JsonValue>,
    pub phones: Option<JsonValue>,
    pub emails: Option<JsonValue>,
    pub gallery: Option<JsonValue>,
    pub design: Option<JsonValue>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub template_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub socials: Option<JsonValue>,
    pub phones: Option<JsonValue>,
    pub emails: Option<JsonValue>,
    pub gallery: Option<JsonValue>,
    pub design: Option<JsonValue>,
}

/// Picks a derived slug for `name` that no card uses yet.
pub async fn free_derived_slug<C: ConnectionTrait>(
    db: &C,
    resolver: &SlugResolver,
    name: &str,
) -> Result<String> {
    for attempt in 1..=SLUG_ATTEMPTS {
        let candidate = derive_slug(name);
        if resolver.is_deferred(&candidate) || resolver.is_taken(db, &candidate).await? {
            debug!("Derived slug '{}' unavailable (attempt {})", candidate, attempt);
            continue;
        }
        return Ok(candidate);
    }
    warn!("No free slug for '{}' after {} attempts", name, SLUG_ATTEMPTS);
    Err(EngineError::Conflict(
        "could not allocate a unique slug".to_string(),
    ))
}

/// Inserts a user's primary card. The caller is responsible for the quota
/// counter (`card_count` starts at 1 for new users).
#[instrument(skip(db, resolver, draft))]
pub async fn insert_primary_card<C: ConnectionTrait>(
    db: &C,
    resolver: &SlugResolver,
    user_id: i32,
    draft: CardDraft,
) -> Result<card::Model> {
    let slug = match draft.slug.as_deref() {
        Some(raw) => claim_slug(db, resolver, raw).await?,
        None => free_derived_slug(db, resolver, &draft.name).await?,
    };
    insert_card(db, user_id, None, slug, draft).await
}

/// Creates an additional card for `owner_id`, parented to their primary card.
///
/// The quota slot is reserved and the card inserted in one transaction, so
/// concurrent creations cannot overshoot the limit.
#[instrument(skip(db, resolver, draft))]
pub async fn create_additional_card(
    db: &DatabaseConnection,
    resolver: &SlugResolver,
    owner_id: i32,
    draft: CardDraft,
) -> Result<card::Model> {
    trace!("Entering create_additional_card");
    check_name(&draft.name)?;

    let txn = db.begin().await?;
    quota::reserve_card_slot(&txn, owner_id).await?;

    let primary = card::Entity::find()
        .filter(card::Column::UserId.eq(owner_id))
        .filter(card::Column::ParentId.is_null())
        .order_by_asc(card::Column::Id)
        .one(&txn)
        .await?;

    let slug = match draft.slug.as_deref() {
        Some(raw) => claim_slug(&txn, resolver, raw).await?,
        None => free_derived_slug(&txn, resolver, &draft.name).await?,
    };
    let created = insert_card(&txn, owner_id, primary.map(|p| p.id), slug, draft).await?;
    txn.commit().await?;

    info!(
        "Card {} ('{}') created for user {}",
        created.id, created.slug, owner_id
    );
    Ok(created)
}

/// Applies `changes` to an already authorized card. A rename of the primary
/// card is copied to the owner's display name in the same transaction.
#[instrument(skip(db, resolver, card, changes), fields(card_id = card.id))]
pub async fn update_card(
    db: &DatabaseConnection,
    resolver: &SlugResolver,
    card: card::Model,
    changes: CardChanges,
) -> Result<card::Model> {
    trace!("Entering update_card");
    let txn = db.begin().await?;

    let owner_id = card.user_id;
    let is_primary = card.is_primary();
    let old_name = card.name.clone();
    let old_slug = card.slug.clone();
    let mut active = card.into_active_model();

    if let Some(raw) = changes.slug.as_deref() {
        let slug = resolver.check_assignable(raw)?;
        if slug != old_slug {
            if resolver.is_taken(&txn, &slug).await? {
                return Err(EngineError::Conflict(format!("slug '{slug}' is already taken")));
            }
            debug!("Changing slug '{}' -> '{}'", old_slug, slug);
            active.slug = Set(slug);
        }
    }

    let renamed = match changes.name {
        Some(name) => {
            check_name(&name)?;
            let name = name.trim().to_string();
            let changed = name != old_name;
            active.name = Set(name.clone());
            changed.then_some(name)
        }
        None => None,
    };

    if let Some(v) = changes.template_id {
        active.template_id = Set(Some(v));
    }
    if let Some(v) = changes.title {
        active.title = Set(Some(v));
    }
    if let Some(v) = changes.company {
        active.company = Set(Some(v));
    }
    if let Some(v) = changes.bio {
        active.bio = Set(Some(v));
    }
    if let Some(v) = changes.phone {
        active.phone = Set(Some(v));
    }
    if let Some(v) = changes.email {
        active.email = Set(Some(v));
    }
    if let Some(v) = changes.website {
        active.website = Set(Some(v));
    }
    if let Some(v) = changes.address {
        active.address = Set(Some(v));
    }
    if let Some(v) = changes.socials {
        active.socials = Set(Some(v));
    }
    if let Some(v) = changes.phones {
        active.phones = Set(Some(v));
    }
    if let Some(v) = changes.emails {
        active.emails = Set(Some(v));
    }
    if let Some(v) = changes.gallery {
        active.gallery = Set(Some(v));
    }
    if let Some(v) = changes.design {
        active.design = Set(Some(v));
    }
    active.updated_at = Set(Utc::now());

    let updated = active
        .update(&txn)
        .await
        .map_err(|e| EngineError::from_write(e, "slug is already taken"))?;

    if let (true, Some(name)) = (is_primary, renamed) {
        user::Entity::update_many()
            .col_expr(user::Column::Name, sea_orm::sea_query::Expr::value(name))
            .filter(user::Column::Id.eq(owner_id))
            .exec(&txn)
            .await?;
        debug!("Synchronized display name of user {}", owner_id);
    }

    txn.commit().await?;
    info!("Card {} updated", updated.id);
    Ok(updated)
}

/// Cards of a user, primary card first.
pub async fn list_user_cards<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<card::Model>> {
    let cards = card::Entity::find()
        .filter(card::Column::UserId.eq(user_id))
        .order_by_asc(card::Column::Id)
        .all(db)
        .await?;
    debug!("User {} owns {} cards", user_id, cards.len());
    Ok(cards)
}

#[instrument(skip(db))]
pub async fn set_card_suspended<C: ConnectionTrait>(
    db: &C,
    card_id: i32,
    suspended: bool,
) -> Result<card::Model> {
    let card = card::Entity::find_by_id(card_id)
        .one(db)
        .await?
        .ok_or(EngineError::not_found("Card"))?;

    let mut active = card.into_active_model();
    active.is_suspended = Set(suspended);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!("Card {} suspended = {}", card_id, suspended);
    Ok(updated)
}

async fn claim_slug<C: ConnectionTrait>(db: &C, resolver: &SlugResolver, raw: &str) -> Result<String> {
    let slug = resolver.check_assignable(raw)?;
    if resolver.is_taken(db, &slug).await? {
        return Err(EngineError::Conflict(format!("slug '{slug}' is already taken")));
    }
    Ok(slug)
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

async fn insert_card<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    parent_id: Option<i32>,
    slug: String,
    draft: CardDraft,
) -> Result<card::Model> {
    check_name(&draft.name)?;
    let now = Utc::now();
    card::ActiveModel {
        user_id: Set(user_id),
        slug: Set(slug.clone()),
        template_id: Set(draft.template_id),
        parent_id: Set(parent_id),
        is_suspended: Set(false),
        name: Set(draft.name.trim().to_string()),
        title: Set(draft.title),
        company: Set(draft.company),
        bio: Set(draft.bio),
        phone: Set(draft.phone),
        email: Set(draft.email),
        website: Set(draft.website),
        address: Set(draft.address),
        socials: Set(draft.socials),
        phones: Set(draft.phones),
        emails: Set(draft.emails),
        gallery: Set(draft.gallery),
        design: Set(draft.design),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| EngineError::from_write(e, &format!("slug '{slug}' is already taken")))
}
