//! Authorization Engine: decides who may read and write a card under the
//! ownership / delegation / enterprise hierarchy.
//!
//! Write decision order, first match wins:
//!
//! 1. the principal owns the card;
//! 2. only when the caller claims an enterprise-admin context *and* the
//!    principal holds an administrative role:
//!    * the owner's `assigned_admin_id` is the principal (delegation),
//!    * owner and principal share a non-null `enterprise_id`,
//!    * the owner has no enterprise while the principal has one
//!      (unassigned-user fallback, can be switched off);
//! 3. otherwise deny.

use model::entities::{card, user};
use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::{debug, instrument, warn};

use crate::error::{EngineError, Result};
use crate::identity::{Principal, load_actor};

/// Which rule granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantPath {
    Owner,
    Delegated,
    SameEnterprise,
    UnassignedFallback,
    PlatformAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(GrantPath),
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// A card the principal has been allowed to act on.
#[derive(Debug, Clone)]
pub struct Grant {
    pub card: card::Model,
    pub via: GrantPath,
}

#[derive(Debug, Clone)]
pub struct AuthorizationEngine {
    allow_unassigned_fallback: bool,
}

impl Default for AuthorizationEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AuthorizationEngine {
    pub fn new(allow_unassigned_fallback: bool) -> Self {
        Self {
            allow_unassigned_fallback,
        }
    }

    /// Whether administrators may take over users that belong to no
    /// enterprise, either implicitly or through an explicit claim.
    pub fn allows_unassigned_takeover(&self) -> bool {
        self.allow_unassigned_fallback
    }

    /// Write eligibility for `card_id`. A missing card is `NotFound`; every
    /// other refusal is `Ok(Decision::Deny)`.
    #[instrument(skip(self, db))]
    pub async fn authorize_write<C: ConnectionTrait>(
        &self,
        db: &C,
        principal: &Principal,
        card_id: i32,
        claims_enterprise_override: bool,
    ) -> Result<Decision> {
        let card = find_card(db, card_id).await?;
        self.decide_write(db, principal, &card, claims_enterprise_override)
            .await
    }

    /// Same as [`authorize_write`](Self::authorize_write) but hands back the
    /// card on success and maps a denial to [`EngineError::Forbidden`].
    pub async fn require_write<C: ConnectionTrait>(
        &self,
        db: &C,
        principal: &Principal,
        card_id: i32,
        claims_enterprise_override: bool,
    ) -> Result<Grant> {
        let card = find_card(db, card_id).await?;
        match self
            .decide_write(db, principal, &card, claims_enterprise_override)
            .await?
        {
            Decision::Allow(via) => Ok(Grant { card, via }),
            Decision::Deny => {
                warn!(
                    "User {} denied write access to card {}",
                    principal.user_id, card.id
                );
                Err(EngineError::Forbidden)
            }
        }
    }

    /// Management read access: everyone who could write with an enterprise
    /// claim, plus platform administrators.
    #[instrument(skip(self, db))]
    pub async fn require_read<C: ConnectionTrait>(
        &self,
        db: &C,
        principal: &Principal,
        card_id: i32,
    ) -> Result<Grant> {
        let card = find_card(db, card_id).await?;
        if card.user_id == principal.user_id {
            return Ok(Grant {
                card,
                via: GrantPath::Owner,
            });
        }

        let actor = load_actor(db, principal).await?;
        if actor.role.is_platform_admin() {
            return Ok(Grant {
                card,
                via: GrantPath::PlatformAdmin,
            });
        }

        let owner = find_owner(db, &card).await?;
        match self.decide_override(&actor, &owner) {
            Decision::Allow(via) => Ok(Grant { card, via }),
            Decision::Deny => {
                warn!(
                    "User {} denied read access to card {}",
                    principal.user_id, card.id
                );
                Err(EngineError::Forbidden)
            }
        }
    }

    async fn decide_write<C: ConnectionTrait>(
        &self,
        db: &C,
        principal: &Principal,
        card: &card::Model,
        claims_enterprise_override: bool,
    ) -> Result<Decision> {
        if card.user_id == principal.user_id {
            return Ok(Decision::Allow(GrantPath::Owner));
        }
        if !claims_enterprise_override {
            debug!("No enterprise override claimed; not the owner");
            return Ok(Decision::Deny);
        }

        // Both rows are re-read on every call.
        let actor = load_actor(db, principal).await?;
        let owner = find_owner(db, card).await?;
        Ok(self.decide_override(&actor, &owner))
    }

    /// Enterprise-override branch over freshly loaded rows.
    pub fn decide_override(&self, actor: &user::Model, owner: &user::Model) -> Decision {
        if !actor.role.is_administrative() {
            debug!("User {} has no administrative role", actor.id);
            return Decision::Deny;
        }

        if owner.assigned_admin_id == Some(actor.id) {
            return Decision::Allow(GrantPath::Delegated);
        }

        match (owner.enterprise_id, actor.enterprise_id) {
            (Some(owner_ent), Some(actor_ent)) if owner_ent == actor_ent => {
                Decision::Allow(GrantPath::SameEnterprise)
            }
            (None, Some(_)) if self.allow_unassigned_fallback => {
                debug!(
                    "User {} acting on unassigned user {} via fallback",
                    actor.id, owner.id
                );
                Decision::Allow(GrantPath::UnassignedFallback)
            }
            _ => Decision::Deny,
        }
    }
}

/// Loads the principal and refuses anyone who is not a platform administrator.
pub async fn require_platform_admin<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
) -> Result<user::Model> {
    let actor = load_actor(db, principal).await?;
    if actor.role.is_platform_admin() {
        Ok(actor)
    } else {
        warn!("User {} attempted a platform action", actor.id);
        Err(EngineError::Forbidden)
    }
}

/// Loads the principal and refuses anyone who is not an administrator of an
/// enterprise. Returns the actor and its enterprise id.
pub async fn require_enterprise_admin<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
) -> Result<(user::Model, i32)> {
    let actor = load_actor(db, principal).await?;
    match actor.enterprise_id {
        Some(enterprise_id) if actor.role.is_administrative() => Ok((actor, enterprise_id)),
        _ => {
            warn!("User {} attempted an enterprise admin action", actor.id);
            Err(EngineError::Forbidden)
        }
    }
}

async fn find_card<C: ConnectionTrait>(db: &C, card_id: i32) -> Result<card::Model> {
    card::Entity::find_by_id(card_id)
        .one(db)
        .await?
        .ok_or(EngineError::not_found("Card"))
}

async fn find_owner<C: ConnectionTrait>(db: &C, card: &card::Model) -> Result<user::Model> {
    user::Entity::find_by_id(card.user_id)
        .one(db)
        .await?
        .ok_or(EngineError::not_found("User"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_card, insert_enterprise, insert_user, setup_db, user_fixture};
    use model::entities::user::UserRole;
    use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

    #[test]
    fn override_requires_administrative_role() {
        let engine = AuthorizationEngine::default();
        let actor = user_fixture(1, UserRole::Staff, Some(7));
        let owner = user_fixture(2, UserRole::Staff, Some(7));
        assert_eq!(engine.decide_override(&actor, &owner), Decision::Deny);
    }

    #[test]
    fn override_paths_in_order() {
        let engine = AuthorizationEngine::default();
        let admin = user_fixture(1, UserRole::EnterpriseAdmin, Some(7));

        let mut delegated = user_fixture(2, UserRole::Staff, Some(99));
        delegated.assigned_admin_id = Some(1);
        assert_eq!(
            engine.decide_override(&admin, &delegated),
            Decision::Allow(GrantPath::Delegated)
        );

        let colleague = user_fixture(3, UserRole::Staff, Some(7));
        assert_eq!(
            engine.decide_override(&admin, &colleague),
            Decision::Allow(GrantPath::SameEnterprise)
        );

        let orphan = user_fixture(4, UserRole::Staff, None);
        assert_eq!(
            engine.decide_override(&admin, &orphan),
            Decision::Allow(GrantPath::UnassignedFallback)
        );

        let foreign = user_fixture(5, UserRole::Staff, Some(8));
        assert_eq!(engine.decide_override(&admin, &foreign), Decision::Deny);
    }

    #[test]
    fn fallback_can_be_disabled() {
        let engine = AuthorizationEngine::new(false);
        let admin = user_fixture(1, UserRole::Admin, Some(7));
        let orphan = user_fixture(4, UserRole::Staff, None);
        assert_eq!(engine.decide_override(&admin, &orphan), Decision::Deny);
    }

    #[test]
    fn admin_without_enterprise_gets_no_enterprise_paths() {
        let engine = AuthorizationEngine::default();
        let admin = user_fixture(1, UserRole::Admin, None);
        let orphan = user_fixture(4, UserRole::Staff, None);
        assert_eq!(engine.decide_override(&admin, &orphan), Decision::Deny);
    }

    #[tokio::test]
    async fn owner_always_passes() {
        let db = setup_db().await;
        let owner = insert_user(&db, "own@example.com", UserRole::Staff, None, 0).await;
        let card = insert_card(&db, owner.id, "own-card", None, None).await;
        let engine = AuthorizationEngine::default();
        let principal = Principal { user_id: owner.id };

        for claims in [false, true] {
            let decision = engine
                .authorize_write(&db, &principal, card.id, claims)
                .await
                .unwrap();
            assert_eq!(decision, Decision::Allow(GrantPath::Owner));
        }
    }

    #[tokio::test]
    async fn foreign_enterprise_admin_is_denied() {
        let db = setup_db().await;
        let acme = insert_enterprise(&db, "Acme", 5, 5).await;
        let globex = insert_enterprise(&db, "Globex", 5, 5).await;
        let owner = insert_user(&db, "o@acme.test", UserRole::Staff, Some(acme.id), 0).await;
        let card = insert_card(&db, owner.id, "acme-owner", None, None).await;
        let intruder =
            insert_user(&db, "i@globex.test", UserRole::EnterpriseAdmin, Some(globex.id), 0).await;
        let engine = AuthorizationEngine::default();
        let principal = Principal {
            user_id: intruder.id,
        };

        let decision = engine
            .authorize_write(&db, &principal, card.id, true)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny);

        let err = engine
            .require_write(&db, &principal, card.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden));
    }

    #[tokio::test]
    async fn same_enterprise_admin_needs_claim() {
        let db = setup_db().await;
        let acme = insert_enterprise(&db, "Acme", 5, 5).await;
        let owner = insert_user(&db, "m@acme.test", UserRole::Staff, Some(acme.id), 0).await;
        let card = insert_card(&db, owner.id, "acme-member", None, None).await;
        let admin = insert_user(&db, "a@acme.test", UserRole::EnterpriseAdmin, Some(acme.id), 0).await;
        let engine = AuthorizationEngine::default();
        let principal = Principal { user_id: admin.id };

        let without = engine
            .authorize_write(&db, &principal, card.id, false)
            .await
            .unwrap();
        assert_eq!(without, Decision::Deny);

        let with = engine
            .authorize_write(&db, &principal, card.id, true)
            .await
            .unwrap();
        assert_eq!(with, Decision::Allow(GrantPath::SameEnterprise));
    }

    #[tokio::test]
    async fn delegation_is_reread_on_every_call() {
        let db = setup_db().await;
        let owner = insert_user(&db, "d@example.com", UserRole::Staff, None, 0).await;
        let card = insert_card(&db, owner.id, "delegated", None, None).await;
        let admin = insert_user(&db, "boss@example.com", UserRole::Admin, None, 0).await;
        let engine = AuthorizationEngine::default();
        let principal = Principal { user_id: admin.id };

        assert_eq!(
            engine.authorize_write(&db, &principal, card.id, true).await.unwrap(),
            Decision::Deny
        );

        let mut active = owner.clone().into_active_model();
        active.assigned_admin_id = Set(Some(admin.id));
        active.update(&db).await.unwrap();

        assert_eq!(
            engine.authorize_write(&db, &principal, card.id, true).await.unwrap(),
            Decision::Allow(GrantPath::Delegated)
        );
    }

    #[tokio::test]
    async fn missing_card_is_not_found() {
        let db = setup_db().await;
        let user = insert_user(&db, "x@example.com", UserRole::Staff, None, 0).await;
        let err = AuthorizationEngine::default()
            .authorize_write(&db, &Principal { user_id: user.id }, 4242, false)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Card" }));
    }

    #[tokio::test]
    async fn platform_admin_reads_but_does_not_write() {
        let db = setup_db().await;
        let owner = insert_user(&db, "p@example.com", UserRole::Staff, None, 0).await;
        let card = insert_card(&db, owner.id, "private", None, None).await;
        let root = insert_user(&db, "root@example.com", UserRole::SuperAdmin, None, 0).await;
        let engine = AuthorizationEngine::default();
        let principal = Principal { user_id: root.id };

        let grant = engine.require_read(&db, &principal, card.id).await.unwrap();
        assert_eq!(grant.via, GrantPath::PlatformAdmin);

        let decision = engine
            .authorize_write(&db, &principal, card.id, true)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny);
    }
}
