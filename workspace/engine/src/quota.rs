//! Personal card quota and enterprise seat accounting.
//!
//! Read-only checks ([`can_create_card`]) are advisory. Every allocation goes
//! through a conditional `UPDATE ... WHERE <counter> < <limit>` so two
//! concurrent requests can never both take the last slot; run the reservation
//! and the insert it guards in the same transaction.

use model::entities::{card, enterprise, user};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { current: u64, allowed: u64 },
    Exceeded { limit: i32 },
}

impl QuotaDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            QuotaDecision::Allowed { .. } => Ok(()),
            QuotaDecision::Exceeded { limit } => Err(EngineError::QuotaExceeded { limit }),
        }
    }
}

/// Number of cards a user may own: the primary card plus one per sub-license.
pub fn allowed_cards(sub_license_count: i32) -> u64 {
    1 + sub_license_count.max(0) as u64
}

/// Whether `owner` may create one more card, counting the cards that
/// actually exist.
#[instrument(skip(db, owner), fields(user_id = owner.id))]
pub async fn can_create_card<C: ConnectionTrait>(db: &C, owner: &user::Model) -> Result<QuotaDecision> {
    let current = card::Entity::find()
        .filter(card::Column::UserId.eq(owner.id))
        .count(db)
        .await?;
    let allowed = allowed_cards(owner.sub_license_count);

    debug!("User {} owns {} of {} allowed cards", owner.id, current, allowed);
    if current >= allowed {
        Ok(QuotaDecision::Exceeded {
            limit: owner.sub_license_count,
        })
    } else {
        Ok(QuotaDecision::Allowed { current, allowed })
    }
}

/// Takes one card slot from the user's quota. Run inside the transaction that
/// inserts the card.
#[instrument(skip(db))]
pub async fn reserve_card_slot<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<()> {
    let result = user::Entity::update_many()
        .col_expr(
            user::Column::CardCount,
            Expr::col(user::Column::CardCount).add(1),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(
            Expr::col(user::Column::CardCount)
                .lt(Expr::col(user::Column::SubLicenseCount).add(1)),
        )
        .exec(db)
        .await?;

    if result.rows_affected == 1 {
        debug!("Reserved a card slot for user {}", user_id);
        return Ok(());
    }

    match user::Entity::find_by_id(user_id).one(db).await? {
        Some(owner) => {
            warn!(
                "User {} is at their card quota ({} sub-licenses)",
                user_id, owner.sub_license_count
            );
            Err(EngineError::QuotaExceeded {
                limit: owner.sub_license_count,
            })
        }
        None => Err(EngineError::not_found("User")),
    }
}

/// Takes one profile seat from the enterprise. Run inside the transaction
/// that creates or claims the member.
#[instrument(skip(db))]
pub async fn reserve_enterprise_seat<C: ConnectionTrait>(db: &C, enterprise_id: i32) -> Result<()> {
    let result = enterprise::Entity::update_many()
        .col_expr(
            enterprise::Column::LicensesUsed,
            Expr::col(enterprise::Column::LicensesUsed).add(1),
        )
        .filter(enterprise::Column::Id.eq(enterprise_id))
        .filter(
            Expr::col(enterprise::Column::LicensesUsed)
                .lt(Expr::col(enterprise::Column::LicenseCount)),
        )
        .exec(db)
        .await?;

    if result.rows_affected == 1 {
        debug!("Reserved a seat in enterprise {}", enterprise_id);
        return Ok(());
    }

    match enterprise::Entity::find_by_id(enterprise_id).one(db).await? {
        Some(ent) => {
            warn!(
                "Enterprise {} has used all {} seats",
                enterprise_id, ent.license_count
            );
            Err(EngineError::QuotaExceeded {
                limit: ent.license_count,
            })
        }
        None => Err(EngineError::not_found("Enterprise")),
    }
}

/// Gives a seat back, e.g. when a member is deleted. Never goes below zero.
pub async fn release_enterprise_seat<C: ConnectionTrait>(db: &C, enterprise_id: i32) -> Result<()> {
    enterprise::Entity::update_many()
        .col_expr(
            enterprise::Column::LicensesUsed,
            Expr::col(enterprise::Column::LicensesUsed).sub(1),
        )
        .filter(enterprise::Column::Id.eq(enterprise_id))
        .filter(enterprise::Column::LicensesUsed.gt(0))
        .exec(db)
        .await?;
    Ok(())
}

/// Moves `amount` sub-licenses from the enterprise pool to one of its
/// members, raising the member's personal card quota. Both counters change
/// in one transaction or not at all.
#[instrument(skip(db))]
pub async fn grant_sub_licenses(
    db: &DatabaseConnection,
    enterprise_id: i32,
    member_id: i32,
    amount: i32,
) -> Result<user::Model> {
    if amount <= 0 {
        return Err(EngineError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let member = user::Entity::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(EngineError::not_found("User"))?;
    if member.enterprise_id != Some(enterprise_id) {
        warn!(
            "User {} is not a member of enterprise {}",
            member_id, enterprise_id
        );
        return Err(EngineError::Forbidden);
    }

    let pool = enterprise::Entity::update_many()
        .col_expr(
            enterprise::Column::SubLicensesUsed,
            Expr::col(enterprise::Column::SubLicensesUsed).add(amount),
        )
        .filter(enterprise::Column::Id.eq(enterprise_id))
        .filter(
            Expr::col(enterprise::Column::SubLicensesUsed)
                .lte(Expr::col(enterprise::Column::SubLicenseCount).sub(amount)),
        )
        .exec(&txn)
        .await?;

    if pool.rows_affected != 1 {
        let limit = enterprise::Entity::find_by_id(enterprise_id)
            .one(&txn)
            .await?
            .ok_or(EngineError::not_found("Enterprise"))?
            .sub_license_count;
        warn!(
            "Enterprise {} cannot grant {} more sub-licenses",
            enterprise_id, amount
        );
        return Err(EngineError::QuotaExceeded { limit });
    }

    user::Entity::update_many()
        .col_expr(
            user::Column::SubLicenseCount,
            Expr::col(user::Column::SubLicenseCount).add(amount),
        )
        .filter(user::Column::Id.eq(member_id))
        .exec(&txn)
        .await?;

    let updated = user::Entity::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(EngineError::not_found("User"))?;
    txn.commit().await?;

    info!(
        "Granted {} sub-licenses to user {} (now {})",
        amount, member_id, updated.sub_license_count
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        insert_card, insert_enterprise, insert_user, reload_enterprise, reload_user, setup_db,
    };
    use model::entities::user::UserRole;

    #[tokio::test]
    async fn one_card_and_no_sub_licenses_is_denied() {
        let db = setup_db().await;
        let owner = insert_user(&db, "q0@example.com", UserRole::Staff, None, 0).await;
        insert_card(&db, owner.id, "q0-card", None, None).await;

        let decision = can_create_card(&db, &owner).await.unwrap();
        assert_eq!(decision, QuotaDecision::Exceeded { limit: 0 });
        assert!(matches!(
            decision.into_result(),
            Err(EngineError::QuotaExceeded { limit: 0 })
        ));
    }

    #[tokio::test]
    async fn one_card_and_one_sub_license_is_allowed() {
        let db = setup_db().await;
        let owner = insert_user(&db, "q1@example.com", UserRole::Staff, None, 1).await;
        insert_card(&db, owner.id, "q1-card", None, None).await;

        let decision = can_create_card(&db, &owner).await.unwrap();
        assert_eq!(
            decision,
            QuotaDecision::Allowed {
                current: 1,
                allowed: 2
            }
        );
    }

    #[tokio::test]
    async fn card_slot_reservation_stops_at_limit() {
        let db = setup_db().await;
        let owner = insert_user(&db, "slots@example.com", UserRole::Staff, None, 1).await;
        insert_card(&db, owner.id, "slots-primary", None, None).await;

        reserve_card_slot(&db, owner.id).await.unwrap();
        let err = reserve_card_slot(&db, owner.id).await.unwrap_err();
        assert!(matches!(err, EngineError::QuotaExceeded { limit: 1 }));
        assert_eq!(reload_user(&db, owner.id).await.card_count, 2);
    }

    #[tokio::test]
    async fn seat_reservation_respects_license_count() {
        let db = setup_db().await;
        let ent = insert_enterprise(&db, "Seats", 1, 0).await;

        reserve_enterprise_seat(&db, ent.id).await.unwrap();
        let err = reserve_enterprise_seat(&db, ent.id).await.unwrap_err();
        assert!(matches!(err, EngineError::QuotaExceeded { limit: 1 }));

        release_enterprise_seat(&db, ent.id).await.unwrap();
        release_enterprise_seat(&db, ent.id).await.unwrap();
        assert_eq!(reload_enterprise(&db, ent.id).await.licenses_used, 0);

        let missing = reserve_enterprise_seat(&db, 9999).await.unwrap_err();
        assert!(matches!(missing, EngineError::NotFound { entity: "Enterprise" }));
    }

    #[tokio::test]
    async fn sub_license_grant_moves_quota_to_member() {
        let db = setup_db().await;
        let ent = insert_enterprise(&db, "Pool", 5, 3).await;
        let member = insert_user(&db, "m@pool.test", UserRole::Staff, Some(ent.id), 0).await;

        let updated = grant_sub_licenses(&db, ent.id, member.id, 2).await.unwrap();
        assert_eq!(updated.sub_license_count, 2);
        assert_eq!(reload_enterprise(&db, ent.id).await.sub_licenses_used, 2);

        let err = grant_sub_licenses(&db, ent.id, member.id, 2).await.unwrap_err();
        assert!(matches!(err, EngineError::QuotaExceeded { limit: 3 }));
        assert_eq!(reload_user(&db, member.id).await.sub_license_count, 2);
        assert_eq!(reload_enterprise(&db, ent.id).await.sub_licenses_used, 2);
    }

    #[tokio::test]
    async fn sub_license_grant_checks_membership_and_amount() {
        let db = setup_db().await;
        let ent = insert_enterprise(&db, "Pool", 5, 3).await;
        let outsider = insert_user(&db, "o@else.test", UserRole::Staff, None, 0).await;

        let err = grant_sub_licenses(&db, ent.id, outsider.id, 1).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden));

        let err = grant_sub_licenses(&db, ent.id, outsider.id, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
