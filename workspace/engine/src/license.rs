//! License requests: enterprises ask for more profile seats or more
//! sub-licenses and a platform administrator approves or rejects them.

use std::str::FromStr;

use chrono::Utc;
use model::entities::license_request::{self, LicenseRequestStatus, LicenseRequestType};
use model::entities::{enterprise, user};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseAction {
    Approve,
    Reject,
}

impl LicenseAction {
    fn target_status(self) -> LicenseRequestStatus {
        match self {
            LicenseAction::Approve => LicenseRequestStatus::Approved,
            LicenseAction::Reject => LicenseRequestStatus::Rejected,
        }
    }
}

impl FromStr for LicenseAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(LicenseAction::Approve),
            "reject" => Ok(LicenseAction::Reject),
            other => Err(EngineError::InvalidOperation(format!(
                "unknown license action '{other}'"
            ))),
        }
    }
}

/// Files a pending request on behalf of the requester's enterprise.
#[instrument(skip(db, requester), fields(user_id = requester.id))]
pub async fn submit_request<C: ConnectionTrait>(
    db: &C,
    requester: &user::Model,
    request_type: LicenseRequestType,
    amount: i32,
) -> Result<license_request::Model> {
    trace!("Entering submit_request");

    let Some(enterprise_id) = requester.enterprise_id else {
        warn!("User {} has no enterprise to request licenses for", requester.id);
        return Err(EngineError::Forbidden);
    };
    if amount <= 0 {
        return Err(EngineError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }

    let request = license_request::ActiveModel {
        enterprise_id: Set(enterprise_id),
        user_id: Set(requester.id),
        request_type: Set(request_type),
        amount: Set(amount),
        status: Set(LicenseRequestStatus::Pending),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "License request {} filed: {:?} x{} for enterprise {}",
        request.id, request_type, amount, enterprise_id
    );
    Ok(request)
}

/// Approves or rejects a pending request. Approval raises the enterprise's
/// matching capacity by exactly `amount`; a request that has already been
/// decided is refused, so capacity is never granted twice.
#[instrument(skip(db))]
pub async fn handle_request(
    db: &DatabaseConnection,
    request_id: i32,
    action: LicenseAction,
) -> Result<license_request::Model> {
    trace!("Entering handle_request");
    let txn = db.begin().await?;

    let request = license_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(EngineError::not_found("License request"))?;

    let transition = license_request::Entity::update_many()
        .col_expr(
            license_request::Column::Status,
            Expr::value(action.target_status()),
        )
        .filter(license_request::Column::Id.eq(request_id))
        .filter(license_request::Column::Status.eq(LicenseRequestStatus::Pending))
        .exec(&txn)
        .await?;

    if transition.rows_affected != 1 {
        warn!(
            "License request {} was already {:?}",
            request_id, request.status
        );
        return Err(EngineError::InvalidOperation(format!(
            "license request {request_id} has already been processed"
        )));
    }

    if action == LicenseAction::Approve {
        let column = match request.request_type {
            LicenseRequestType::Profile => enterprise::Column::LicenseCount,
            LicenseRequestType::Sub => enterprise::Column::SubLicenseCount,
        };
        let grown = enterprise::Entity::update_many()
            .col_expr(column, Expr::col(column).add(request.amount))
            .filter(enterprise::Column::Id.eq(request.enterprise_id))
            .exec(&txn)
            .await?;
        if grown.rows_affected != 1 {
            return Err(EngineError::not_found("Enterprise"));
        }
        debug!(
            "Enterprise {} {:?} capacity raised by {}",
            request.enterprise_id, request.request_type, request.amount
        );
    }

    let handled = license_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(EngineError::not_found("License request"))?;
    txn.commit().await?;

    info!("License request {} is now {:?}", request_id, handled.status);
    Ok(handled)
}

/// Requests of one enterprise, newest first.
pub async fn list_for_enterprise<C: ConnectionTrait>(
    db: &C,
    enterprise_id: i32,
) -> Result<Vec<license_request::Model>> {
    let requests = license_request::Entity::find()
        .filter(license_request::Column::EnterpriseId.eq(enterprise_id))
        .order_by_desc(license_request::Column::Id)
        .all(db)
        .await?;
    debug!(
        "Found {} license requests for enterprise {}",
        requests.len(),
        enterprise_id
    );
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_enterprise, insert_user, reload_enterprise, setup_db, setup_file_db};
    use model::entities::user::UserRole;

    #[test]
    fn actions_parse_case_insensitively() {
        assert_eq!("approve".parse::<LicenseAction>().unwrap(), LicenseAction::Approve);
        assert_eq!(" REJECT ".parse::<LicenseAction>().unwrap(), LicenseAction::Reject);
        assert!(matches!(
            "escalate".parse::<LicenseAction>(),
            Err(EngineError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn approving_sub_request_adds_exact_amount_once() {
        let db = setup_db().await;
        let ent = insert_enterprise(&db, "Acme", 2, 3).await;
        let admin = insert_user(&db, "a@acme.test", UserRole::EnterpriseAdmin, Some(ent.id), 0).await;

        let request = submit_request(&db, &admin, LicenseRequestType::Sub, 5)
            .await
            .unwrap();
        assert_eq!(request.status, LicenseRequestStatus::Pending);

        let handled = handle_request(&db, request.id, LicenseAction::Approve)
            .await
            .unwrap();
        assert_eq!(handled.status, LicenseRequestStatus::Approved);
        assert_eq!(reload_enterprise(&db, ent.id).await.sub_license_count, 8);

        let again = handle_request(&db, request.id, LicenseAction::Approve)
            .await
            .unwrap_err();
        assert!(matches!(again, EngineError::InvalidOperation(_)));
        assert_eq!(reload_enterprise(&db, ent.id).await.sub_license_count, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_apply_once() {
        let (_dir, db) = setup_file_db().await;
        let ent = insert_enterprise(&db, "Acme", 2, 3).await;
        let admin = insert_user(&db, "a@acme.test", UserRole::EnterpriseAdmin, Some(ent.id), 0).await;
        let request = submit_request(&db, &admin, LicenseRequestType::Sub, 5)
            .await
            .unwrap();
        let request_id = request.id;

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            tasks.push(tokio::spawn(async move {
                handle_request(&db, request_id, LicenseAction::Approve).await
            }));
        }

        let mut approved = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(handled) => {
                    assert_eq!(handled.status, LicenseRequestStatus::Approved);
                    approved += 1;
                }
                Err(EngineError::InvalidOperation(_)) | Err(EngineError::Database(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(approved, 1);
        assert_eq!(reload_enterprise(&db, ent.id).await.sub_license_count, 8);
    }

    #[tokio::test]
    async fn approving_profile_request_grows_seats() {
        let db = setup_db().await;
        let ent = insert_enterprise(&db, "Acme", 2, 0).await;
        let admin = insert_user(&db, "a@acme.test", UserRole::EnterpriseAdmin, Some(ent.id), 0).await;
        let request = submit_request(&db, &admin, LicenseRequestType::Profile, 3)
            .await
            .unwrap();

        handle_request(&db, request.id, LicenseAction::Approve)
            .await
            .unwrap();
        let after = reload_enterprise(&db, ent.id).await;
        assert_eq!(after.license_count, 5);
        assert_eq!(after.sub_license_count, 0);
    }

    #[tokio::test]
    async fn rejection_leaves_capacity_alone() {
        let db = setup_db().await;
        let ent = insert_enterprise(&db, "Acme", 2, 3).await;
        let admin = insert_user(&db, "a@acme.test", UserRole::EnterpriseAdmin, Some(ent.id), 0).await;
        let request = submit_request(&db, &admin, LicenseRequestType::Sub, 4)
            .await
            .unwrap();

        let handled = handle_request(&db, request.id, LicenseAction::Reject)
            .await
            .unwrap();
        assert_eq!(handled.status, LicenseRequestStatus::Rejected);
        assert_eq!(reload_enterprise(&db, ent.id).await.sub_license_count, 3);

        let approve_after_reject = handle_request(&db, request.id, LicenseAction::Approve)
            .await
            .unwrap_err();
        assert!(matches!(approve_after_reject, EngineError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let db = setup_db().await;
        let err = handle_request(&db, 404, LicenseAction::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn submission_requires_enterprise_and_positive_amount() {
        let db = setup_db().await;
        let loner = insert_user(&db, "solo@example.com", UserRole::Staff, None, 0).await;
        let err = submit_request(&db, &loner, LicenseRequestType::Profile, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden));

        let ent = insert_enterprise(&db, "Acme", 1, 0).await;
        let member = insert_user(&db, "m@acme.test", UserRole::Staff, Some(ent.id), 0).await;
        let err = submit_request(&db, &member, LicenseRequestType::Profile, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        submit_request(&db, &member, LicenseRequestType::Profile, 1)
            .await
            .unwrap();
        submit_request(&db, &member, LicenseRequestType::Sub, 2)
            .await
            .unwrap();
        let listed = list_for_enterprise(&db, ent.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].request_type, LicenseRequestType::Sub);
    }
}
