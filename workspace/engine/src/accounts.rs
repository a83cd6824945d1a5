//! User accounts: registration, login, enterprise membership and the
//! platform administration actions.

use chrono::{DateTime, Utc};
use model::entities::user::UserRole;
use model::entities::{card, enterprise, session, user};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::authz::AuthorizationEngine;
use crate::cards::{self, CardDraft};
use crate::error::{EngineError, Result};
use crate::password::PasswordPolicy;
use crate::quota;
use crate::session::SessionStore;
use crate::slug::SlugResolver;

/// Data needed to create a user together with their primary card.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub template_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnterpriseInput {
    pub name: String,
    pub license_count: i32,
    pub sub_license_count: i32,
    pub logo: Option<String>,
    pub admin: RegisterInput,
}

/// Services shared by every account operation.
#[derive(Debug, Clone, Copy)]
pub struct AccountContext<'a> {
    pub passwords: &'a PasswordPolicy,
    pub slugs: &'a SlugResolver,
}

struct NewUser {
    role: UserRole,
    enterprise_id: Option<i32>,
    assigned_admin_id: Option<i32>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Self-service registration: a `staff` user with one primary card.
#[instrument(skip(db, ctx, input), fields(email = %normalize_email(&input.email)))]
pub async fn register(
    db: &DatabaseConnection,
    ctx: AccountContext<'_>,
    input: RegisterInput,
) -> Result<(user::Model, card::Model)> {
    trace!("Entering register");
    let txn = db.begin().await?;
    let created = create_user_with_card(
        &txn,
        ctx,
        input,
        NewUser {
            role: UserRole::Staff,
            enterprise_id: None,
            assigned_admin_id: None,
        },
    )
    .await?;
    txn.commit().await?;

    info!(
        "Registered user {} with primary card '{}'",
        created.0.id, created.1.slug
    );
    Ok(created)
}

/// Bootstraps a platform operator (`super_admin`).
#[instrument(skip(db, ctx, input), fields(email = %normalize_email(&input.email)))]
pub async fn create_super_admin(
    db: &DatabaseConnection,
    ctx: AccountContext<'_>,
    input: RegisterInput,
) -> Result<user::Model> {
    let txn = db.begin().await?;
    let (admin, _) = create_user_with_card(
        &txn,
        ctx,
        input,
        NewUser {
            role: UserRole::SuperAdmin,
            enterprise_id: None,
            assigned_admin_id: None,
        },
    )
    .await?;
    txn.commit().await?;

    info!("Created super admin {}", admin.id);
    Ok(admin)
}

/// Verifies credentials and opens a session. Unknown e-mail, wrong password
/// and suspended account all produce the same `Unauthenticated` error.
#[instrument(skip(db, passwords, sessions, email, password))]
pub async fn login<C: ConnectionTrait>(
    db: &C,
    passwords: &PasswordPolicy,
    sessions: &SessionStore,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<(user::Model, session::Model)> {
    trace!("Entering login");
    let email = normalize_email(email);

    let Some(account) = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
    else {
        passwords.verify_decoy(password)?;
        warn!("Login failed: unknown account");
        return Err(EngineError::Unauthenticated);
    };

    if !passwords.verify(password, &account.credential)? {
        warn!("Login failed for user {}: bad password", account.id);
        return Err(EngineError::Unauthenticated);
    }
    if account.is_suspended {
        warn!("Login refused for suspended user {}", account.id);
        return Err(EngineError::Unauthenticated);
    }

    let session = sessions.create(db, account.id, now).await?;
    info!("User {} logged in", account.id);
    Ok((account, session))
}

/// Creates an enterprise and its administrator. The administrator takes the
/// first seat.
#[instrument(skip(db, ctx, input), fields(enterprise = %input.name))]
pub async fn provision_enterprise(
    db: &DatabaseConnection,
    ctx: AccountContext<'_>,
    input: EnterpriseInput,
) -> Result<(enterprise::Model, user::Model, card::Model)> {
    trace!("Entering provision_enterprise");
    if input.name.trim().is_empty() {
        return Err(EngineError::Validation(
            "enterprise name must not be empty".to_string(),
        ));
    }
    if input.license_count < 1 || input.sub_license_count < 0 {
        return Err(EngineError::Validation(
            "an enterprise needs at least one license and a non-negative sub-license count"
                .to_string(),
        ));
    }

    let txn = db.begin().await?;
    let ent = enterprise::ActiveModel {
        name: Set(input.name.trim().to_string()),
        license_count: Set(input.license_count),
        sub_license_count: Set(input.sub_license_count),
        licenses_used: Set(0),
        sub_licenses_used: Set(0),
        logo: Set(input.logo),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    quota::reserve_enterprise_seat(&txn, ent.id).await?;
    let (admin, card) = create_user_with_card(
        &txn,
        ctx,
        input.admin,
        NewUser {
            role: UserRole::EnterpriseAdmin,
            enterprise_id: Some(ent.id),
            assigned_admin_id: None,
        },
    )
    .await?;

    let ent = enterprise::Entity::find_by_id(ent.id)
        .one(&txn)
        .await?
        .ok_or(EngineError::not_found("Enterprise"))?;
    txn.commit().await?;

    info!("Provisioned enterprise {} with admin {}", ent.id, admin.id);
    Ok((ent, admin, card))
}

/// An enterprise administrator adds a member, consuming one seat.
#[instrument(skip(db, ctx, admin, input), fields(admin_id = admin.id))]
pub async fn add_enterprise_member(
    db: &DatabaseConnection,
    ctx: AccountContext<'_>,
    admin: &user::Model,
    enterprise_id: i32,
    input: RegisterInput,
) -> Result<(user::Model, card::Model)> {
    let txn = db.begin().await?;
    quota::reserve_enterprise_seat(&txn, enterprise_id).await?;
    let created = create_user_with_card(
        &txn,
        ctx,
        input,
        NewUser {
            role: UserRole::Staff,
            enterprise_id: Some(enterprise_id),
            assigned_admin_id: Some(admin.id),
        },
    )
    .await?;
    txn.commit().await?;

    info!(
        "User {} joined enterprise {} (added by {})",
        created.0.id, enterprise_id, admin.id
    );
    Ok(created)
}

/// Brings a user without an enterprise under the admin's enterprise and
/// delegation, consuming one seat. Only staff accounts can be claimed, and
/// only while the authorization engine allows unassigned takeover.
#[instrument(skip(db, authz, admin), fields(admin_id = admin.id))]
pub async fn claim_user(
    db: &DatabaseConnection,
    authz: &AuthorizationEngine,
    admin: &user::Model,
    enterprise_id: i32,
    user_id: i32,
) -> Result<user::Model> {
    if !authz.allows_unassigned_takeover() {
        warn!("Claim of user {} refused: unassigned takeover disabled", user_id);
        return Err(EngineError::Forbidden);
    }

    let txn = db.begin().await?;

    let claimed = user::Entity::update_many()
        .col_expr(user::Column::EnterpriseId, Expr::value(enterprise_id))
        .col_expr(user::Column::AssignedAdminId, Expr::value(admin.id))
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::EnterpriseId.is_null())
        .filter(user::Column::Role.eq(UserRole::Staff))
        .exec(&txn)
        .await?;

    if claimed.rows_affected != 1 {
        let target = user::Entity::find_by_id(user_id).one(&txn).await?;
        return Err(match target {
            None => EngineError::not_found("User"),
            Some(target) if target.role != UserRole::Staff => {
                warn!(
                    "Claim of user {} refused: role {:?} cannot be claimed",
                    user_id, target.role
                );
                EngineError::Forbidden
            }
            Some(_) => {
                warn!("User {} already belongs to an enterprise", user_id);
                EngineError::InvalidOperation(format!(
                    "user {user_id} already belongs to an enterprise"
                ))
            }
        });
    }

    quota::reserve_enterprise_seat(&txn, enterprise_id).await?;
    let member = find_user(&txn, user_id).await?;
    txn.commit().await?;

    info!("User {} claimed into enterprise {}", user_id, enterprise_id);
    Ok(member)
}

#[instrument(skip(db))]
pub async fn set_user_suspended<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    suspended: bool,
) -> Result<user::Model> {
    let mut active = find_user(db, user_id).await?.into_active_model();
    active.is_suspended = Set(suspended);
    let updated = active.update(db).await?;
    info!("User {} suspended = {}", user_id, suspended);
    Ok(updated)
}

/// Sets or clears the delegated administrator of a user.
#[instrument(skip(db))]
pub async fn assign_admin<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    admin_id: Option<i32>,
) -> Result<user::Model> {
    let target = find_user(db, user_id).await?;

    if let Some(admin_id) = admin_id {
        if admin_id == user_id {
            return Err(EngineError::Validation(
                "a user cannot be their own assigned admin".to_string(),
            ));
        }
        let admin = find_user(db, admin_id).await?;
        if !admin.role.is_administrative() {
            return Err(EngineError::Validation(format!(
                "user {admin_id} does not hold an administrative role"
            )));
        }
    }

    let mut active = target.into_active_model();
    active.assigned_admin_id = Set(admin_id);
    let updated = active.update(db).await?;
    info!("User {} assigned admin = {:?}", user_id, admin_id);
    Ok(updated)
}

/// Deletes a user; cards and sessions go with it. An enterprise member's
/// seat is released.
#[instrument(skip(db))]
pub async fn delete_user(db: &DatabaseConnection, user_id: i32) -> Result<()> {
    let txn = db.begin().await?;
    let target = find_user(&txn, user_id).await?;

    user::Entity::delete_by_id(user_id).exec(&txn).await?;
    if let Some(enterprise_id) = target.enterprise_id {
        quota::release_enterprise_seat(&txn, enterprise_id).await?;
    }
    txn.commit().await?;

    info!("User {} deleted", user_id);
    Ok(())
}

pub async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(EngineError::not_found("User"))
}

async fn create_user_with_card<C: ConnectionTrait>(
    db: &C,
    ctx: AccountContext<'_>,
    input: RegisterInput,
    new_user: NewUser,
) -> Result<(user::Model, card::Model)> {
    let name = input.name.trim().to_string();
    let email = normalize_email(&input.email);
    if name.is_empty() {
        return Err(EngineError::Validation("name must not be empty".to_string()));
    }
    if !is_plausible_email(&email) {
        return Err(EngineError::Validation(format!(
            "'{email}' is not a valid e-mail address"
        )));
    }
    ctx.passwords.check_strength(&input.password)?;

    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .count(db)
        .await?
        > 0;
    if taken {
        warn!("E-mail already registered");
        return Err(EngineError::Conflict("e-mail is already registered".to_string()));
    }

    let credential = ctx.passwords.hash(&input.password)?;
    debug!("Password hashed");

    let account = user::ActiveModel {
        email: Set(email),
        credential: Set(credential),
        name: Set(name.clone()),
        role: Set(new_user.role),
        plan: Set("free".to_string()),
        enterprise_id: Set(new_user.enterprise_id),
        sub_license_count: Set(0),
        card_count: Set(1),
        is_suspended: Set(false),
        assigned_admin_id: Set(new_user.assigned_admin_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| EngineError::from_write(e, "e-mail is already registered"))?;

    let primary = cards::insert_primary_card(
        db,
        ctx.slugs,
        account.id,
        CardDraft {
            name,
            template_id: input.template_id,
            email: Some(account.email.clone()),
            ..Default::default()
        },
    )
    .await?;

    Ok((account, primary))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
