use chrono::{DateTime, Utc};
use common::RenderVariant;
use engine::{AuthorizationEngine, IdentityResolver, PasswordPolicy, SlugResolver};
use engine::accounts::AccountContext;
use model::entities::{card, enterprise, license_request, user};
use model::entities::license_request::{LicenseRequestStatus, LicenseRequestType};
use model::entities::user::UserRole;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Session token to principal resolution
    pub identity: IdentityResolver,
    /// Public slug to card resolution
    pub slugs: SlugResolver,
    /// Write/read decisions on cards
    pub authz: AuthorizationEngine,
    pub passwords: PasswordPolicy,
    pub settings: Arc<AppConfig>,
}

impl AppState {
    pub fn accounts(&self) -> AccountContext<'_> {
        AccountContext {
            passwords: &self.passwords,
            slugs: &self.slugs,
        }
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// User as seen by the API. The credential is never exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub plan: String,
    pub enterprise_id: Option<i32>,
    pub sub_license_count: i32,
    pub card_count: i32,
    pub is_suspended: bool,
    pub assigned_admin_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            role: model.role,
            plan: model.plan,
            enterprise_id: model.enterprise_id,
            sub_license_count: model.sub_license_count,
            card_count: model.card_count,
            is_suspended: model.is_suspended,
            assigned_admin_id: model.assigned_admin_id,
            created_at: model.created_at,
        }
    }
}

/// Card as seen by its managers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CardResponse {
    pub id: i32,
    pub user_id: i32,
    pub slug: String,
    pub template_id: Option<String>,
    /// Variant the public page is rendered with
    pub variant: RenderVariant,
    pub parent_id: Option<i32>,
    pub is_primary: bool,
    pub is_suspended: bool,
    #[serde(flatten)]
    pub profile: CardProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<card::Model> for CardResponse {
    fn from(model: card::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            variant: RenderVariant::from_template_id(model.template_id.as_deref()),
            is_primary: model.is_primary(),
            slug: model.slug.clone(),
            template_id: model.template_id.clone(),
            parent_id: model.parent_id,
            is_suspended: model.is_suspended,
            created_at: model.created_at,
            updated_at: model.updated_at,
            profile: CardProfile::from(model),
        }
    }
}

/// Card as served to anonymous visitors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicCardResponse {
    pub slug: String,
    pub variant: RenderVariant,
    #[serde(flatten)]
    pub profile: CardProfile,
}

impl From<card::Model> for PublicCardResponse {
    fn from(model: card::Model) -> Self {
        Self {
            slug: model.slug.clone(),
            variant: RenderVariant::from_template_id(model.template_id.as_deref()),
            profile: CardProfile::from(model),
        }
    }
}

/// Profile content shared by the card views
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CardProfile {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub socials: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub phones: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub emails: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub gallery: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub design: Option<JsonValue>,
}

impl From<card::Model> for CardProfile {
    fn from(model: card::Model) -> Self {
        Self {
            name: model.name,
            title: model.title,
            company: model.company,
            bio: model.bio,
            phone: model.phone,
            email: model.email,
            website: model.website,
            address: model.address,
            socials: model.socials,
            phones: model.phones,
            emails: model.emails,
            gallery: model.gallery,
            design: model.design,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnterpriseResponse {
    pub id: i32,
    pub name: String,
    pub license_count: i32,
    pub sub_license_count: i32,
    pub licenses_used: i32,
    pub sub_licenses_used: i32,
    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<enterprise::Model> for EnterpriseResponse {
    fn from(model: enterprise::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            license_count: model.license_count,
            sub_license_count: model.sub_license_count,
            licenses_used: model.licenses_used,
            sub_licenses_used: model.sub_licenses_used,
            logo: model.logo,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LicenseRequestResponse {
    pub id: i32,
    pub enterprise_id: i32,
    pub user_id: i32,
    pub request_type: LicenseRequestType,
    pub amount: i32,
    pub status: LicenseRequestStatus,
    pub created_at: DateTime<Utc>,
}

impl From<license_request::Model> for LicenseRequestResponse {
    fn from(model: license_request::Model) -> Self {
        Self {
            id: model.id,
            enterprise_id: model.enterprise_id,
            user_id: model.user_id,
            request_type: model.request_type,
            amount: model.amount,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

/// A user together with their primary card
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub user: UserResponse,
    pub card: CardResponse,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::cards::list_cards,
        crate::handlers::cards::create_card,
        crate::handlers::cards::card_quota,
        crate::handlers::cards::get_card,
        crate::handlers::cards::update_card,
        crate::handlers::public::get_public_card,
        crate::handlers::enterprise::submit_license_request,
        crate::handlers::enterprise::list_license_requests,
        crate::handlers::enterprise::add_member,
        crate::handlers::enterprise::grant_sub_licenses,
        crate::handlers::enterprise::claim_member,
        crate::handlers::admin::provision_enterprise,
        crate::handlers::admin::handle_license_request,
        crate::handlers::admin::set_user_suspension,
        crate::handlers::admin::set_card_suspension,
        crate::handlers::admin::set_assigned_admin,
        crate::handlers::admin::delete_user,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            UserResponse,
            CardResponse,
            CardProfile,
            PublicCardResponse,
            EnterpriseResponse,
            LicenseRequestResponse,
            AccountResponse,
            UserRole,
            LicenseRequestType,
            LicenseRequestStatus,
            RenderVariant,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::SessionResponse,
            crate::handlers::cards::CreateCardRequest,
            crate::handlers::cards::UpdateCardRequest,
            crate::handlers::cards::QuotaResponse,
            crate::handlers::enterprise::LicenseRequestBody,
            crate::handlers::enterprise::GrantSubLicensesRequest,
            crate::handlers::admin::ProvisionEnterpriseRequest,
            crate::handlers::admin::ProvisionedEnterprise,
            crate::handlers::admin::SuspensionRequest,
            crate::handlers::admin::AssignAdminRequest,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and the current user"),
        (name = "cards", description = "Card management"),
        (name = "public", description = "Anonymous card reads"),
        (name = "enterprise", description = "Enterprise administration"),
        (name = "admin", description = "Platform administration"),
    ),
    info(
        title = "CardHub API",
        description = "Digital business card platform - public card pages, card management and enterprise licensing",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
