use axum::{extract::State, http::StatusCode, response::Json, Extension};
use axum_valid::Valid;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use model::entities::user::{self, Role, RoleStatus};

use crate::auth::middleware::AuthUser;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::phone::normalize_phone;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for registering a new account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Phone number, accepted in local or `+91` form
    #[validate(length(min = 10, max = 16))]
    pub phone: String,
    /// Optional contact email
    #[validate(email)]
    pub email: Option<String>,
    /// Password (minimum 8 characters)
    #[validate(length(min = 8))]
    pub password: String,
    /// Either "student" or "owner"; admins are provisioned out of band
    pub role: String,
    /// Company name, required when registering as an owner
    pub company_name: Option<String>,
    /// Business registration identifier, required when registering as an owner
    pub business_registration: Option<String>,
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for a self-service password change
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    /// New password (minimum 8 characters)
    #[validate(length(min = 8))]
    pub new_password: String,
}

/// User profile response model
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub phone: String,
    pub email: Option<String>,
    pub role: String,
    pub company_name: Option<String>,
    pub business_registration: Option<String>,
    pub is_approved: bool,
    pub phone_verified: bool,
    pub email_verified: bool,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            phone: model.phone,
            email: model.email,
            role: model.role.to_string(),
            company_name: model.company_name,
            business_registration: model.business_registration,
            is_approved: model.is_approved,
            phone_verified: model.phone_verified,
            email_verified: model.email_verified,
        }
    }
}

/// Login response: the signed token plus the profile it was issued for
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Register a new student or owner account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Phone or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    trace!("Entering register function");

    let role: Role = request.role.parse().map_err(ApiError::Validation)?;
    if role == Role::Admin {
        return Err(ApiError::Validation(
            "admin accounts cannot be self-registered".to_string(),
        ));
    }

    if role == Role::Owner {
        let has_company = request
            .company_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        let has_registration = request
            .business_registration
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if !has_company || !has_registration {
            return Err(ApiError::Validation(
                "owners must provide company_name and business_registration".to_string(),
            ));
        }
    }

    let phone = normalize_phone(&request.phone).map_err(ApiError::Validation)?;
    debug!("Registering {} account for {}", role, phone);

    let phone_taken = user::Entity::find()
        .filter(user::Column::Phone.eq(phone.clone()))
        .one(&state.db)
        .await?
        .is_some();
    if phone_taken {
        return Err(ApiError::Conflict(
            "an account with this phone number already exists".to_string(),
        ));
    }

    if let Some(email) = request.email.as_deref() {
        let email_taken = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&state.db)
            .await?
            .is_some();
        if email_taken {
            return Err(ApiError::Conflict(
                "an account with this email already exists".to_string(),
            ));
        }
    }

    let password_hash = hash_password(&request.password)?;

    // Owner-only fields are dropped for students so a later role change
    // cannot resurrect stale business data.
    let (company_name, business_registration) = match role {
        Role::Owner => (
            request.company_name.clone(),
            request.business_registration.clone(),
        ),
        _ => (None, None),
    };

    let new_user = user::ActiveModel {
        phone: Set(phone),
        email: Set(request.email.clone()),
        password_hash: Set(password_hash),
        role: Set(role),
        company_name: Set(company_name),
        business_registration: Set(business_registration),
        is_approved: Set(RoleStatus::default_approval(role)),
        phone_verified: Set(false),
        email_verified: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let user_model = new_user.insert(&state.db).await?;
    info!(
        "User registered with ID: {}, role: {}",
        user_model.id, user_model.role
    );

    let response = ApiResponse {
        data: UserResponse::from(user_model),
        message: "Account created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with phone number and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<LoginRequest>>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    trace!("Entering login function");

    let phone = normalize_phone(&request.phone).map_err(|_| ApiError::InvalidCredentials)?;

    let user_model = user::Entity::find()
        .filter(user::Column::Phone.eq(phone))
        .one(&state.db)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&request.password, &user_model.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    // The token caches the role as it stands right now; the auth
    // middleware re-checks it against the store on every request.
    let token = state.tokens.issue(user_model.id, user_model.role)?;
    info!("User {} logged in as {}", user_model.id, user_model.role);

    let response = ApiResponse {
        data: LoginResponse {
            token,
            user: UserResponse::from(user_model),
        },
        message: "Login successful".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn me(Extension(auth): Extension<AuthUser>) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse {
        data: UserResponse::from(auth.user),
        message: "Profile retrieved successfully".to_string(),
        success: true,
    })
}

/// Change the authenticated user's password
#[utoipa::path(
    put,
    path = "/api/v1/auth/password",
    tag = "auth",
    security(("bearer_token" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated or wrong current password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(Json(request)): Valid<Json<ChangePasswordRequest>>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering change_password function");

    if !verify_password(&request.current_password, &auth.user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let mut active: user::ActiveModel = auth.user.into();
    active.password_hash = Set(hash_password(&request.new_password)?);
    let updated = active.update(&state.db).await?;
    info!("User {} changed their password", updated.id);

    Ok(Json(ApiResponse {
        data: UserResponse::from(updated),
        message: "Password updated successfully".to_string(),
        success: true,
    }))
}
