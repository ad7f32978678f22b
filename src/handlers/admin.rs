use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::IntoParams;

use model::entities::user::{self, Role};
use model::entities::{accommodation, booking};

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::handlers::accommodations::delete_listing_cascade;
use crate::handlers::auth::UserResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Query parameters for the owner moderation list
#[derive(Debug, Deserialize, Serialize, IntoParams)]
pub struct OwnerListQuery {
    /// When true, only owners still awaiting approval
    pub pending: Option<bool>,
}

/// List owner accounts for moderation
#[utoipa::path(
    get,
    path = "/api/v1/admin/owners",
    tag = "admin",
    security(("bearer_token" = [])),
    params(OwnerListQuery),
    responses(
        (status = 200, description = "Owners retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Wrong role", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn list_owners(
    Query(query): Query<OwnerListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    trace!("Entering list_owners function");

    let mut select = user::Entity::find().filter(user::Column::Role.eq(Role::Owner));
    if query.pending.unwrap_or(false) {
        select = select.filter(user::Column::IsApproved.eq(false));
    }
    let owners = select
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    debug!("Retrieved {} owners", owners.len());
    Ok(Json(ApiResponse {
        data: owners.into_iter().map(UserResponse::from).collect(),
        message: "Owners retrieved successfully".to_string(),
        success: true,
    }))
}

/// Approve an owner account
#[utoipa::path(
    put,
    path = "/api/v1/admin/owners/{user_id}/approve",
    tag = "admin",
    security(("bearer_token" = [])),
    params(
        ("user_id" = i32, Path, description = "Owner user ID"),
    ),
    responses(
        (status = 200, description = "Owner approved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "Owner not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn approve_owner(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering approve_owner function for user_id: {}", user_id);

    let owner = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .filter(|u| u.role == Role::Owner)
        .ok_or_else(|| ApiError::NotFound("Owner not found".to_string()))?;

    if owner.is_approved {
        debug!("Owner {} is already approved", owner.id);
        return Ok(Json(ApiResponse {
            data: UserResponse::from(owner),
            message: "Owner approved successfully".to_string(),
            success: true,
        }));
    }

    let email = owner.email.clone();
    let company = owner.company_name.clone();
    let mut active: user::ActiveModel = owner.into();
    active.is_approved = Set(true);
    let updated = active.update(&state.db).await?;
    info!("Owner {} approved", updated.id);

    // Approval makes the owner's listings publicly visible
    state.cache.invalidate_all();

    if let Some(email) = email.as_deref() {
        if let Err(err) = state.mailer.owner_approved(email, company.as_deref()).await {
            warn!("failed to notify owner {} of approval: {err:#}", updated.id);
        }
    }

    Ok(Json(ApiResponse {
        data: UserResponse::from(updated),
        message: "Owner approved successfully".to_string(),
        success: true,
    }))
}

/// Delete a user account with full cascade
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{user_id}",
    tag = "admin",
    security(("bearer_token" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn delete_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_user function for user_id: {}", user_id);

    if user_id == auth.id {
        return Err(ApiError::Validation(
            "admins cannot delete their own account".to_string(),
        ));
    }

    let target = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    // Dependents first, parent last. For owners that means every
    // listing with its hosted images and bookings; for students their
    // own booking requests.
    if target.role == Role::Owner {
        let listings = accommodation::Entity::find()
            .filter(accommodation::Column::OwnerId.eq(target.id))
            .all(&state.db)
            .await?;
        debug!(
            "Cascading deletion of {} listings owned by user {}",
            listings.len(),
            target.id
        );
        for listing in &listings {
            delete_listing_cascade(&state, listing).await?;
        }
    }

    booking::Entity::delete_many()
        .filter(booking::Column::StudentId.eq(target.id))
        .exec(&state.db)
        .await?;
    user::Entity::delete_by_id(target.id).exec(&state.db).await?;
    state.cache.invalidate_all();
    info!("User {} deleted", user_id);

    Ok(Json(ApiResponse {
        data: format!("User {} deleted", user_id),
        message: "User deleted successfully".to_string(),
        success: true,
    }))
}
