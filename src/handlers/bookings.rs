use std::collections::HashMap;

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use model::entities::booking::{self, BookingStatus};
use model::entities::{accommodation, accommodation_image, user};

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::handlers::accommodations::ImageResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Message stored when the student does not write one.
const DEFAULT_MESSAGE: &str =
    "Hi, I am interested in this accommodation. Please share more details.";

/// Request body for creating a booking request
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBookingRequest {
    /// Accommodation to request details for
    pub accommodation_id: i32,
    /// Optional note to the owner; a default is used when absent
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

/// Accommodation details embedded in a booking response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccommodationSnapshot {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub images: Vec<ImageResponse>,
}

/// Booking response model
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    pub id: i32,
    pub status: String,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub accommodation: AccommodationSnapshot,
}

fn to_response(model: booking::Model, snapshot: AccommodationSnapshot) -> BookingResponse {
    BookingResponse {
        id: model.id,
        status: model.status.to_string(),
        message: model.message,
        created_at: model.created_at,
        accommodation: snapshot,
    }
}

async fn snapshot_of(
    state: &AppState,
    model: accommodation::Model,
) -> Result<AccommodationSnapshot, ApiError> {
    let images = accommodation_image::Entity::find()
        .filter(accommodation_image::Column::AccommodationId.eq(model.id))
        .all(&state.db)
        .await?;

    Ok(AccommodationSnapshot {
        id: model.id,
        name: model.name,
        address: model.address,
        images: images.into_iter().map(ImageResponse::from).collect(),
    })
}

/// Create a booking request against an accommodation
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "bookings",
    security(("bearer_token" = [])),
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking request created", body = ApiResponse<BookingResponse>),
        (status = 400, description = "Duplicate pending request", body = ErrorResponse),
        (status = 404, description = "Accommodation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(Json(request)): Valid<Json<CreateBookingRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<BookingResponse>>), ApiError> {
    trace!("Entering create_booking function");

    let target = accommodation::Entity::find_by_id(request.accommodation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Accommodation not found".to_string()))?;

    // At most one pending request per (student, accommodation). This is
    // a read-then-write check: two concurrent submissions can both pass
    // it. Accepted, not transactionally enforced.
    let existing = booking::Entity::find()
        .filter(booking::Column::StudentId.eq(auth.id))
        .filter(booking::Column::AccommodationId.eq(target.id))
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::DuplicateRequest(
            "You already have a pending request for this accommodation".to_string(),
        ));
    }

    let message = request
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

    let new_booking = booking::ActiveModel {
        student_id: Set(auth.id),
        accommodation_id: Set(target.id),
        status: Set(BookingStatus::Pending),
        message: Set(message),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let model = new_booking.insert(&state.db).await?;
    info!(
        "Booking {} created by student {} for accommodation {}",
        model.id, model.student_id, model.accommodation_id
    );

    // Owner notification is best-effort and never rolls the booking back
    let owner = user::Entity::find_by_id(target.owner_id)
        .one(&state.db)
        .await?;
    if let Some(email) = owner.as_ref().and_then(|o| o.email.as_deref()) {
        if let Err(err) = state
            .mailer
            .booking_request(email, &target.name, &auth.user.phone, &model.message)
            .await
        {
            warn!("failed to notify owner about booking {}: {err:#}", model.id);
        }
    } else {
        debug!("owner {} has no email, skipping notification", target.owner_id);
    }

    let snapshot = snapshot_of(&state, target).await?;
    let response = ApiResponse {
        data: to_response(model, snapshot),
        message: "Booking request created".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the authenticated student's booking requests, newest first
#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "bookings",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Bookings retrieved successfully", body = ApiResponse<Vec<BookingResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<BookingResponse>>>, ApiError> {
    trace!("Entering list_bookings function");

    let bookings = booking::Entity::find()
        .filter(booking::Column::StudentId.eq(auth.id))
        .order_by_desc(booking::Column::CreatedAt)
        .order_by_desc(booking::Column::Id)
        .all(&state.db)
        .await?;

    if bookings.is_empty() {
        return Ok(Json(ApiResponse {
            data: vec![],
            message: "Bookings retrieved successfully".to_string(),
            success: true,
        }));
    }

    let accommodation_ids: Vec<i32> = bookings.iter().map(|b| b.accommodation_id).collect();
    let accommodations: HashMap<i32, accommodation::Model> = accommodation::Entity::find()
        .filter(accommodation::Column::Id.is_in(accommodation_ids.clone()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let mut images_by_accommodation: HashMap<i32, Vec<ImageResponse>> = HashMap::new();
    let images = accommodation_image::Entity::find()
        .filter(accommodation_image::Column::AccommodationId.is_in(accommodation_ids))
        .all(&state.db)
        .await?;
    for image in images {
        images_by_accommodation
            .entry(image.accommodation_id)
            .or_default()
            .push(ImageResponse::from(image));
    }

    let mut responses = Vec::with_capacity(bookings.len());
    for model in bookings {
        let Some(target) = accommodations.get(&model.accommodation_id) else {
            // Cascade deletion removes bookings with their accommodation,
            // so this indicates a dangling reference; skip it.
            warn!(
                "booking {} references missing accommodation {}",
                model.id, model.accommodation_id
            );
            continue;
        };
        let snapshot = AccommodationSnapshot {
            id: target.id,
            name: target.name.clone(),
            address: target.address.clone(),
            images: images_by_accommodation
                .get(&target.id)
                .cloned()
                .unwrap_or_default(),
        };
        responses.push(to_response(model, snapshot));
    }

    debug!("Retrieved {} bookings for student {}", responses.len(), auth.id);
    Ok(Json(ApiResponse {
        data: responses,
        message: "Bookings retrieved successfully".to_string(),
        success: true,
    }))
}

/// Cancel a booking request
#[utoipa::path(
    put,
    path = "/api/v1/bookings/{booking_id}/cancel",
    tag = "bookings",
    security(("bearer_token" = [])),
    params(
        ("booking_id" = i32, Path, description = "Booking ID"),
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<BookingResponse>),
        (status = 400, description = "Already cancelled", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn cancel_booking(
    Path(booking_id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<BookingResponse>>, ApiError> {
    trace!("Entering cancel_booking function for booking_id: {}", booking_id);

    let model = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    // Someone else's booking reads the same as a missing one
    if model.student_id != auth.id {
        return Err(ApiError::NotFound("Booking not found".to_string()));
    }

    // A second cancel is surfaced, not silently accepted
    if model.status == BookingStatus::Cancelled {
        return Err(ApiError::AlreadyCancelled(
            "This request has already been cancelled".to_string(),
        ));
    }

    let accommodation_id = model.accommodation_id;
    let mut active: booking::ActiveModel = model.into();
    active.status = Set(BookingStatus::Cancelled);
    let updated = active.update(&state.db).await?;
    info!("Booking {} cancelled by student {}", updated.id, auth.id);

    let target = accommodation::Entity::find_by_id(accommodation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ApiError::Internal(anyhow!(
                "booking {} references missing accommodation {}",
                updated.id,
                accommodation_id
            ))
        })?;
    let snapshot = snapshot_of(&state, target).await?;

    Ok(Json(ApiResponse {
        data: to_response(updated, snapshot),
        message: "Booking cancelled".to_string(),
        success: true,
    }))
}
