use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use model::entities::user::Role;
use model::entities::{accommodation, accommodation_image, booking, user};

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};

const LISTINGS_CACHE_KEY: &str = "public_listings";

/// Request body for creating a new accommodation
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateAccommodationRequest {
    /// Listing name
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Free-form description
    #[validate(length(min = 1))]
    pub description: String,
    /// Street address
    #[validate(length(min = 1))]
    pub address: String,
    /// Monthly price, as a decimal string
    pub price: Decimal,
    /// Amenity labels, e.g. "wifi", "laundry"
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Owner to list on behalf of; admins only
    pub owner_id: Option<i32>,
}

/// Request body for updating an accommodation
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateAccommodationRequest {
    /// Listing name
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    /// Free-form description
    #[validate(length(min = 1))]
    pub description: Option<String>,
    /// Street address
    #[validate(length(min = 1))]
    pub address: Option<String>,
    /// Monthly price, as a decimal string
    pub price: Option<Decimal>,
    /// Amenity labels; replaces the stored set
    pub amenities: Option<Vec<String>>,
}

/// A hosted listing image
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub url: String,
    pub public_id: String,
}

impl From<accommodation_image::Model> for ImageResponse {
    fn from(model: accommodation_image::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            public_id: model.public_id,
        }
    }
}

/// Accommodation response model
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccommodationResponse {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub description: String,
    pub address: String,
    pub price: Decimal,
    pub amenities: Vec<String>,
    pub images: Vec<ImageResponse>,
    pub created_at: NaiveDateTime,
}

fn to_response(
    model: accommodation::Model,
    images: Vec<accommodation_image::Model>,
) -> AccommodationResponse {
    let amenities = model.amenity_list();
    AccommodationResponse {
        id: model.id,
        owner_id: model.owner_id,
        name: model.name,
        description: model.description,
        address: model.address,
        price: model.price,
        amenities,
        images: images.into_iter().map(ImageResponse::from).collect(),
        created_at: model.created_at,
    }
}

/// Loads images for a batch of accommodations and pairs them up.
async fn attach_images(
    db: &DatabaseConnection,
    accommodations: Vec<accommodation::Model>,
) -> Result<Vec<AccommodationResponse>, ApiError> {
    if accommodations.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<i32> = accommodations.iter().map(|a| a.id).collect();
    let mut by_accommodation: HashMap<i32, Vec<accommodation_image::Model>> = HashMap::new();
    let images = accommodation_image::Entity::find()
        .filter(accommodation_image::Column::AccommodationId.is_in(ids))
        .all(db)
        .await?;
    for image in images {
        by_accommodation
            .entry(image.accommodation_id)
            .or_default()
            .push(image);
    }

    Ok(accommodations
        .into_iter()
        .map(|model| {
            let images = by_accommodation.remove(&model.id).unwrap_or_default();
            to_response(model, images)
        })
        .collect())
}

/// Ownership check shared by the mutating endpoints. Admins pass; an
/// owner touching someone else's listing gets the same answer as a
/// missing listing.
fn authorize_listing(auth: &AuthUser, model: &accommodation::Model) -> Result<(), ApiError> {
    if auth.role == Role::Admin || model.owner_id == auth.id {
        Ok(())
    } else {
        Err(ApiError::NotFound("Accommodation not found".to_string()))
    }
}

/// List publicly visible accommodations
#[utoipa::path(
    get,
    path = "/api/v1/accommodations",
    tag = "accommodations",
    responses(
        (status = 200, description = "Accommodations retrieved successfully", body = ApiResponse<Vec<AccommodationResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn list_accommodations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AccommodationResponse>>>, ApiError> {
    trace!("Entering list_accommodations function");

    // Check cache first
    if let Some(CachedData::Listings(listings)) = state.cache.get(LISTINGS_CACHE_KEY).await {
        debug!("Returning {} listings from cache", listings.len());
        return Ok(Json(ApiResponse {
            data: listings,
            message: "Accommodations retrieved from cache".to_string(),
            success: true,
        }));
    }

    // Only listings of approved owners are publicly visible
    let rows = accommodation::Entity::find()
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;
    let visible: Vec<accommodation::Model> = rows
        .into_iter()
        .filter(|(_, owner)| owner.as_ref().is_some_and(user::Model::listings_visible))
        .map(|(model, _)| model)
        .collect();

    let responses = attach_images(&state.db, visible).await?;
    info!("Retrieved {} visible accommodations", responses.len());

    state
        .cache
        .insert(
            LISTINGS_CACHE_KEY.to_string(),
            CachedData::Listings(responses.clone()),
        )
        .await;

    Ok(Json(ApiResponse {
        data: responses,
        message: "Accommodations retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a publicly visible accommodation by ID
#[utoipa::path(
    get,
    path = "/api/v1/accommodations/{accommodation_id}",
    tag = "accommodations",
    params(
        ("accommodation_id" = i32, Path, description = "Accommodation ID"),
    ),
    responses(
        (status = 200, description = "Accommodation retrieved successfully", body = ApiResponse<AccommodationResponse>),
        (status = 404, description = "Accommodation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_accommodation(
    Path(accommodation_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AccommodationResponse>>, ApiError> {
    trace!(
        "Entering get_accommodation function for accommodation_id: {}",
        accommodation_id
    );

    let (model, owner) = accommodation::Entity::find_by_id(accommodation_id)
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Accommodation not found".to_string()))?;

    // An unapproved owner's listing is indistinguishable from a missing one
    if !owner.as_ref().is_some_and(user::Model::listings_visible) {
        return Err(ApiError::NotFound("Accommodation not found".to_string()));
    }

    let images = accommodation_image::Entity::find()
        .filter(accommodation_image::Column::AccommodationId.eq(model.id))
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: to_response(model, images),
        message: "Accommodation retrieved successfully".to_string(),
        success: true,
    }))
}

/// List the authenticated owner's own accommodations
#[utoipa::path(
    get,
    path = "/api/v1/owner/accommodations",
    tag = "accommodations",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Accommodations retrieved successfully", body = ApiResponse<Vec<AccommodationResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Wrong role", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn list_owned_accommodations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<AccommodationResponse>>>, ApiError> {
    trace!("Entering list_owned_accommodations function");

    let owned = accommodation::Entity::find()
        .filter(accommodation::Column::OwnerId.eq(auth.id))
        .all(&state.db)
        .await?;
    let responses = attach_images(&state.db, owned).await?;

    Ok(Json(ApiResponse {
        data: responses,
        message: "Accommodations retrieved successfully".to_string(),
        success: true,
    }))
}

/// Create a new accommodation
#[utoipa::path(
    post,
    path = "/api/v1/owner/accommodations",
    tag = "accommodations",
    security(("bearer_token" = [])),
    request_body = CreateAccommodationRequest,
    responses(
        (status = 201, description = "Accommodation created successfully", body = ApiResponse<AccommodationResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Owner not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn create_accommodation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(Json(request)): Valid<Json<CreateAccommodationRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<AccommodationResponse>>), ApiError> {
    trace!("Entering create_accommodation function");
    if request.price <= Decimal::ZERO {
        return Err(ApiError::Validation("price must be positive".to_string()));
    }

    // Admins list on an owner's behalf; owners always list for themselves
    let owner_id = match auth.role {
        Role::Admin => {
            let owner_id = request.owner_id.ok_or_else(|| {
                ApiError::Validation(
                    "owner_id is required when listing on behalf of an owner".to_string(),
                )
            })?;
            let owner = user::Entity::find_by_id(owner_id)
                .one(&state.db)
                .await?
                .ok_or_else(|| ApiError::NotFound("Owner not found".to_string()))?;
            if owner.role != Role::Owner {
                return Err(ApiError::Validation(
                    "listings can only be attached to owner accounts".to_string(),
                ));
            }
            owner.id
        }
        _ => auth.id,
    };

    let new_accommodation = accommodation::ActiveModel {
        owner_id: Set(owner_id),
        name: Set(request.name.clone()),
        description: Set(request.description.clone()),
        address: Set(request.address.clone()),
        price: Set(request.price),
        amenities: Set(serde_json::Value::from(request.amenities.clone())),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let model = new_accommodation.insert(&state.db).await?;
    info!(
        "Accommodation created with ID: {} for owner {}",
        model.id, model.owner_id
    );
    state.cache.invalidate_all();

    let response = ApiResponse {
        data: to_response(model, vec![]),
        message: "Accommodation created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update an accommodation
#[utoipa::path(
    put,
    path = "/api/v1/owner/accommodations/{accommodation_id}",
    tag = "accommodations",
    security(("bearer_token" = [])),
    params(
        ("accommodation_id" = i32, Path, description = "Accommodation ID"),
    ),
    request_body = UpdateAccommodationRequest,
    responses(
        (status = 200, description = "Accommodation updated successfully", body = ApiResponse<AccommodationResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Accommodation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn update_accommodation(
    Path(accommodation_id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(Json(request)): Valid<Json<UpdateAccommodationRequest>>,
) -> Result<Json<ApiResponse<AccommodationResponse>>, ApiError> {
    trace!(
        "Entering update_accommodation function for accommodation_id: {}",
        accommodation_id
    );

    let model = accommodation::Entity::find_by_id(accommodation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Accommodation not found".to_string()))?;
    authorize_listing(&auth, &model)?;

    if let Some(price) = request.price {
        if price <= Decimal::ZERO {
            return Err(ApiError::Validation("price must be positive".to_string()));
        }
    }

    let mut active: accommodation::ActiveModel = model.into();
    if let Some(name) = request.name.clone() {
        active.name = Set(name);
    }
    if let Some(description) = request.description.clone() {
        active.description = Set(description);
    }
    if let Some(address) = request.address.clone() {
        active.address = Set(address);
    }
    if let Some(price) = request.price {
        active.price = Set(price);
    }
    if let Some(amenities) = request.amenities.clone() {
        active.amenities = Set(serde_json::Value::from(amenities));
    }

    let updated = active.update(&state.db).await?;
    info!("Accommodation {} updated", updated.id);
    state.cache.invalidate_all();

    let images = accommodation_image::Entity::find()
        .filter(accommodation_image::Column::AccommodationId.eq(updated.id))
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: to_response(updated, images),
        message: "Accommodation updated successfully".to_string(),
        success: true,
    }))
}

/// Delete an accommodation and everything hanging off it
#[utoipa::path(
    delete,
    path = "/api/v1/owner/accommodations/{accommodation_id}",
    tag = "accommodations",
    security(("bearer_token" = [])),
    params(
        ("accommodation_id" = i32, Path, description = "Accommodation ID"),
    ),
    responses(
        (status = 200, description = "Accommodation deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Accommodation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn delete_accommodation(
    Path(accommodation_id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!(
        "Entering delete_accommodation function for accommodation_id: {}",
        accommodation_id
    );

    let model = accommodation::Entity::find_by_id(accommodation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Accommodation not found".to_string()))?;
    authorize_listing(&auth, &model)?;

    delete_listing_cascade(&state, &model).await?;
    state.cache.invalidate_all();
    info!("Accommodation {} deleted", accommodation_id);

    Ok(Json(ApiResponse {
        data: format!("Accommodation {} deleted", accommodation_id),
        message: "Accommodation deleted successfully".to_string(),
        success: true,
    }))
}

/// Deletes a listing's dependents, then the listing itself. Hosted
/// images are released best-effort: one failed release must not stop
/// the remaining releases or the database deletions.
pub(crate) async fn delete_listing_cascade(
    state: &AppState,
    model: &accommodation::Model,
) -> Result<(), ApiError> {
    let images = accommodation_image::Entity::find()
        .filter(accommodation_image::Column::AccommodationId.eq(model.id))
        .all(&state.db)
        .await?;

    for image in &images {
        if let Err(err) = state.media.delete(&image.public_id).await {
            warn!(
                "failed to release hosted image {}: {err:#}",
                image.public_id
            );
        }
    }

    accommodation_image::Entity::delete_many()
        .filter(accommodation_image::Column::AccommodationId.eq(model.id))
        .exec(&state.db)
        .await?;
    booking::Entity::delete_many()
        .filter(booking::Column::AccommodationId.eq(model.id))
        .exec(&state.db)
        .await?;
    accommodation::Entity::delete_by_id(model.id)
        .exec(&state.db)
        .await?;

    Ok(())
}

/// Attach an image to an accommodation via the media host
#[utoipa::path(
    post,
    path = "/api/v1/owner/accommodations/{accommodation_id}/images",
    tag = "accommodations",
    security(("bearer_token" = [])),
    params(
        ("accommodation_id" = i32, Path, description = "Accommodation ID"),
    ),
    responses(
        (status = 201, description = "Image uploaded successfully", body = ApiResponse<ImageResponse>),
        (status = 400, description = "Missing or malformed file field", body = ErrorResponse),
        (status = 404, description = "Accommodation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(auth, multipart))]
pub async fn upload_accommodation_image(
    Path(accommodation_id): Path<i32>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ImageResponse>>), ApiError> {
    trace!(
        "Entering upload_accommodation_image function for accommodation_id: {}",
        accommodation_id
    );

    let model = accommodation::Entity::find_by_id(accommodation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Accommodation not found".to_string()))?;
    authorize_listing(&auth, &model)?;

    let mut data: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?;
            data = Some(bytes.to_vec());
            break;
        }
    }
    let data =
        data.ok_or_else(|| ApiError::Validation("missing 'file' form field".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::Validation("uploaded file is empty".to_string()));
    }

    let uploaded = state.media.upload(data, "accommodations").await?;
    debug!("Hosted image at {} ({})", uploaded.url, uploaded.public_id);

    let new_image = accommodation_image::ActiveModel {
        accommodation_id: Set(model.id),
        url: Set(uploaded.url),
        public_id: Set(uploaded.public_id),
        ..Default::default()
    };
    let image = new_image.insert(&state.db).await?;
    state.cache.invalidate_all();

    let response = ApiResponse {
        data: ImageResponse::from(image),
        message: "Image uploaded successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}
