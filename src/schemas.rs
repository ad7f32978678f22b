use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::auth::token::TokenService;
use crate::handlers::accommodations::AccommodationResponse;
use crate::services::mail::MailClient;
use crate::services::media::MediaClient;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for the public listings read path
    pub cache: Cache<String, CachedData>,
    /// Signed-token issuer/verifier
    pub tokens: TokenService,
    /// Media host client (hosted listing images)
    pub media: MediaClient,
    /// Transactional mail client
    pub mailer: MailClient,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Listings(Vec<AccommodationResponse>),
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Registers the bearer-token security scheme referenced by protected
/// paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,
        crate::handlers::accommodations::list_accommodations,
        crate::handlers::accommodations::get_accommodation,
        crate::handlers::accommodations::list_owned_accommodations,
        crate::handlers::accommodations::create_accommodation,
        crate::handlers::accommodations::update_accommodation,
        crate::handlers::accommodations::delete_accommodation,
        crate::handlers::accommodations::upload_accommodation_image,
        crate::handlers::bookings::create_booking,
        crate::handlers::bookings::list_bookings,
        crate::handlers::bookings::cancel_booking,
        crate::handlers::admin::list_owners,
        crate::handlers::admin::approve_owner,
        crate::handlers::admin::delete_user,
    ),
    components(
        schemas(
            ApiResponse<crate::handlers::auth::UserResponse>,
            ApiResponse<Vec<crate::handlers::auth::UserResponse>>,
            ApiResponse<crate::handlers::auth::LoginResponse>,
            ApiResponse<crate::handlers::accommodations::AccommodationResponse>,
            ApiResponse<Vec<crate::handlers::accommodations::AccommodationResponse>>,
            ApiResponse<crate::handlers::accommodations::ImageResponse>,
            ApiResponse<crate::handlers::bookings::BookingResponse>,
            ApiResponse<Vec<crate::handlers::bookings::BookingResponse>>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::ChangePasswordRequest,
            crate::handlers::auth::UserResponse,
            crate::handlers::accommodations::CreateAccommodationRequest,
            crate::handlers::accommodations::UpdateAccommodationRequest,
            crate::handlers::accommodations::AccommodationResponse,
            crate::handlers::accommodations::ImageResponse,
            crate::handlers::bookings::CreateBookingRequest,
            crate::handlers::bookings::BookingResponse,
            crate::handlers::bookings::AccommodationSnapshot,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and profile endpoints"),
        (name = "accommodations", description = "Listing browse and management endpoints"),
        (name = "bookings", description = "Student booking request endpoints"),
        (name = "admin", description = "Owner moderation endpoints"),
    ),
    info(
        title = "Way2PG API",
        description = "Student accommodation marketplace - owners list PG/hostel rooms, students request details, an admin moderates owners",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;
