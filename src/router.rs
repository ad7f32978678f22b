use crate::auth::middleware::{authenticate, require_role};
use crate::handlers::{
    accommodations::{
        create_accommodation, delete_accommodation, get_accommodation, list_accommodations,
        list_owned_accommodations, update_accommodation, upload_accommodation_image,
    },
    admin::{approve_owner, delete_user, list_owners},
    auth::{change_password, login, me, register},
    bookings::{cancel_booking, create_booking, list_bookings},
    health::health_check,
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{delete, get, post, put},
    Router,
};
use model::entities::user::Role;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Allow-lists handed to the role gate at registration time.
const STUDENTS: &[Role] = &[Role::Student];
const OWNERS_AND_ADMINS: &[Role] = &[Role::Owner, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public surface: browsing and account creation need no token
    let public = Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/accommodations", get(list_accommodations))
        .route(
            "/api/v1/accommodations/:accommodation_id",
            get(get_accommodation),
        );

    // Any authenticated role
    let account = Router::new()
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/password", put(change_password))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    // Booking lifecycle, students only
    let student = Router::new()
        .route("/api/v1/bookings", post(create_booking).get(list_bookings))
        .route("/api/v1/bookings/:booking_id/cancel", put(cancel_booking))
        .layer(middleware::from_fn(|req: Request, next: Next| {
            require_role(STUDENTS, req, next)
        }))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    // Listing management; admins may act on an owner's behalf
    let owner = Router::new()
        .route(
            "/api/v1/owner/accommodations",
            get(list_owned_accommodations).post(create_accommodation),
        )
        .route(
            "/api/v1/owner/accommodations/:accommodation_id",
            put(update_accommodation).delete(delete_accommodation),
        )
        .route(
            "/api/v1/owner/accommodations/:accommodation_id/images",
            post(upload_accommodation_image),
        )
        .layer(middleware::from_fn(|req: Request, next: Next| {
            require_role(OWNERS_AND_ADMINS, req, next)
        }))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    // Moderation surface
    let admin = Router::new()
        .route("/api/v1/admin/owners", get(list_owners))
        .route("/api/v1/admin/owners/:user_id/approve", put(approve_owner))
        .route("/api/v1/admin/users/:user_id", delete(delete_user))
        .layer(middleware::from_fn(|req: Request, next: Next| {
            require_role(ADMINS, req, next)
        }))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public)
        .merge(account)
        .merge(student)
        .merge(owner)
        .merge(admin)
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
