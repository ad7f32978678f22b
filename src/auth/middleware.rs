use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use tracing::debug;

use model::entities::user::{self, Role};

use crate::error::{ApiError, AuthFailure};
use crate::schemas::AppState;

/// The resolved identity attached to every authenticated request.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
    /// Full live profile, for handlers that need more than id and role
    pub user: user::Model,
}

/// Authentication middleware for all protected routes.
///
/// Resolves the bearer token to a live user record and attaches it to
/// the request. The token's embedded role is treated as a cache with a
/// staleness check: if the stored role has changed since issuance, the
/// token is rejected even though it is otherwise valid. Read-only; the
/// only effect is the attached identity.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = resolve_user(&state, request.headers()).await?;
    debug!(
        "authenticated user {} with role {}",
        auth_user.id, auth_user.role
    );

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthenticated(AuthFailure::MissingToken))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .unwrap_or(header_value)
        .trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated(AuthFailure::MissingToken));
    }

    let claims = state
        .tokens
        .verify(token)
        .map_err(ApiError::Unauthenticated)?;

    let user_id: i32 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthenticated(AuthFailure::MalformedToken))?;

    // A store failure here must not leak detail; it reads the same as a
    // missing user to the caller.
    let user = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|_| ApiError::Unauthenticated(AuthFailure::UnknownUser))?
        .ok_or(ApiError::Unauthenticated(AuthFailure::UnknownUser))?;

    // Staleness check: the embedded role was cached at issuance time and
    // the stored role may have moved on since. The live record wins.
    if user.role != claims.role {
        return Err(ApiError::Unauthenticated(AuthFailure::RoleMismatch));
    }

    Ok(AuthUser {
        id: user.id,
        role: user.role,
        user,
    })
}

/// Role gate: restricts an already-authenticated route to an allow-list
/// of roles. Must be layered after [`authenticate`]; it only inspects
/// the attached identity and never touches the store.
pub async fn require_role(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(ApiError::Unauthenticated(AuthFailure::MissingToken))?;

    if !allowed.contains(&auth_user.role) {
        return Err(ApiError::Forbidden(allowed));
    }

    Ok(next.run(request).await)
}
