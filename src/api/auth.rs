//! Registration, login, profile handlers and the auth middleware.
//!
//! - Clients submit credentials to `/api/auth/register` or `/api/auth/login`
//! - The server returns a JWT valid for the configured TTL
//! - Protected endpoints require `Authorization: Bearer <jwt>`
//!
//! The middleware re-fetches the user record on every request, so role
//! changes take effect immediately and a stale claim cannot keep privileges.

use std::sync::{Arc, OnceLock};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use regex::Regex;
use uuid::Uuid;

use crate::auth::{jwt, password};
use crate::error::{ServiceError, ServiceResult};
use crate::task::Principal;
use crate::user::{Role, User};

use super::routes::AppState;
use super::types::{
    AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, UpdateProfileRequest,
};

/// The authenticated user for this request, injected by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.0.id,
            role: self.0.role,
        }
    }
}

/// Admin-only guard for handlers.
pub fn ensure_admin(current: &CurrentUser) -> ServiceResult<()> {
    if current.0.role != Role::Admin {
        return Err(ServiceError::Forbidden);
    }
    Ok(())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern")
    })
}

/// Hash compared against when the email is unknown, so login timing does not
/// reveal whether an account exists.
fn dummy_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| password::hash_password("dummy_password_for_timing"))
}

fn issue_token(state: &AppState, user_id: Uuid) -> ServiceResult<String> {
    jwt::issue(&state.config.jwt_secret, state.config.jwt_ttl_days, user_id)
        .map_err(|e| ServiceError::Internal(format!("failed to issue token: {e}")))
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.len() < 8 {
        return Err(ServiceError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn normalize_email(raw: &str) -> ServiceResult<String> {
    let email = raw.trim().to_lowercase();
    if !email_pattern().is_match(&email) {
        return Err(ServiceError::Validation("a valid email is required".to_string()));
    }
    Ok(email)
}

/// POST /api/auth/register - Create an account and return a token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ServiceError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("name is required".to_string()));
    }
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ServiceError::Validation("user already exists".to_string()));
    }

    let role = match (&req.admin_invite_token, &state.config.admin_invite_token) {
        (Some(given), Some(expected)) if given == expected => Role::Admin,
        _ => Role::Member,
    };

    let user = User::new(
        name.to_string(),
        email,
        password::hash_password(&req.password),
        role,
        req.profile_image_url,
    );
    let user = state.users.insert(user).await?;
    let token = issue_token(&state, user.id)?;

    tracing::info!(user = %user.id, role = user.role.as_str(), "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse::new(&user, token))))
}

/// POST /api/auth/login - Verify credentials and return a token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServiceError> {
    let email = req.email.trim().to_lowercase();
    let account = state.users.find_by_email(&email).await?;

    // One generic error for unknown email and wrong password, with a dummy
    // verification so the two paths take comparable time.
    let valid = match &account {
        Some(user) => password::verify_password(&req.password, &user.password_hash),
        None => {
            let _ = password::verify_password(&req.password, dummy_hash());
            false
        }
    };

    let Some(user) = account.filter(|_| valid) else {
        return Err(ServiceError::InvalidCredential(
            "invalid email or password".to_string(),
        ));
    };

    let token = issue_token(&state, user.id)?;
    Ok(Json(AuthResponse::new(&user, token)))
}

/// GET /api/auth/profile - The calling user's profile.
pub async fn profile(Extension(current): Extension<CurrentUser>) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(&current.0))
}

/// PUT /api/auth/profile - Update name, email or password.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AuthResponse>, ServiceError> {
    let mut user = current.0;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }
        user.name = name;
    }
    if let Some(email) = req.email {
        user.email = normalize_email(&email)?;
    }
    if let Some(new_password) = req.password {
        validate_password(&new_password)?;
        user.password_hash = password::hash_password(&new_password);
    }

    let user = state.users.update(user).await?;
    let token = issue_token(&state, user.id)?;
    Ok(Json(AuthResponse::new(&user, token)))
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "message": message })),
    )
        .into_response()
}

/// Middleware: verify the bearer token and attach the current user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return unauthorized("missing Authorization header");
    }

    let claims = match jwt::verify(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return unauthorized("invalid or expired token"),
    };

    // Role comes from the stored record, not the claim.
    let user = match state.users.find_by_id(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized("invalid user"),
        Err(e) => {
            tracing::error!(error = %e, "user lookup failed during auth");
            return ServiceError::Store(e).into_response();
        }
    };

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}
