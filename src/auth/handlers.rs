use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        repo_types::User,
        services::{hash_password, is_valid_email, verify_password, AuthUser, JwtKeys},
    },
    error::AppError,
    plans::{model::Member, store::is_unique_violation},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/users", get(list_users))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AppError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AppError::Internal(e)
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    if name.is_empty() {
        warn!("empty name");
        return Err(AppError::BadRequest("Name is required".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AppError::BadRequest("Password too short".into()));
    }

    // Ensure email is not taken
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, name, &payload.email, &hash)
        .await
        .map_err(|e| create_user_error(e, &payload.email))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(issue_tokens(&state, user)?))
}

/// A concurrent registration can pass the lookup above and still lose the
/// insert on `users.email`.
fn create_user_error(e: anyhow::Error, email: &str) -> AppError {
    if e.downcast_ref::<sqlx::Error>().is_some_and(is_unique_violation) {
        warn!(email = %email, "email registered concurrently");
        return AppError::Conflict("Email already registered".into());
    }
    AppError::Internal(e)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Member>, AppError> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        error!(user_id = %user_id, "user not found");
        AppError::Unauthorized("User not found".into())
    })?;

    Ok(Json(user.into()))
}

/// The planning group: every registered member.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<Vec<Member>>, AppError> {
    Ok(Json(User::list_members(&state.db).await?))
}
