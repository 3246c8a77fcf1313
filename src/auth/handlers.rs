use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, ProfileView, PublicUser, RefreshRequest, RegisterRequest,
            UpdateProfileRequest,
        },
        password::{check_password_policy, hash_password, verify_password},
        repo_types::{Profile, User},
        services::{default_display_name, is_valid_email, AuthUser, JwtKeys},
    },
    errors::{bad_request, internal, is_unique_violation, not_found, ApiError},
    plants::{repo_types::Plant, services::to_views},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/profiles/:id", get(get_profile))
}

fn public_user(user: User) -> PublicUser {
    PublicUser {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        bio: user.bio,
    }
}

fn email_taken() -> ApiError {
    (StatusCode::CONFLICT, "Email already registered".into())
}

fn issue_tokens(keys: &JwtKeys, user: User) -> Result<AuthResponse, ApiError> {
    let access_token = keys.sign_access(user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let refresh_token = keys.sign_refresh(user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(bad_request("Invalid email"));
    }

    if let Err(reason) = check_password_policy(&payload.password) {
        warn!(reason, "password rejected");
        return Err(bad_request(reason));
    }

    // Ensure email is not taken
    match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err(email_taken());
        }
        Ok(None) => {}
        Err(e) => return Err(internal(e)),
    }

    let display_name = payload
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_display_name(&payload.email));

    let hash = hash_password(&payload.password).map_err(internal)?;

    // The lookup above is only a fast path; two concurrent registrations are
    // settled by the unique index on email.
    let user = match User::create(&state.db, &payload.email, &hash, &display_name).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email registered concurrently");
            return Err(email_taken());
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_tokens(&JwtKeys::from_ref(&state), user).map(Json)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(bad_request("Invalid email"));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    issue_tokens(&JwtKeys::from_ref(&state), user).map(Json)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    issue_tokens(&keys, user).map(Json)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            error!(user_id = %user_id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;
    Ok(Json(public_user(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let display_name = payload.display_name.as_deref().map(str::trim);
    if display_name.is_some_and(str::is_empty) {
        return Err(bad_request("display_name must not be empty"));
    }

    let user = User::update_profile(&state.db, user_id, display_name, payload.bio.as_deref())
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("User"))?;

    info!(%user_id, "profile updated");
    Ok(Json(public_user(user)))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(_viewer): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile = Profile::find(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Profile"))?;

    let plants = Plant::list_public_by_user(&state.db, id)
        .await
        .map_err(internal)?;

    let plants = to_views(&state, plants).await.map_err(internal)?;

    Ok(Json(ProfileView {
        id: profile.id,
        display_name: profile.display_name,
        bio: profile.bio,
        created_at: profile.created_at,
        plants,
    }))
}

#[cfg(test)]
mod me_tests {
    use super::*;

    #[test]
    fn public_user_hides_password_hash() {
        let now = time::OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: "kaito@bonsai.jp".into(),
            password_hash: "$argon2id$secret".into(),
            display_name: "Kaito".into(),
            bio: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&public_user(user)).unwrap();
        assert!(json.contains("kaito@bonsai.jp"));
        assert!(json.contains("Kaito"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn duplicate_email_maps_to_conflict() {
        assert_eq!(email_taken().0, StatusCode::CONFLICT);
    }
}
