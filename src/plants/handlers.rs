use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{PlantRequest, PlantView};
use super::repo_types::Plant;
use super::services::{to_view, to_views, validate_plant};
use crate::{
    auth::services::AuthUser,
    errors::{bad_request, internal, not_found, ApiError},
    images::services::{discard_image, read_upload_form, upload_image, validate_image, MAX_IMAGE_BYTES},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/plants", get(list_plants))
        .route("/plants/:id", get(get_plant))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/plants", post(create_plant))
        .route("/plants/:id", put(update_plant).delete(delete_plant))
        .route(
            "/plants/:id/image",
            post(upload_plant_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
}

#[instrument(skip(state))]
pub async fn list_plants(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PlantView>>, ApiError> {
    let plants = Plant::list_by_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(to_views(&state, plants).await.map_err(internal)?))
}

/// Owners see everything; other users only see public plants.
#[instrument(skip(state))]
pub async fn get_plant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PlantView>, ApiError> {
    let plant = Plant::find(&state.db, id)
        .await
        .map_err(internal)?
        .filter(|p| p.user_id == user_id || p.is_public)
        .ok_or_else(|| not_found("Plant"))?;
    Ok(Json(to_view(&state, plant).await.map_err(internal)?))
}

#[instrument(skip(state, body))]
pub async fn create_plant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<PlantRequest>,
) -> Result<(StatusCode, HeaderMap, Json<PlantView>), ApiError> {
    let fields = validate_plant(body).map_err(bad_request)?;
    let plant = Plant::create(&state.db, user_id, &fields)
        .await
        .map_err(internal)?;
    info!(%user_id, plant_id = %plant.id, species = %plant.species, "plant created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/plants/{}", plant.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    let view = to_view(&state, plant).await.map_err(internal)?;
    Ok((StatusCode::CREATED, headers, Json(view)))
}

#[instrument(skip(state, body))]
pub async fn update_plant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PlantRequest>,
) -> Result<Json<PlantView>, ApiError> {
    let fields = validate_plant(body).map_err(bad_request)?;
    let plant = Plant::update(&state.db, user_id, id, &fields)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Plant"))?;
    info!(%user_id, plant_id = %id, "plant updated");
    Ok(Json(to_view(&state, plant).await.map_err(internal)?))
}

#[instrument(skip(state))]
pub async fn delete_plant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let plant = Plant::delete(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Plant"))?;
    if let Some(key) = plant.image_key.as_deref() {
        discard_image(&state, key).await;
    }
    info!(%user_id, plant_id = %id, "plant deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /plants/:id/image (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn upload_plant_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<PlantView>, ApiError> {
    let form = read_upload_form(mp)
        .await
        .map_err(|e| bad_request(e.to_string()))?;
    let file = form.file.ok_or_else(|| bad_request("file is required"))?;
    validate_image(&file).map_err(bad_request)?;

    let plant = Plant::find(&state.db, id)
        .await
        .map_err(internal)?
        .filter(|p| p.user_id == user_id)
        .ok_or_else(|| not_found("Plant"))?;

    let key = upload_image(&state, "plants", user_id, plant.id, file)
        .await
        .map_err(internal)?;

    match Plant::replace_image_key(&state.db, user_id, id, &key).await {
        Ok(Some(previous)) => {
            if let Some(old) = previous.as_deref() {
                discard_image(&state, old).await;
            }
        }
        Ok(None) => {
            warn!(plant_id = %id, "plant vanished during upload");
            discard_image(&state, &key).await;
            return Err(not_found("Plant"));
        }
        Err(e) => {
            discard_image(&state, &key).await;
            return Err(internal(e));
        }
    }

    let plant = Plant::find(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Plant"))?;
    info!(%user_id, plant_id = %id, "plant image replaced");
    Ok(Json(to_view(&state, plant).await.map_err(internal)?))
}
