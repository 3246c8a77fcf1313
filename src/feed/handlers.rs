use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CommentRequest, CommentView, FeedPage, FeedQuery, LikeResponse, PostView};
use super::repo::toggle_like;
use super::repo_types::{Comment, FeedItem, Post};
use super::services::{normalize_description, page_bounds, to_post_view, to_post_views, validate_comment};
use crate::{
    auth::services::AuthUser,
    errors::{bad_request, forbidden, internal, not_found, ApiError},
    images::services::{discard_image, read_upload_form, upload_image, validate_image, MAX_IMAGE_BYTES},
    plants::repo_types::Plant,
    state::AppState,
};

pub fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(get_feed))
        .route(
            "/posts",
            post(create_post).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/posts/:id", get(get_post).delete(delete_post))
        .route("/posts/:id/like", post(like_post))
        .route("/posts/:id/comments", get(list_comments).post(add_comment))
        .route("/comments/:id", delete(delete_comment))
}

async fn visible_post(state: &AppState, viewer: Uuid, id: Uuid) -> Result<FeedItem, ApiError> {
    FeedItem::find_visible(&state.db, viewer, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Post"))
}

/// GET /feed?limit&offset&plant_id
#[instrument(skip(state))]
pub async fn get_feed(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<FeedQuery>,
) -> Result<Json<FeedPage>, ApiError> {
    let (limit, offset) = page_bounds(q.limit, q.offset);
    let items = FeedItem::page(&state.db, user_id, q.plant_id, limit, offset)
        .await
        .map_err(internal)?;
    let posts = to_post_views(&state, items).await.map_err(internal)?;
    Ok(Json(FeedPage { limit, offset, posts }))
}

/// POST /posts (multipart: `plant_id`, optional `description`, `file`)
#[instrument(skip(state, mp))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let form = read_upload_form(mp)
        .await
        .map_err(|e| bad_request(e.to_string()))?;
    let plant_id: Uuid = form
        .fields
        .get("plant_id")
        .ok_or_else(|| bad_request("plant_id is required"))?
        .trim()
        .parse()
        .map_err(|_| bad_request("plant_id must be a UUID"))?;
    let description =
        normalize_description(form.fields.get("description").map(String::as_str)).map_err(bad_request)?;
    let file = form.file.ok_or_else(|| bad_request("file is required"))?;
    validate_image(&file).map_err(bad_request)?;

    let plant = Plant::find(&state.db, plant_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Plant"))?;
    if plant.user_id != user_id {
        return Err(forbidden("posts can only be made about your own plants"));
    }

    let key = upload_image(&state, "posts", user_id, plant.id, file)
        .await
        .map_err(internal)?;
    let created = match Post::create(&state.db, plant.id, user_id, &key, description.as_deref()).await {
        Ok(p) => p,
        Err(e) => {
            discard_image(&state, &key).await;
            return Err(internal(e));
        }
    };
    info!(%user_id, post_id = %created.id, plant_id = %plant.id, "post created");

    let item = visible_post(&state, user_id, created.id).await?;
    let view = to_post_view(&state, item).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PostView>, ApiError> {
    let item = visible_post(&state, user_id, id).await?;
    Ok(Json(to_post_view(&state, item).await.map_err(internal)?))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match Post::delete(&state.db, user_id, id).await.map_err(internal)? {
        Some(post) => {
            discard_image(&state, &post.image_key).await;
            info!(%user_id, post_id = %id, "post deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => {
            // Distinguish someone else's post from a missing one.
            visible_post(&state, user_id, id).await?;
            Err(forbidden("only the author can delete a post"))
        }
    }
}

/// POST /posts/:id/like flips the caller's like.
#[instrument(skip(state))]
pub async fn like_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    visible_post(&state, user_id, id).await?;
    let (liked, like_count) = toggle_like(&state.db, id, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(LikeResponse { liked, like_count }))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    visible_post(&state, user_id, id).await?;
    let rows = Comment::list(&state.db, id).await.map_err(internal)?;
    Ok(Json(rows.into_iter().map(CommentView::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let content = validate_comment(&body.content).map_err(bad_request)?;
    visible_post(&state, user_id, id).await?;
    let comment = Comment::create(&state.db, id, user_id, &content)
        .await
        .map_err(internal)?;
    info!(%user_id, post_id = %id, comment_id = %comment.id, "comment added");
    Ok((StatusCode::CREATED, Json(CommentView::from(comment))))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = Comment::delete(&state.db, user_id, id)
        .await
        .map_err(internal)?;
    if !removed {
        return Err(not_found("Comment"));
    }
    info!(%user_id, comment_id = %id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
