use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    auth::{repo_types::Profile, services::AuthUser},
    errors::{bad_request, internal, ApiError},
    plants::{dto::PlantView, repo_types::Plant, services::to_views},
    state::AppState,
};

pub const MAX_RESULTS: i64 = 20;
pub const MAX_QUERY_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub plants: Vec<PlantView>,
    pub profiles: Vec<Profile>,
}

pub fn search_routes() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

/// Substring ILIKE pattern with the user's `%`, `_` and `\` taken literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// GET /search?q=
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ApiError> {
    let term = q.q.trim();
    if term.is_empty() {
        return Ok(Json(SearchResults {
            plants: Vec::new(),
            profiles: Vec::new(),
        }));
    }
    if term.chars().count() > MAX_QUERY_CHARS {
        return Err(bad_request("search term is too long"));
    }

    let pattern = escape_like(term);
    let plants = Plant::search_public(&state.db, &pattern, MAX_RESULTS)
        .await
        .map_err(internal)?;
    let profiles = Profile::search(&state.db, &pattern, MAX_RESULTS)
        .await
        .map_err(internal)?;
    Ok(Json(SearchResults {
        plants: to_views(&state, plants).await.map_err(internal)?,
        profiles,
    }))
}
