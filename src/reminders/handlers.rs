use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::calendar::{assemble_month, month_bounds};
use super::dto::{
    CalendarMonth, GenerateRequest, GenerateResponse, RangeQuery, ReminderView, ToggleRequest,
};
use super::services::{self, CareError};
use crate::{
    context::RequestContext,
    errors::{bad_request, internal, ApiError},
    plants::repo_types::Plant,
    state::AppState,
};

pub fn reminder_routes() -> Router<AppState> {
    Router::new()
        .route("/reminders", get(list_reminders))
        .route("/reminders/generate", post(generate_reminders))
        .route("/reminders/:id/toggle", post(toggle_reminder))
        .route("/calendar/:year/:month", get(calendar_month))
}

fn reject(e: CareError) -> ApiError {
    let status = e.status();
    if status.is_server_error() {
        return internal(e);
    }
    warn!(error = %e, %status, "reminder request rejected");
    (status, e.to_string())
}

/// An empty body means "use today's date". A non-empty body must be a JSON
/// `GenerateRequest`; anything else is rejected rather than ignored.
pub fn parse_generate_body(headers: &HeaderMap, body: &[u8]) -> Result<GenerateRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateRequest::default());
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if !is_json {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected an application/json body".into(),
        ));
    }
    serde_json::from_slice(body).map_err(|e| bad_request(format!("invalid generate request: {e}")))
}

/// POST /reminders/generate { today?: "YYYY-MM-DD" }
#[instrument(skip(state, headers, body), fields(user_id = %ctx.user_id))]
pub async fn generate_reminders(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let req = parse_generate_body(&headers, &body)?;
    let today = req.today.unwrap_or_else(|| ctx.today());

    let plants = Plant::list_by_user(&state.db, ctx.user_id)
        .await
        .map_err(internal)?;

    let (outcome, month) = services::generate_and_reload(state.reminders.as_ref(), &ctx, &plants, today)
        .await
        .map_err(reject)?;

    Ok(Json(GenerateResponse {
        candidates: outcome.candidates,
        inserted: outcome.inserted,
        reminders: month.into_iter().map(ReminderView::from).collect(),
    }))
}

/// POST /reminders/:id/toggle { completed: <state the client shows> }
#[instrument(skip(state), fields(user_id = %ctx.user_id))]
pub async fn toggle_reminder(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<ReminderView>, ApiError> {
    let updated = services::toggle(state.reminders.as_ref(), &ctx, id, body.completed)
        .await
        .map_err(reject)?;
    Ok(Json(ReminderView::from(updated)))
}

/// GET /reminders?start=YYYY-MM-DD&end=YYYY-MM-DD
#[instrument(skip(state), fields(user_id = %ctx.user_id))]
pub async fn list_reminders(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Vec<ReminderView>>, ApiError> {
    let rows = services::reminders_in_range(state.reminders.as_ref(), &ctx, q.start, q.end)
        .await
        .map_err(reject)?;
    Ok(Json(rows.into_iter().map(ReminderView::from).collect()))
}

#[instrument(skip(state), fields(user_id = %ctx.user_id))]
pub async fn calendar_month(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((year, month)): Path<(i32, u8)>,
) -> Result<Json<CalendarMonth>, ApiError> {
    let (start, end) = month_bounds(year, month).map_err(reject)?;
    let rows = services::reminders_in_range(state.reminders.as_ref(), &ctx, start, end)
        .await
        .map_err(reject)?;
    Ok(Json(assemble_month(year, month, &rows).map_err(reject)?))
}
