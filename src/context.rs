use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::auth::services::{AuthUser, JwtKeys};

/// Who is asking and when. Built once per request and handed to every
/// service call that needs the caller's identity or the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub now: OffsetDateTime,
}

impl RequestContext {
    pub fn new(user_id: Uuid, now: OffsetDateTime) -> Self {
        Self { user_id, now }
    }

    pub fn today(&self) -> Date {
        self.now.date()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        Ok(Self::new(user_id, OffsetDateTime::now_utc()))
    }
}
