use anyhow::Context;

use super::dto::PostView;
use super::repo_types::FeedItem;
use crate::images::services::URL_TTL_SECS;
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_COMMENT_CHARS: usize = 2000;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Clamps `limit` into `1..=MAX_PAGE_SIZE` and `offset` to non-negative.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub fn validate_comment(raw: &str) -> Result<String, String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err("comment must not be empty".into());
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(format!("comment is longer than {MAX_COMMENT_CHARS} characters"));
    }
    Ok(content.to_string())
}

pub fn normalize_description(raw: Option<&str>) -> Result<Option<String>, String> {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(format!("description is longer than {MAX_DESCRIPTION_CHARS} characters"));
    }
    Ok(Some(text.to_string()))
}

pub async fn to_post_view(st: &AppState, item: FeedItem) -> anyhow::Result<PostView> {
    let url = st
        .storage
        .presign_get(&item.post.image_key, URL_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {}", item.post.image_key))?;
    Ok(PostView::from_item(item, url))
}

pub async fn to_post_views(st: &AppState, items: Vec<FeedItem>) -> anyhow::Result<Vec<PostView>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(to_post_view(st, item).await?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::repo_types::Post;
    use time::macros::datetime;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn page_bounds_clamp() {
        assert_eq!(page_bounds(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_bounds(Some(0), Some(-5)), (1, 0));
        assert_eq!(page_bounds(Some(500), Some(40)), (MAX_PAGE_SIZE, 40));
    }

    #[test]
    fn comments_are_trimmed_and_bounded() {
        assert_eq!(validate_comment("  nice pads  ").unwrap(), "nice pads");
        assert!(validate_comment("   ").is_err());
        assert!(validate_comment(&"a".repeat(MAX_COMMENT_CHARS + 1)).is_err());
        assert!(validate_comment(&"ä".repeat(MAX_COMMENT_CHARS)).is_ok());
    }

    #[test]
    fn blank_description_becomes_none() {
        assert_eq!(normalize_description(None).unwrap(), None);
        assert_eq!(normalize_description(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_description(Some(" first repot ")).unwrap(),
            Some("first repot".into())
        );
        assert!(normalize_description(Some(&"x".repeat(MAX_DESCRIPTION_CHARS + 1))).is_err());
    }

    #[tokio::test]
    async fn post_view_carries_presigned_url() {
        let state = AppState::fake();
        let item = FeedItem {
            post: Post {
                id: Uuid::new_v4(),
                plant_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                image_key: "posts/u/p.jpg".into(),
                description: Some("new growth".into()),
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: datetime!(2026-10-19 09:00 UTC),
            },
            author_name: "kai".into(),
            plant_species: "Juniperus procumbens".into(),
            plant_nickname: None,
            like_count: 3,
            comment_count: 1,
            liked_by_me: true,
        };
        let view = to_post_view(&state, item).await.unwrap();
        assert_eq!(view.image_url, "https://fake.local/posts/u/p.jpg");
        assert_eq!(view.like_count, 3);
        assert!(view.liked_by_me);
        assert_eq!(view.updated_at, datetime!(2026-10-19 09:00 UTC));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["updated_at"], "2026-10-19T09:00:00Z");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }
}
