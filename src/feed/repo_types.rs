use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub image_key: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Post as it appears in the feed, with author, plant and counters.
#[derive(Debug, Clone, FromRow)]
pub struct FeedItem {
    #[sqlx(flatten)]
    pub post: Post,
    pub author_name: String,
    pub plant_species: String,
    pub plant_nickname: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}
