use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Comment, FeedItem};

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub plant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub plant_species: String,
    pub plant_nickname: Option<String>,
    pub description: Option<String>,
    pub image_url: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostView {
    pub fn from_item(item: FeedItem, image_url: String) -> Self {
        Self {
            id: item.post.id,
            plant_id: item.post.plant_id,
            user_id: item.post.user_id,
            author_name: item.author_name,
            plant_species: item.plant_species,
            plant_nickname: item.plant_nickname,
            description: item.post.description,
            image_url,
            like_count: item.like_count,
            comment_count: item.comment_count,
            liked_by_me: item.liked_by_me,
            created_at: item.post.created_at,
            updated_at: item.post.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub limit: i64,
    pub offset: i64,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            user_id: c.user_id,
            author_name: c.author_name,
            content: c.content,
            created_at: c.created_at,
        }
    }
}
