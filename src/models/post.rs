use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::UserSummary;

/// A published image with its Store-resident counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub user_id: i32,
    pub image_path: String,
    pub caption: Option<String>,
    pub likes_count: i32,
    pub shares_count: i32,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostRow {
    pub id: i32,
    pub user_id: i32,
    pub image_path: String,
    pub caption: Option<String>,
    pub likes_count: i32,
    pub shares_count: i32,
    pub created_at: jiff_diesel::Timestamp,
    pub updated_at: jiff_diesel::Timestamp,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            image_path: row.image_path,
            caption: row.caption,
            likes_count: row.likes_count,
            shares_count: row.shares_count,
            created_at: row.created_at.to_jiff(),
            updated_at: row.updated_at.to_jiff(),
        }
    }
}

/// A post joined with its author, as listed by timeline queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: UserSummary,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPost {
    pub user_id: i32,
    pub image_path: String,
    pub caption: Option<String>,
}

/// Like edge between a user and a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LikeEdge {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
}

#[derive(Debug, Insertable, Clone, Copy)]
#[diesel(table_name = crate::schema::likes)]
pub struct NewLike {
    pub user_id: i32,
    pub post_id: i32,
}

#[derive(Debug, Insertable, Clone, Copy)]
#[diesel(table_name = crate::schema::shares)]
pub struct NewShare {
    pub user_id: i32,
    pub post_id: i32,
}

/// Store-resident counters of one post, as walked by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostCounterRow {
    pub id: i32,
    pub likes_count: i32,
    pub shares_count: i32,
}

/// Result of an edge mutation and the counter adjustment made with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeChange {
    /// False when the edge already existed (insert) or was absent (delete)
    pub applied: bool,
    pub likes_count: i32,
    pub shares_count: i32,
}
