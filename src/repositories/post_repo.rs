//! Post repository: posts, like edges and share edges.
//!
//! Counter columns only change inside a transaction that first locks the post
//! row (`SELECT ... FOR UPDATE`), so concurrent toggles on one post serialize
//! and the floor at zero is computed from the locked value.

use std::collections::HashSet;

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::db::AsyncDbPool;
use crate::error::AppError;
use crate::models::{
    EdgeChange, LikeEdge, NewLike, NewPost, NewShare, Post, PostCounterRow, PostRow,
    PostWithAuthor, UserSummary,
};
use crate::schema::{likes, posts, shares, users};

#[derive(Clone)]
pub struct PostRepository {
    pool: AsyncDbPool,
}

/// Lock the post row and return its `(likes, shares)` counters.
async fn lock_counters(
    conn: &mut AsyncPgConnection,
    post_id: i32,
) -> Result<(i32, i32), AppError> {
    posts::table
        .find(post_id)
        .select((posts::likes_count, posts::shares_count))
        .for_update()
        .first::<(i32, i32)>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("post", post_id))
}

/// Apply deltas to counters locked by `lock_counters`, each clamped at zero.
async fn adjust_counters(
    conn: &mut AsyncPgConnection,
    post_id: i32,
    (likes, shares): (i32, i32),
    delta_likes: i32,
    delta_shares: i32,
) -> Result<(i32, i32), AppError> {
    diesel::update(posts::table.find(post_id))
        .set((
            posts::likes_count.eq(likes.saturating_add(delta_likes).max(0)),
            posts::shares_count.eq(shares.saturating_add(delta_shares).max(0)),
        ))
        .returning((posts::likes_count, posts::shares_count))
        .get_result::<(i32, i32)>(conn)
        .await
        .map_err(AppError::from)
}

fn to_post_with_author(
    (row, (author_id, author_name)): (PostRow, (i32, String)),
) -> PostWithAuthor {
    PostWithAuthor {
        post: Post::from(row),
        author: UserSummary {
            id: author_id,
            username: author_name,
        },
    }
}

impl PostRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_post: NewPost) -> Result<Post, AppError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(posts::table)
            .values(&new_post)
            .returning(PostRow::as_returning())
            .get_result(&mut conn)
            .await
            .map(Post::from)
            .map_err(AppError::from)
    }

    pub async fn find_by_id(&self, post_id: i32) -> Result<Option<Post>, AppError> {
        let mut conn = self.pool.get().await?;

        posts::table
            .find(post_id)
            .select(PostRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(Post::from))
            .map_err(AppError::from)
    }

    pub async fn find_with_author(&self, post_id: i32) -> Result<Option<PostWithAuthor>, AppError> {
        let mut conn = self.pool.get().await?;

        posts::table
            .inner_join(users::table)
            .filter(posts::id.eq(post_id))
            .select((PostRow::as_select(), (users::id, users::username)))
            .first::<(PostRow, (i32, String))>(&mut conn)
            .await
            .optional()
            .map(|row| row.map(to_post_with_author))
            .map_err(AppError::from)
    }

    /// Newest first, ties broken by id.
    pub async fn list_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostWithAuthor>, AppError> {
        let mut conn = self.pool.get().await?;

        posts::table
            .inner_join(users::table)
            .order((posts::created_at.desc(), posts::id.desc()))
            .offset(offset)
            .limit(limit)
            .select((PostRow::as_select(), (users::id, users::username)))
            .load::<(PostRow, (i32, String))>(&mut conn)
            .await
            .map(|rows| rows.into_iter().map(to_post_with_author).collect())
            .map_err(AppError::from)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let mut conn = self.pool.get().await?;

        posts::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn update_caption(
        &self,
        post_id: i32,
        new_caption: Option<String>,
    ) -> Result<Option<Post>, AppError> {
        let mut conn = self.pool.get().await?;

        diesel::update(posts::table.find(post_id))
            .set((
                posts::caption.eq(new_caption),
                posts::updated_at.eq(diesel::dsl::now),
            ))
            .returning(PostRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map(|row| row.map(Post::from))
            .map_err(AppError::from)
    }

    /// Delete a post; like and share edges go with it (`ON DELETE CASCADE`).
    pub async fn delete(&self, post_id: i32) -> Result<Option<Post>, AppError> {
        let mut conn = self.pool.get().await?;

        diesel::delete(posts::table.find(post_id))
            .returning(PostRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map(|row| row.map(Post::from))
            .map_err(AppError::from)
    }

    pub async fn like_exists(&self, user: i32, post: i32) -> Result<bool, AppError> {
        let mut conn = self.pool.get().await?;

        diesel::select(diesel::dsl::exists(
            likes::table
                .filter(likes::user_id.eq(user))
                .filter(likes::post_id.eq(post)),
        ))
        .get_result(&mut conn)
        .await
        .map_err(AppError::from)
    }

    /// Which of `post_ids` the user has a like edge for.
    pub async fn liked_post_ids(
        &self,
        user: i32,
        post_ids: &[i32],
    ) -> Result<HashSet<i32>, AppError> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = self.pool.get().await?;

        likes::table
            .filter(likes::user_id.eq(user))
            .filter(likes::post_id.eq_any(post_ids))
            .select(likes::post_id)
            .load::<i32>(&mut conn)
            .await
            .map(|ids| ids.into_iter().collect())
            .map_err(AppError::from)
    }

    /// Insert a like edge unless one exists, bumping `likes_count` with it.
    pub async fn insert_like(&self, user: i32, post: i32) -> Result<EdgeChange, AppError> {
        let mut conn = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let (likes_count, shares_count) = lock_counters(conn, post).await?;

                let exists: bool = diesel::select(diesel::dsl::exists(
                    likes::table
                        .filter(likes::user_id.eq(user))
                        .filter(likes::post_id.eq(post)),
                ))
                .get_result(conn)
                .await?;

                if exists {
                    return Ok(EdgeChange {
                        applied: false,
                        likes_count,
                        shares_count,
                    });
                }

                diesel::insert_into(likes::table)
                    .values(&NewLike {
                        user_id: user,
                        post_id: post,
                    })
                    .execute(conn)
                    .await?;

                let (likes_count, shares_count) =
                    adjust_counters(conn, post, (likes_count, shares_count), 1, 0).await?;

                Ok(EdgeChange {
                    applied: true,
                    likes_count,
                    shares_count,
                })
            }
            .scope_boxed()
        })
        .await
    }

    /// Remove the user's like edges for a post, decrementing with a floor at zero.
    pub async fn delete_like(&self, user: i32, post: i32) -> Result<EdgeChange, AppError> {
        let mut conn = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let (likes_count, shares_count) = lock_counters(conn, post).await?;

                // Racing inserts may have left duplicates, remove them all
                let removed = diesel::delete(
                    likes::table
                        .filter(likes::user_id.eq(user))
                        .filter(likes::post_id.eq(post)),
                )
                .execute(conn)
                .await?;

                if removed == 0 {
                    return Ok(EdgeChange {
                        applied: false,
                        likes_count,
                        shares_count,
                    });
                }

                let (likes_count, shares_count) =
                    adjust_counters(conn, post, (likes_count, shares_count), -1, 0).await?;

                Ok(EdgeChange {
                    applied: true,
                    likes_count,
                    shares_count,
                })
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn insert_share(&self, user: i32, post: i32) -> Result<EdgeChange, AppError> {
        let mut conn = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let (likes_count, shares_count) = lock_counters(conn, post).await?;

                diesel::insert_into(shares::table)
                    .values(&NewShare {
                        user_id: user,
                        post_id: post,
                    })
                    .execute(conn)
                    .await?;

                let (likes_count, shares_count) =
                    adjust_counters(conn, post, (likes_count, shares_count), 0, 1).await?;

                Ok(EdgeChange {
                    applied: true,
                    likes_count,
                    shares_count,
                })
            }
            .scope_boxed()
        })
        .await
    }

    /// Keyset walk over post counters, ascending by id.
    pub async fn counters_after(
        &self,
        after_id: i32,
        limit: i64,
    ) -> Result<Vec<PostCounterRow>, AppError> {
        let mut conn = self.pool.get().await?;

        posts::table
            .filter(posts::id.gt(after_id))
            .order(posts::id.asc())
            .limit(limit)
            .select(PostCounterRow::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Keyset walk over like edges, ascending by id.
    pub async fn like_edges_after(
        &self,
        after_id: i32,
        limit: i64,
    ) -> Result<Vec<LikeEdge>, AppError> {
        let mut conn = self.pool.get().await?;

        likes::table
            .filter(likes::id.gt(after_id))
            .order(likes::id.asc())
            .limit(limit)
            .select(LikeEdge::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
