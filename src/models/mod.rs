mod post;
mod user;

pub use post::{
    EdgeChange, LikeEdge, NewLike, NewPost, NewShare, Post, PostCounterRow, PostRow,
    PostWithAuthor,
};
pub use user::{NewUser, UpdateUser, User, UserRow, UserSummary};
