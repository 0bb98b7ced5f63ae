//! Cache key layout.
//!
//! Transports add the configured `key_prefix`, these are the bare keys.

pub const LIKES_FIELD: &str = "likes";
pub const SHARES_FIELD: &str = "shares";

/// Patterns reported by `cache stats`, paired with a label.
pub const STATS_PATTERNS: [(&str, &str); 6] = [
    ("session:*", "sessions"),
    ("timeline:*", "timeline pages"),
    ("post:*", "post counters"),
    ("user_likes:*", "user like sets"),
    ("blacklist:*", "blacklisted tokens"),
    ("user_online:*", "online users"),
];

pub fn post_counter(post_id: i32) -> String {
    format!("post:{}", post_id)
}

pub fn user_likes(user_id: i32) -> String {
    format!("user_likes:{}", user_id)
}

pub const ALL_USER_LIKES_PATTERN: &str = "user_likes:*";

/// User id of a `user_likes:{id}` key.
pub fn user_likes_owner(key: &str) -> Option<i32> {
    key.strip_prefix("user_likes:")?.parse().ok()
}

pub fn timeline_page(user_id: i32, page: u32) -> String {
    format!("timeline:{}:{}", user_id, page)
}

pub fn user_timeline_pattern(user_id: i32) -> String {
    format!("timeline:{}:*", user_id)
}

pub const ALL_TIMELINES_PATTERN: &str = "timeline:*";

pub fn session(user_id: i32) -> String {
    format!("session:{}", user_id)
}

pub fn active_sessions(user_id: i32) -> String {
    format!("active_sessions:{}", user_id)
}

pub fn blacklist(token: &str) -> String {
    format!("blacklist:{}", token)
}

pub fn user_online(user_id: i32) -> String {
    format!("user_online:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::glob_match;

    #[test]
    fn test_user_pattern_matches_only_that_user() {
        let pattern = user_timeline_pattern(1);
        assert!(glob_match(&pattern, &timeline_page(1, 0)));
        assert!(glob_match(&pattern, &timeline_page(1, 12)));
        assert!(!glob_match(&pattern, &timeline_page(11, 0)));
        assert!(glob_match(ALL_TIMELINES_PATTERN, &timeline_page(11, 0)));
    }

    #[test]
    fn test_user_likes_owner() {
        assert_eq!(user_likes_owner(&user_likes(42)), Some(42));
        assert_eq!(user_likes_owner("user_likes:abc"), None);
        assert_eq!(user_likes_owner("session:42"), None);
    }
}
