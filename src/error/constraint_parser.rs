use std::sync::OnceLock;

use regex::Regex;

/// Utility for parsing PostgreSQL constraint violation messages.
///
/// Turns messages such as
/// `duplicate key value violates unique constraint "users_username_key"` into
/// structured `(entity, field, value)` triples.
pub struct ConstraintParser;

/// Compiled regex patterns for constraint parsing, cached for performance
struct RegexPatterns {
    key_value: Regex,
    table_name: Regex,
}

impl RegexPatterns {
    fn new() -> Self {
        Self {
            // Matches "Key (field)=(value)" pattern in PostgreSQL messages
            key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").expect("valid key/value regex"),
            // Matches table names in quotes
            table_name: Regex::new(r#"table "([^"]+)""#).expect("valid table regex"),
        }
    }
}

static REGEX_PATTERNS: OnceLock<RegexPatterns> = OnceLock::new();

impl ConstraintParser {
    fn patterns() -> &'static RegexPatterns {
        REGEX_PATTERNS.get_or_init(RegexPatterns::new)
    }

    /// Parses a unique constraint violation into `(entity, field, value)`.
    ///
    /// The constraint name (`users_email_key`) is preferred; the `Key (..)=(..)`
    /// detail line supplies the value.
    pub fn parse_unique_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let value = Self::extract_key_value_from_message(message).map(|(_, v)| v);

        if let Some((entity, field)) = constraint_name.and_then(Self::parse_constraint_name) {
            return Some((
                entity,
                field,
                value.unwrap_or_else(|| "duplicate_value".to_string()),
            ));
        }

        let (field, value) = Self::extract_key_value_from_message(message)?;
        let entity =
            Self::extract_table_from_message(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Parses a foreign key violation into `(entity, field, referenced_value)`.
    pub fn parse_foreign_key_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let value = Self::extract_key_value_from_message(message).map(|(_, v)| v);

        if let Some((entity, field)) =
            constraint_name.and_then(Self::parse_foreign_key_constraint_name)
        {
            return Some((
                entity,
                field,
                value.unwrap_or_else(|| "invalid_reference".to_string()),
            ));
        }

        let (field, value) = Self::extract_key_value_from_message(message)?;
        let entity =
            Self::extract_table_from_message(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Splits names like `users_email_key` into `("users", "email")`.
    ///
    /// Field names containing underscores are kept whole (`posts_image_path_key`
    /// yields `image_path`).
    pub fn parse_constraint_name(constraint_name: &str) -> Option<(String, String)> {
        let (entity, rest) = constraint_name.split_once('_')?;
        let field = rest
            .strip_suffix("_key")
            .or_else(|| rest.strip_suffix("_idx"))
            .or_else(|| rest.strip_suffix("_check"))?;
        if entity.is_empty() || field.is_empty() {
            return None;
        }
        Some((entity.to_string(), field.to_string()))
    }

    /// Splits names like `likes_post_id_fkey` into `("likes", "post_id")`.
    pub fn parse_foreign_key_constraint_name(constraint_name: &str) -> Option<(String, String)> {
        let without_suffix = constraint_name.strip_suffix("_fkey")?;
        let (entity, field) = without_suffix.split_once('_')?;
        if entity.is_empty() || field.is_empty() {
            return None;
        }
        Some((entity.to_string(), field.to_string()))
    }

    /// Extracts a table name from a message using the `table "name"` pattern.
    pub fn extract_table_from_message(message: &str) -> Option<String> {
        Self::patterns()
            .table_name
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Extracts `(field, value)` from the `Key (field)=(value)` detail line.
    pub fn extract_key_value_from_message(message: &str) -> Option<(String, String)> {
        Self::patterns().key_value.captures(message).and_then(|caps| {
            let field = caps.get(1)?.as_str().to_string();
            let value = caps.get(2)?.as_str().to_string();
            Some((field, value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unique_violation_with_constraint_name() {
        let message = "duplicate key value violates unique constraint \"users_username_key\"\nDETAIL: Key (username)=(alice) already exists.";
        let result = ConstraintParser::parse_unique_violation(message, Some("users_username_key"));
        assert_eq!(
            result,
            Some((
                "users".to_string(),
                "username".to_string(),
                "alice".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_unique_violation_without_constraint_name() {
        let message = "duplicate key value violates unique constraint\nDETAIL: Key (email)=(a@b.io) already exists in table \"users\".";
        let result = ConstraintParser::parse_unique_violation(message, None);
        assert_eq!(
            result,
            Some(("users".to_string(), "email".to_string(), "a@b.io".to_string()))
        );
    }

    #[test]
    fn test_parse_constraint_name_keeps_underscored_fields() {
        assert_eq!(
            ConstraintParser::parse_constraint_name("posts_image_path_key"),
            Some(("posts".to_string(), "image_path".to_string()))
        );
        assert_eq!(ConstraintParser::parse_constraint_name("users_pkey"), None);
    }

    #[test]
    fn test_parse_foreign_key_constraint_name() {
        assert_eq!(
            ConstraintParser::parse_foreign_key_constraint_name("likes_post_id_fkey"),
            Some(("likes".to_string(), "post_id".to_string()))
        );
        assert_eq!(
            ConstraintParser::parse_foreign_key_constraint_name("likes_post_id_key"),
            None
        );
    }

    #[test]
    fn test_no_match_returns_none() {
        assert_eq!(
            ConstraintParser::parse_unique_violation("something went wrong", None),
            None
        );
    }
}
