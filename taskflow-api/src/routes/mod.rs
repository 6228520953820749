/// API route handlers
///
/// Each handler opens one store transaction, calls the matching
/// `taskflow_shared::services` operation and commits on success. An error
/// drops the transaction, which rolls it back.
///
/// - `health`: Health check endpoint
/// - `me`: Current user
/// - `projects`: Projects, members and the activity feed
/// - `tasks`: Task board, reorder, assignment and summary
/// - `comments`: Task comments
/// - `labels`: Project labels and task tagging

pub mod comments;
pub mod health;
pub mod labels;
pub mod me;
pub mod projects;
pub mod tasks;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};

/// Checks an optional `#rrggbb` hex color field
pub(crate) fn validate_color(color: Option<&str>) -> ApiResult<()> {
    let Some(color) = color else {
        return Ok(());
    };

    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if valid {
        Ok(())
    } else {
        Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "color".to_string(),
            message: "Color must be a hex value like #3b82f6".to_string(),
        }]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_color() {
        assert!(validate_color(None).is_ok());
        assert!(validate_color(Some("#3b82f6")).is_ok());
        assert!(validate_color(Some("#ABCDEF")).is_ok());
        assert!(validate_color(Some("3b82f6")).is_err());
        assert!(validate_color(Some("#3b82f")).is_err());
        assert!(validate_color(Some("#3b82fg")).is_err());
    }
}
