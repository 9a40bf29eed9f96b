//! Input validation shared by the API handlers and the seed tool.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::traits::GoalInput;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length for titles of goals, deliverables, events and tags.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Something `@` something `.` something, with no whitespace anywhere.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Normalize an email address for use as the user id.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email syntax.
pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(Error::InvalidInput("Invalid email format".to_string()));
    }
    Ok(())
}

/// Validate password length.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Validate a required title and return it trimmed.
pub fn validate_title(title: &str, what: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} title is required", what)));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(Error::InvalidInput(format!(
            "{} title must be at most {} characters",
            what, MAX_TITLE_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate that a time range does not run backwards.
pub fn validate_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end < start {
        return Err(Error::InvalidInput(
            "End time must not be before start time".to_string(),
        ));
    }
    Ok(())
}

/// Validate an optional minutes estimate.
pub fn validate_minutes_estimate(minutes: Option<i32>) -> Result<()> {
    match minutes {
        Some(m) if m < 0 => Err(Error::InvalidInput(
            "minutesEstimate must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Calendar metadata must be a JSON object when present.
pub fn validate_metadata(metadata: Option<&serde_json::Value>) -> Result<()> {
    match metadata {
        None | Some(serde_json::Value::Object(_)) => Ok(()),
        Some(_) => Err(Error::InvalidInput(
            "metadata must be a JSON object".to_string(),
        )),
    }
}

/// Validate a goal body: titles present, estimates non-negative, slots not
/// running backwards.
pub fn validate_goal_input(input: &GoalInput) -> Result<()> {
    validate_title(&input.title, "Goal")?;
    for deliverable in &input.deliverables {
        validate_title(&deliverable.title, "Deliverable")?;
        validate_minutes_estimate(deliverable.minutes_estimate)?;
        if let (Some(start), Some(end)) = (deliverable.start, deliverable.end) {
            validate_time_range(start, end)?;
        }
    }
    for tag in &input.info_tags {
        validate_title(&tag.title, "Info tag")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_valid_emails() {
        for email in ["test@example.com", "a.b+c@sub.domain.io", "x@y.z"] {
            assert!(validate_email(email).is_ok(), "{email} should be valid");
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "plain", "no@dot", "two@@example.com", "sp ace@example.com", "@example.com"] {
            let err = validate_email(email).unwrap_err();
            assert_eq!(err.to_string(), "Invalid input: Invalid email format");
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Test@Example.COM "), "test@example.com");
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("12345678").is_ok());
        let err = validate_password("short").unwrap_err();
        assert!(err
            .to_string()
            .contains("Password must be at least 8 characters long"));
    }

    #[test]
    fn test_password_counts_characters_not_bytes() {
        // 5 characters, 10 bytes
        assert!(validate_password("ééééé").is_err());
        assert!(validate_password("éééééééé").is_ok());
    }

    #[test]
    fn test_title_trimmed() {
        assert_eq!(validate_title("  Launch  ", "Goal").unwrap(), "Launch");
    }

    #[test]
    fn test_title_blank() {
        let err = validate_title("   ", "Goal").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Goal title is required");
    }

    #[test]
    fn test_title_too_long() {
        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(validate_title(&long, "Event").is_err());
    }

    #[test]
    fn test_time_range() {
        let start = Utc::now();
        assert!(validate_time_range(start, start).is_ok());
        assert!(validate_time_range(start, start + Duration::minutes(5)).is_ok());
        assert!(validate_time_range(start, start - Duration::minutes(5)).is_err());
    }

    #[test]
    fn test_minutes_estimate() {
        assert!(validate_minutes_estimate(None).is_ok());
        assert!(validate_minutes_estimate(Some(0)).is_ok());
        assert!(validate_minutes_estimate(Some(-1)).is_err());
    }

    #[test]
    fn test_metadata_must_be_object() {
        assert!(validate_metadata(None).is_ok());
        assert!(validate_metadata(Some(&serde_json::json!({"k": 1}))).is_ok());
        assert!(validate_metadata(Some(&serde_json::json!([1, 2]))).is_err());
        assert!(validate_metadata(Some(&serde_json::json!("text"))).is_err());
    }

    #[test]
    fn test_goal_input_validation() {
        let mut input: GoalInput = serde_json::from_str(
            r#"{"title":"Ship","deliverables":[{"title":"Docs","minutesEstimate":30}],"infoTags":[{"title":"Why","info":""}]}"#,
        )
        .unwrap();
        assert!(validate_goal_input(&input).is_ok());

        input.deliverables[0].minutes_estimate = Some(-5);
        assert!(validate_goal_input(&input).is_err());

        input.deliverables[0].minutes_estimate = None;
        input.info_tags[0].title = " ".to_string();
        let err = validate_goal_input(&input).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Info tag title is required");
    }

    #[test]
    fn test_goal_input_blank_title() {
        let input = GoalInput::default();
        let err = validate_goal_input(&input).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Goal title is required");
    }
}
