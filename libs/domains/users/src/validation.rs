//! Input rules for user records.
//!
//! The predicates are pure; the `validate_*` wrappers adapt them to
//! `validator` custom rules, and [`first_message`] turns a failed
//! validation into the single message returned to the client.

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::{ValidationError, ValidationErrors};

pub const MISSING_FIELDS: &str = "Missing name or email";
pub const HANGUL_NAME: &str = "Name cannot contain Korean characters";
pub const EMAIL_WITHOUT_AT: &str = "Invalid email format: must contain @ symbol";
pub const MISSING_NAME_QUERY: &str = "Missing user name in query";

/// Accounts younger than this cannot be deleted.
pub const MIN_ACCOUNT_AGE_SECS: i64 = 60;

/// Error codes in the order they are reported when several rules fail.
const REPORT_ORDER: [&str; 3] = ["missing", "hangul", "email_at"];

static HANGUL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Hangul}").unwrap());

/// True when any character of `value` belongs to the Hangul script.
pub fn contains_hangul(value: &str) -> bool {
    HANGUL.is_match(value)
}

pub fn has_at_sign(value: &str) -> bool {
    value.contains('@')
}

/// True when an account created at `created_at` may be deleted at `now`.
pub fn is_old_enough_to_delete(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(created_at) >= TimeDelta::seconds(MIN_ACCOUNT_AGE_SECS)
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub(crate) fn validate_no_hangul(name: &str) -> Result<(), ValidationError> {
    if contains_hangul(name) {
        return Err(rule_error("hangul", HANGUL_NAME));
    }
    Ok(())
}

pub(crate) fn validate_has_at_sign(email: &str) -> Result<(), ValidationError> {
    if !has_at_sign(email) {
        return Err(rule_error("email_at", EMAIL_WITHOUT_AT));
    }
    Ok(())
}

/// Pick the message of the highest-priority failed rule.
pub fn first_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();

    for code in REPORT_ORDER {
        let found = field_errors
            .values()
            .flat_map(|errs| errs.iter())
            .find(|e| e.code == code)
            .and_then(|e| e.message.as_ref());

        if let Some(message) = found {
            return message.to_string();
        }
    }

    errors.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_hangul() {
        assert!(contains_hangul("김철수"));
        assert!(contains_hangul("Kim 철수"));
        assert!(contains_hangul("ㄱ"));
        assert!(contains_hangul("ㅏ"));
        assert!(!contains_hangul("Alice"));
        assert!(!contains_hangul("José"));
        assert!(!contains_hangul("山田太郎"));
        assert!(!contains_hangul(""));
    }

    #[test]
    fn test_has_at_sign() {
        assert!(has_at_sign("a@b.com"));
        assert!(has_at_sign("@"));
        assert!(!has_at_sign("alice.example.com"));
        assert!(!has_at_sign(""));
    }

    #[test]
    fn test_is_old_enough_to_delete_boundary() {
        let created = Utc::now();

        assert!(!is_old_enough_to_delete(created, created));
        assert!(!is_old_enough_to_delete(created, created + TimeDelta::seconds(30)));
        assert!(!is_old_enough_to_delete(created, created + TimeDelta::seconds(59)));
        assert!(is_old_enough_to_delete(created, created + TimeDelta::seconds(60)));
        assert!(is_old_enough_to_delete(created, created + TimeDelta::seconds(61)));
    }

    #[test]
    fn test_future_created_at_is_not_deletable() {
        let now = Utc::now();
        assert!(!is_old_enough_to_delete(now + TimeDelta::minutes(5), now));
    }

    #[test]
    fn test_first_message_prefers_missing_over_format() {
        let mut errors = ValidationErrors::new();
        errors.add("email", validate_has_at_sign("").unwrap_err());
        errors.add("name", rule_error("missing", MISSING_FIELDS));
        errors.add("name", validate_no_hangul("철수").unwrap_err());

        assert_eq!(first_message(&errors), MISSING_FIELDS);
    }

    #[test]
    fn test_first_message_prefers_hangul_over_email() {
        let mut errors = ValidationErrors::new();
        errors.add("email", validate_has_at_sign("nobody").unwrap_err());
        errors.add("name", validate_no_hangul("철수").unwrap_err());

        assert_eq!(first_message(&errors), HANGUL_NAME);
    }
}
