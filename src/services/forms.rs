//! Form validation
//!
//! Each submitted form is a plain struct deserialized from the request body.
//! `validate_*` turns it into a cleaned value or a [`FormErrors`] describing
//! every problem found, so the page can be re-rendered with the submitted
//! values and messages. Checks that need storage (username taken, current
//! password) are done by the services, which add to the same `FormErrors`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const TITLE_MAX_CHARS: usize = 64;
pub const CONTENT_MAX_CHARS: usize = 255;
pub const USERNAME_MAX_CHARS: usize = 150;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const AVATAR_MAX_CHARS: usize = 255;
pub const TAG_MAX_CHARS: usize = 32;
pub const MAX_TAGS: usize = 3;
pub const PASSWORD_MIN_CHARS: usize = 4;

pub const REQUIRED: &str = "This field is required.";
pub const TOO_MANY_TAGS: &str = "More than three tags have been entered!";
pub const DUPLICATE_TAGS: &str = "Tags must be unique!";
pub const EMPTY_TAG: &str = "Tags cannot be empty!";
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";
pub const PASSWORDS_DONT_MATCH: &str = "Passwords don't match!";
pub const WRONG_CREDENTIALS: &str = "Wrong password or username";
pub const OLD_PASSWORD_INCORRECT: &str = "The old password is incorrect!";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_AVATAR: &str = "Enter a valid image URL or site path.";

/// Validation failures keyed by field name, plus form-wide messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("invalid form input")]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message on `field`
    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages for one field, empty if it is valid
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

// ============================================================================
// Submitted forms
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AskForm {
    pub title: String,
    pub content: String,
    pub tags: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub password_check: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsForm {
    pub email: String,
    pub avatar: String,
    /// Current password
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub new_password: String,
    #[serde(skip_serializing)]
    pub password_check: String,
}

// ============================================================================
// Cleaned values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedQuestion {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedSignup {
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedSettings {
    pub current_password: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub new_password: Option<String>,
}

// ============================================================================
// Validators
// ============================================================================

pub fn validate_ask(form: &AskForm) -> Result<CleanedQuestion, FormErrors> {
    let mut errors = FormErrors::new();

    let title = required_text(&mut errors, "title", &form.title, TITLE_MAX_CHARS);
    let content = required_text(&mut errors, "content", &form.content, CONTENT_MAX_CHARS);
    let tags = if form.tags.trim().is_empty() {
        errors.add("tags", REQUIRED);
        Vec::new()
    } else {
        parse_tags(&form.tags).unwrap_or_else(|message| {
            errors.add("tags", message);
            Vec::new()
        })
    };

    errors.into_result(CleanedQuestion {
        title,
        content,
        tags,
    })
}

/// Split a comma separated tag list.
///
/// `"a, b,c"` gives `["a", "b", "c"]`. Empty entries, more than three
/// entries and repeated entries are rejected with the message to show.
pub fn parse_tags(input: &str) -> Result<Vec<String>, String> {
    let tags: Vec<String> = input.split(',').map(|t| t.trim().to_string()).collect();

    if tags.len() > MAX_TAGS {
        return Err(TOO_MANY_TAGS.to_string());
    }
    if tags.iter().any(|t| t.is_empty()) {
        return Err(EMPTY_TAG.to_string());
    }
    let mut seen = HashSet::new();
    if !tags.iter().all(|t| seen.insert(t.as_str())) {
        return Err(DUPLICATE_TAGS.to_string());
    }
    if let Some(long) = tags.iter().find(|t| t.chars().count() > TAG_MAX_CHARS) {
        return Err(format!(
            "Tag \"{}\" is longer than {} characters!",
            long, TAG_MAX_CHARS
        ));
    }

    Ok(tags)
}

/// Returns the trimmed comment body
pub fn validate_comment(form: &CommentForm) -> Result<String, FormErrors> {
    let mut errors = FormErrors::new();
    let content = required_text(&mut errors, "content", &form.content, CONTENT_MAX_CHARS);
    errors.into_result(content)
}

pub fn validate_signup(form: &SignupForm) -> Result<CleanedSignup, FormErrors> {
    let mut errors = FormErrors::new();

    let username = required_text(&mut errors, "username", &form.username, USERNAME_MAX_CHARS);
    if !username.is_empty() && !is_valid_username(&username) {
        errors.add("username", INVALID_USERNAME);
    }

    let email = required_text(&mut errors, "email", &form.email, EMAIL_MAX_CHARS);
    if !email.is_empty() && !is_valid_email(&email) {
        errors.add("email", INVALID_EMAIL);
    }

    check_password(&mut errors, "password", &form.password, true);
    if !errors.has("password") && form.password != form.password_check {
        errors.add("password", PASSWORDS_DO_NOT_MATCH);
    }

    let avatar = optional_avatar(&mut errors, &form.avatar);

    errors.into_result(CleanedSignup {
        username,
        email,
        password: form.password.clone(),
        avatar,
    })
}

pub fn validate_login(form: &LoginForm) -> Result<CleanedLogin, FormErrors> {
    let mut errors = FormErrors::new();

    let username = form.username.trim().to_string();
    if username.is_empty() {
        errors.add("username", REQUIRED);
    }
    check_password(&mut errors, "password", &form.password, true);

    errors.into_result(CleanedLogin {
        username,
        password: form.password.clone(),
    })
}

/// Shape checks only; the current password is verified by the user service
pub fn validate_settings(form: &SettingsForm) -> Result<CleanedSettings, FormErrors> {
    let mut errors = FormErrors::new();

    if form.password.is_empty() {
        errors.add("password", REQUIRED);
    }

    let email = form.email.trim();
    let email = if email.is_empty() {
        None
    } else {
        if email.chars().count() > EMAIL_MAX_CHARS {
            errors.add("email", too_long(EMAIL_MAX_CHARS, email.chars().count()));
        } else if !is_valid_email(email) {
            errors.add("email", INVALID_EMAIL);
        }
        Some(email.to_string())
    };

    let new_password = if form.new_password.is_empty() {
        None
    } else {
        check_password(&mut errors, "new_password", &form.new_password, false);
        Some(form.new_password.clone())
    };
    if form.password_check != form.new_password {
        errors.add("password_check", PASSWORDS_DONT_MATCH);
    }

    let avatar = optional_avatar(&mut errors, &form.avatar);

    errors.into_result(CleanedSettings {
        current_password: form.password.clone(),
        email,
        avatar,
        new_password,
    })
}

/// Letters, digits and `@.+-_`
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// `local@domain.tld` with no whitespace and exactly one `@`
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn required_text(errors: &mut FormErrors, field: &str, value: &str, max_chars: usize) -> String {
    let value = value.trim();
    let len = value.chars().count();
    if len == 0 {
        errors.add(field, REQUIRED);
    } else if len > max_chars {
        errors.add(field, too_long(max_chars, len));
    }
    value.to_string()
}

fn check_password(errors: &mut FormErrors, field: &str, value: &str, required: bool) {
    let len = value.chars().count();
    if len == 0 {
        if required {
            errors.add(field, REQUIRED);
        }
    } else if len < PASSWORD_MIN_CHARS {
        errors.add(
            field,
            format!(
                "Ensure this value has at least {} characters (it has {}).",
                PASSWORD_MIN_CHARS, len
            ),
        );
    }
}

fn optional_avatar(errors: &mut FormErrors, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let len = value.chars().count();
    if len > AVATAR_MAX_CHARS {
        errors.add("avatar", too_long(AVATAR_MAX_CHARS, len));
    } else if !(value.starts_with("https://")
        || value.starts_with("http://")
        || (value.starts_with('/') && !value.starts_with("//")))
        || value.chars().any(char::is_whitespace)
    {
        errors.add("avatar", INVALID_AVATAR);
    }
    Some(value.to_string())
}

fn too_long(max: usize, len: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, len
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ask(title: &str, content: &str, tags: &str) -> AskForm {
        AskForm {
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.to_string(),
        }
    }

    fn signup(username: &str, email: &str, password: &str, check: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_check: check.to_string(),
            avatar: String::new(),
        }
    }

    #[test]
    fn test_parse_tags_trims_entries() {
        assert_eq!(parse_tags("a, b,c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(parse_tags("  rust ").unwrap(), vec!["rust"]);
    }

    #[test]
    fn test_parse_tags_rejects_more_than_three() {
        assert_eq!(parse_tags("a,b,c,d").unwrap_err(), TOO_MANY_TAGS);
    }

    #[test]
    fn test_parse_tags_rejects_duplicates_after_trimming() {
        assert_eq!(parse_tags("a,a").unwrap_err(), DUPLICATE_TAGS);
        assert_eq!(parse_tags("a, a").unwrap_err(), DUPLICATE_TAGS);
    }

    #[test]
    fn test_parse_tags_rejects_empty_entries() {
        assert_eq!(parse_tags("a,,b").unwrap_err(), EMPTY_TAG);
        assert_eq!(parse_tags("a,").unwrap_err(), EMPTY_TAG);
    }

    #[test]
    fn test_parse_tags_rejects_long_tag() {
        let long = "x".repeat(TAG_MAX_CHARS + 1);
        assert!(parse_tags(&long).is_err());
        assert!(parse_tags(&"x".repeat(TAG_MAX_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_ask_accepts_good_input() {
        let cleaned = validate_ask(&ask(" Title ", "Body", "rust, sql")).unwrap();
        assert_eq!(cleaned.title, "Title");
        assert_eq!(cleaned.tags, vec!["rust", "sql"]);
    }

    #[test]
    fn test_validate_ask_reports_every_field() {
        let errors = validate_ask(&ask("", &"x".repeat(256), "")).unwrap_err();
        assert_eq!(errors.field("title"), [REQUIRED.to_string()]);
        assert!(errors.field("content")[0].contains("at most 255"));
        assert_eq!(errors.field("tags"), [REQUIRED.to_string()]);
    }

    #[test]
    fn test_validate_ask_counts_characters_not_bytes() {
        let title = "é".repeat(TITLE_MAX_CHARS);
        assert!(validate_ask(&ask(&title, "body", "t")).is_ok());
    }

    #[test]
    fn test_validate_comment() {
        let ok = CommentForm {
            content: "  An answer  ".to_string(),
        };
        assert_eq!(validate_comment(&ok).unwrap(), "An answer");

        let empty = CommentForm {
            content: "   ".to_string(),
        };
        assert!(validate_comment(&empty).unwrap_err().has("content"));
    }

    #[test]
    fn test_validate_signup_password_mismatch() {
        let errors = validate_signup(&signup("bob", "bob@example.com", "secret", "secreT")).unwrap_err();
        assert_eq!(errors.field("password"), [PASSWORDS_DO_NOT_MATCH.to_string()]);
    }

    #[test]
    fn test_validate_signup_short_password() {
        let errors = validate_signup(&signup("bob", "bob@example.com", "abc", "abc")).unwrap_err();
        assert!(errors.field("password")[0].contains("at least 4"));
    }

    #[test]
    fn test_validate_signup_username_and_email_shape() {
        let errors = validate_signup(&signup("bad name!", "nope", "secret", "secret")).unwrap_err();
        assert_eq!(errors.field("username"), [INVALID_USERNAME.to_string()]);
        assert_eq!(errors.field("email"), [INVALID_EMAIL.to_string()]);

        let cleaned = validate_signup(&signup("b.o+b-_@x", "b@x.io", "secret", "secret")).unwrap();
        assert_eq!(cleaned.username, "b.o+b-_@x");
        assert!(cleaned.avatar.is_none());
    }

    #[test]
    fn test_validate_signup_avatar() {
        let mut form = signup("bob", "bob@example.com", "secret", "secret");
        form.avatar = "javascript:alert(1)".to_string();
        assert!(validate_signup(&form).unwrap_err().has("avatar"));

        form.avatar = "/static/avatars/bob.png".to_string();
        assert_eq!(
            validate_signup(&form).unwrap().avatar.as_deref(),
            Some("/static/avatars/bob.png")
        );
    }

    #[test]
    fn test_validate_login_requires_both_fields() {
        let errors = validate_login(&LoginForm::default()).unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_validate_settings_without_new_password() {
        let form = SettingsForm {
            password: "current".to_string(),
            email: "new@example.com".to_string(),
            ..SettingsForm::default()
        };
        let cleaned = validate_settings(&form).unwrap();
        assert_eq!(cleaned.email.as_deref(), Some("new@example.com"));
        assert!(cleaned.new_password.is_none());
        assert!(cleaned.avatar.is_none());
    }

    #[test]
    fn test_validate_settings_password_check_mismatch() {
        let form = SettingsForm {
            password: "current".to_string(),
            new_password: "fresh-pass".to_string(),
            password_check: "other-pass".to_string(),
            ..SettingsForm::default()
        };
        let errors = validate_settings(&form).unwrap_err();
        assert_eq!(errors.field("password_check"), [PASSWORDS_DONT_MATCH.to_string()]);
    }

    #[test]
    fn test_validate_settings_requires_current_password() {
        let errors = validate_settings(&SettingsForm::default()).unwrap_err();
        assert_eq!(errors.field("password"), [REQUIRED.to_string()]);
    }

    #[test]
    fn test_form_errors_serialize_for_templates() {
        let mut errors = FormErrors::single("title", REQUIRED);
        errors.add_non_field("Something went wrong");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["fields"]["title"][0], REQUIRED);
        assert_eq!(json["non_field"][0], "Something went wrong");
    }

    #[test]
    fn test_password_fields_are_not_echoed() {
        let json = serde_json::to_string(&signup("bob", "b@x.io", "secret", "secret")).unwrap();
        assert!(!json.contains("secret"));
    }

    proptest! {
        #[test]
        fn prop_up_to_three_distinct_tags_accepted(
            tags in proptest::collection::hash_set("[a-z]{1,10}", 1..=3)
        ) {
            let tags: Vec<String> = tags.into_iter().collect();
            let parsed = parse_tags(&tags.join(" , ")).unwrap();
            prop_assert_eq!(parsed, tags);
        }

        #[test]
        fn prop_more_than_three_tags_rejected(
            tags in proptest::collection::vec("[a-z]{1,10}", 4..10)
        ) {
            prop_assert_eq!(parse_tags(&tags.join(",")).unwrap_err(), TOO_MANY_TAGS);
        }

        #[test]
        fn prop_repeated_tag_rejected(tag in "[a-z]{1,10}", pad in " {0,3}") {
            let input = format!("{}{},{}{}", pad, tag, tag, pad);
            prop_assert_eq!(parse_tags(&input).unwrap_err(), DUPLICATE_TAGS);
        }
    }
}
