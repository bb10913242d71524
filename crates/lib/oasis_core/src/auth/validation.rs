//! Input rules shared by the session service and the HTTP layer.

use super::AuthError;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Display-name length bounds, in characters.
pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 50;

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let invalid = || AuthError::Validation("Invalid email address".into());
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

/// At least eight characters with a lowercase letter, an uppercase letter and a digit.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(AuthError::Validation(
            "Password must contain uppercase and lowercase letters and a digit".into(),
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), AuthError> {
    let len = name.trim().chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(AuthError::Validation(format!(
            "Name must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Absolute `http`/`https` URL.
pub fn validate_avatar_url(avatar: &str) -> Result<(), AuthError> {
    match url::Url::parse(avatar) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(AuthError::Validation("Invalid avatar URL".into())),
    }
}

/// Reject empty or whitespace-only values.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("  alice@example.com ").is_ok());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("alice.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("al ice@example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn password_policy() {
        assert!(validate_password("Passw0rd1").is_ok());
        assert!(validate_password("Pa1").is_err());
        assert!(validate_password("password1").is_err());
        assert!(validate_password("PASSWORD1").is_err());
        assert!(validate_password("Password").is_err());
    }

    #[test]
    fn name_bounds() {
        assert!(validate_name("Al").is_ok());
        assert!(validate_name("A").is_err());
        assert!(validate_name(&"x".repeat(51)).is_err());
        assert!(validate_name("灵感").is_ok());
    }

    #[test]
    fn avatar_must_be_http_url() {
        assert!(validate_avatar_url("https://img.example.com/a.png").is_ok());
        assert!(validate_avatar_url("ftp://img.example.com/a.png").is_err());
        assert!(validate_avatar_url("not a url").is_err());
    }

    #[test]
    fn non_empty() {
        assert!(require_non_empty("token", "abc").is_ok());
        assert!(matches!(
            require_non_empty("token", "  "),
            Err(AuthError::Validation(msg)) if msg == "token is required"
        ));
    }
}
