//! Input validation for registration and login payloads.
//!
//! Each validator returns the list of problems it found; an empty list means
//! the value is acceptable.

const MAX_EMAIL_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;
/// bcrypt only reads the first 72 bytes of its input.
const MAX_PASSWORD_BYTES: usize = 72;
const MAX_NAME_LEN: usize = 100;

/// Basic `local@domain.tld` shape check with no whitespace.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn validate_email(email: &str) -> Vec<String> {
    let email = email.trim();
    if email.is_empty() {
        vec!["Email is required".to_string()]
    } else if email.len() > MAX_EMAIL_LEN {
        vec![format!("Email must not exceed {} characters", MAX_EMAIL_LEN)]
    } else if !looks_like_email(email) {
        vec!["Invalid email format".to_string()]
    } else {
        Vec::new()
    }
}

pub fn validate_password(password: &str) -> Vec<String> {
    let length = password.chars().count();
    let problem = if password.is_empty() {
        Some("Password is required".to_string())
    } else if length < MIN_PASSWORD_LEN {
        Some(format!("Password must be at least {} characters long", MIN_PASSWORD_LEN))
    } else if password.len() > MAX_PASSWORD_BYTES {
        Some(format!("Password must not exceed {} bytes", MAX_PASSWORD_BYTES))
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter".to_string())
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter".to_string())
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one digit".to_string())
    } else {
        None
    };
    problem.into_iter().collect()
}

pub fn validate_name(name: &str) -> Vec<String> {
    let name = name.trim();
    if name.is_empty() {
        vec!["Name is required".to_string()]
    } else if name.chars().count() > MAX_NAME_LEN {
        vec![format!("Name must not exceed {} characters", MAX_NAME_LEN)]
    } else {
        Vec::new()
    }
}

/// Validate a full registration payload, collecting every problem.
pub fn validate_registration(email: &str, password: &str, name: &str) -> Vec<String> {
    let mut errors = validate_email(email);
    errors.extend(validate_password(password));
    errors.extend(validate_name(name));
    errors
}

/// Login only needs both credentials to be present.
pub fn validate_credentials(email: &str, password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if email.trim().is_empty() {
        errors.push("Email is required".to_string());
    }
    if password.is_empty() {
        errors.push("Password is required".to_string());
    }
    errors
}
