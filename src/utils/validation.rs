use std::sync::LazyLock;

use regex::Regex;

use crate::api::schema::user::UserRequest;
use crate::error::AppError;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// 至少 8 个字符，且包含大写字母、小写字母和数字
pub fn is_strong_password(password: &str) -> bool {
    let (mut upper, mut lower, mut digit) = (false, false, false);
    for c in password.chars() {
        upper |= c.is_uppercase();
        lower |= c.is_lowercase();
        digit |= c.is_ascii_digit();
    }
    password.chars().count() >= 8 && upper && lower && digit
}

/// 按 name、email、password 的顺序校验，返回第一个错误
pub fn validate_user(req: &UserRequest) -> Result<(), AppError> {
    let fail = |msg: &str| Err(AppError::Validation(msg.to_string()));

    if req.name.is_empty() {
        return fail("name is required");
    }
    if req.name.chars().count() < 3 {
        return fail("name should be at least 3 characters long");
    }
    if req.email.is_empty() {
        return fail("email is required");
    }
    if !is_valid_email(&req.email) {
        return fail("invalid email format");
    }
    if req.password.is_empty() {
        return fail("password is required");
    }
    if !is_strong_password(&req.password) {
        return fail(
            "password must be at least 8 characters long, contain at least one uppercase letter, one lowercase letter, and one digit",
        );
    }
    Ok(())
}
