//! Payload checks that run before any store access.

use crate::codes::CODE_LEN;
use crate::error::{Result, ServiceError};

pub const MAX_NICKNAME_LEN: usize = 100;
pub const MAX_CHAT_NAME_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 4000;

pub fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| ServiceError::invalid(format!("{field} is required")))
}

/// Strips spaces, dashes and parentheses; what remains must be an optional
/// leading `+` followed by 5 to 15 digits.
pub fn phone(raw: &str) -> Result<String> {
    let normalized: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = normalized.strip_prefix('+').unwrap_or(&normalized);

    if normalized.is_empty() {
        return Err(ServiceError::invalid("phone is required"));
    }
    if !(5..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::invalid(format!("malformed phone number: {raw}")));
    }
    Ok(normalized)
}

pub fn code(raw: &str) -> Result<String> {
    let code = raw.trim();
    if code.len() != CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::invalid("code must be 6 digits"));
    }
    Ok(code.to_string())
}

pub fn nickname(raw: &str) -> Result<String> {
    let nickname = raw.trim();
    if nickname.is_empty() {
        return Err(ServiceError::invalid("nickname is required"));
    }
    if nickname.chars().count() > MAX_NICKNAME_LEN {
        return Err(ServiceError::invalid("nickname is too long"));
    }
    Ok(nickname.to_string())
}

/// 3 to 20 characters of latin letters, digits and underscore.
pub fn username(raw: &str) -> Result<String> {
    let username = raw.trim();
    let valid = (3..=20).contains(&username.len())
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return Err(ServiceError::invalid(
            "username must be 3-20 characters of letters, digits and _",
        ));
    }
    Ok(username.to_string())
}

/// Trimmed chat name; blank means no name.
pub fn chat_name(raw: Option<&str>) -> Result<Option<String>> {
    let Some(name) = raw.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_CHAT_NAME_LEN {
        return Err(ServiceError::invalid("chat name is too long"));
    }
    Ok(Some(name.to_string()))
}

pub fn message_text(raw: &str) -> Result<&str> {
    if raw.trim().is_empty() {
        return Err(ServiceError::invalid("text is required"));
    }
    if raw.chars().count() > MAX_MESSAGE_LEN {
        return Err(ServiceError::invalid("message is too long"));
    }
    Ok(raw)
}
