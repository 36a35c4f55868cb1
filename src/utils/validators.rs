use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

pub fn validate_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn sanitize_string(input: &str) -> String {
    input.trim().to_string()
}

/// Rozdělí seznam e-mailů oddělených středníkem, jak je zadává správce.
pub fn split_email_list(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(sanitize_string)
        .filter(|email| !email.is_empty())
        .collect()
}
