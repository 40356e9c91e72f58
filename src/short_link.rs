use crate::{
    constants::{RECIPE_NOT_FOUND, SHORT_LINK_PREFIX},
    Error, HtmlError,
};

/// Lowercase hexadecimal without padding or prefix.
pub fn encode(id: u64) -> String {
    format!("{:x}", id)
}

/// Parses a token produced by [`encode`]. Links shared before the hex format
/// settled may still carry a `0x` prefix, so it is accepted. Hex that does
/// not fit in a u64 names no recipe and is a 404.
pub fn decode(token: &str) -> Result<u64, Error> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HtmlError::InvalidRequest.new("Invalid short link"));
    }

    u64::from_str_radix(digits, 16).map_err(|_| HtmlError::NotFound.new(RECIPE_NOT_FOUND))
}

/// Absolute short URL for a recipe, e.g. `https://host/s/1f/`.
pub fn short_url(origin: &str, id: u64) -> String {
    format!(
        "{}{}{}/",
        origin.trim_end_matches('/'),
        SHORT_LINK_PREFIX,
        encode(id)
    )
}
