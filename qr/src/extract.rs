use url::Url;

use crate::error::ExtractError;
use crate::pattern::CodePattern;

/// Query parameters that may carry a code, in priority order.
pub const CODE_QUERY_KEYS: [&str; 3] = ["qr", "qr_code", "code"];

/// Longest code text accepted. Matches the width of the `code` column.
pub const MAX_CODE_LEN: usize = 64;

/// Normalises scanned or typed text into a candidate attendance code.
///
/// In order:
/// 1. trimmed text matching the code pattern is returned upper-cased;
/// 2. text that parses as a URL yields the first non-empty `qr`, `qr_code` or `code`
///    query parameter (upper-cased if it matches the pattern, otherwise returned as-is),
///    then a pattern match inside the path;
/// 3. anything else is returned trimmed, as a literal code.
///
/// Whether the candidate exists is for the validator to decide.
pub fn extract_code(raw: &str, pattern: &CodePattern) -> Result<String, ExtractError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }

    let candidate = if pattern.is_direct(text) {
        text.to_ascii_uppercase()
    } else {
        match Url::parse(text) {
            Ok(url) => from_url(&url, pattern)?,
            Err(_) => text.to_owned(),
        }
    };

    if candidate.len() > MAX_CODE_LEN {
        return Err(ExtractError::TooLong { max: MAX_CODE_LEN });
    }
    Ok(candidate)
}

fn from_url(url: &Url, pattern: &CodePattern) -> Result<String, ExtractError> {
    for key in CODE_QUERY_KEYS {
        let value = url
            .query_pairs()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_owned());

        if let Some(value) = value {
            if pattern.is_direct(&value) {
                return Ok(value.to_ascii_uppercase());
            }
            return Ok(value);
        }
    }

    pattern.find_in(url.path()).ok_or(ExtractError::NoCodeInUrl)
}
