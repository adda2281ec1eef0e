use serde::de::{DeserializeOwned, IgnoredAny};
use thiserror::Error;

use crate::error::AiError;

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("model returned an empty response")]
    Empty,

    #[error("no JSON object or array found in model response")]
    NoJson,

    #[error("JSON in model response starts with '{0}' but is never closed")]
    Unterminated(char),
}

/// Pull the JSON payload out of free-form model text.
///
/// Tries, in order:
/// 1. the whole response, when it starts with `{` or `[` and is valid JSON
/// 2. the first fenced code block (```` ```json ```` or bare ```` ``` ````)
/// 3. a scan from the first `{`/`[` to the last matching `}`/`]`
///
/// Slices from steps 2 and 3 are not validated as JSON; that is left to the
/// caller's deserializer so the error can name the field that was wrong.
pub fn extract_json(response: &str) -> Result<&str, ExtractError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::Empty);
    }

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<IgnoredAny>(trimmed).is_ok()
    {
        return Ok(trimmed);
    }

    if let Some(block) = fenced_block(trimmed) {
        if block.starts_with('{') || block.starts_with('[') {
            return Ok(block);
        }
    }

    bracket_scan(trimmed)
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the language tag (```json, ```JSON, ```javascript ...) up to the newline.
    let body_start = match after_fence.find('\n') {
        Some(nl) if after_fence[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => nl + 1,
        _ => 0,
    };
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    let block = body[..close].trim();
    if block.is_empty() {
        None
    } else {
        Some(block)
    }
}

fn bracket_scan(text: &str) -> Result<&str, ExtractError> {
    let start = text.find(['{', '[']).ok_or(ExtractError::NoJson)?;
    let opener = text[start..].chars().next().ok_or(ExtractError::NoJson)?;
    let closer = if opener == '{' { '}' } else { ']' };

    match text.rfind(closer) {
        Some(end) if end > start => Ok(&text[start..=end]),
        _ => Err(ExtractError::Unterminated(opener)),
    }
}

/// Extract and deserialize JSON from model output in one step.
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T, AiError> {
    let json = extract_json(response)?;
    serde_json::from_str(json)
        .map_err(|e| AiError::BadResponse(format!("could not parse model JSON: {e}")))
}
