//! Parse-or-default helpers for advisor implementations.
//!
//! Advisor backends tend to wrap their JSON in prose, code fences, or
//! trailing explanations. Everything downstream of the [`crate::advisor`]
//! boundary only ever sees typed, validated results, so the lenient
//! extraction lives here and nowhere else.

use miette::Diagnostic;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while extracting structured data from free-form text.
#[derive(Debug, Error, Diagnostic)]
pub enum JsonGuardError {
    /// No complete JSON object could be located in the text.
    #[error("no JSON object found in advisor output")]
    #[diagnostic(code(studyweave::json_guard::missing_object))]
    MissingObject,

    /// A candidate object was found but did not decode into the target type.
    #[error("advisor output did not match the expected schema: {source}")]
    #[diagnostic(code(studyweave::json_guard::schema))]
    Schema {
        #[from]
        source: serde_json::Error,
    },
}

/// Strip a leading/trailing markdown code fence, if present.
#[must_use]
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Extract the first complete JSON object from `text`.
///
/// Walks the input with a brace-depth counter, honoring string literals and
/// escapes, so trailing prose after the object ("Explanation: ...") is
/// ignored rather than breaking the parse.
#[must_use]
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut quote = b'"';
    let mut escape = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match b {
                b'\\' => escape = true,
                _ if b == quote => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' | b'\'' => {
                in_string = true;
                quote = b;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode the first JSON object embedded in free-form advisor text.
pub fn decode_object<T: DeserializeOwned>(text: &str) -> Result<T, JsonGuardError> {
    let cleaned = strip_fences(text);
    let object = first_json_object(cleaned).ok_or(JsonGuardError::MissingObject)?;
    Ok(serde_json::from_str(object)?)
}

/// Decode the first JSON object, falling back to the type's default when the
/// text is unusable. The failure is logged, never surfaced.
#[must_use]
pub fn decode_or_default<T: DeserializeOwned + Default>(text: &str) -> T {
    match decode_object(text) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%error, "advisor output unusable, substituting default");
            T::default()
        }
    }
}
