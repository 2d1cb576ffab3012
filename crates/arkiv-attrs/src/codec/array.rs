//! Token array encoding: `[en,de]`.

use crate::error::CodecError;

const RESERVED: [char; 3] = [',', '[', ']'];

/// True if `s` has the bracket shape of an encoded array.
///
/// Used to decide how an unpostfixed string is read; it says nothing about
/// whether the elements are well formed.
pub fn has_array_shape(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('[') && s.ends_with(']')
}

/// Encodes tokens as `[a,b,c]`.
///
/// Tokens must be non-empty, free of surrounding whitespace, and must not
/// contain `,`, `[` or `]`, so that decoding yields the same tokens back.
pub fn encode_array(tokens: &[String]) -> Result<String, CodecError> {
    for token in tokens {
        if token.is_empty() || token.trim() != token || token.contains(RESERVED) {
            return Err(CodecError::InvalidToken { token: token.clone() });
        }
    }
    Ok(format!("[{}]", tokens.join(",")))
}

/// Decodes `[a, b ,c]` into trimmed tokens.
pub fn decode_array(s: &str) -> Result<Vec<String>, CodecError> {
    if !has_array_shape(s) {
        return Err(CodecError::MalformedArray { value: s.to_string() });
    }
    let inner = &s[1..s.len() - 1];
    if inner.contains(['[', ']']) {
        return Err(CodecError::MalformedArray { value: s.to_string() });
    }
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .enumerate()
        .map(|(index, raw)| {
            let token = raw.trim();
            if token.is_empty() {
                Err(CodecError::EmptyToken { index })
            } else {
                Ok(token.to_string())
            }
        })
        .collect()
}
