use aliri_braid::braid;
use std::fmt;

/// A raw bearer token as read from the ambient credential store
///
/// Three dot-separated segments (header, claims, signature). The token is
/// compared by exact string identity and never mutated by this crate; the
/// source of truth for the current token lives with the credential store.
///
/// [`Debug`][RawTokenRef#impl-Debug] and [`Display`][RawTokenRef#impl-Display]
/// mask the value to prevent unintentional disclosure in logs.
#[braid(serde, debug = "owned", display = "owned")]
pub struct RawToken;

impl fmt::Debug for RawTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            reveal_prefix(&self.0, &mut *f, 15)?;
            f.write_str("\"")
        } else {
            f.write_str("***RAW TOKEN***")
        }
    }
}

impl fmt::Display for RawTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            reveal_prefix(&self.0, &mut *f, usize::MAX)
        } else {
            f.write_str("***RAW TOKEN***")
        }
    }
}

/// Writes at most `default_len` characters of `unprotected`; when the value
/// is longer, the final slot is spent on an ellipsis. An explicit format
/// width overrides the limit.
fn reveal_prefix(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let limit = f.width().unwrap_or(default_len);
    if limit >= unprotected.len() {
        return f.write_str(unprotected);
    }

    let keep = unprotected
        .char_indices()
        .nth(limit.saturating_sub(1))
        .map_or(0, |(idx, _)| idx);
    f.write_str(&unprotected[..keep])?;
    f.write_str("…")
}

/// The identifier of an authenticated subject
#[braid(serde)]
pub struct SubjectId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_masks_token_value() {
        let token = RawToken::from_static("header.claims.signature");
        assert_eq!(format!("{:?}", token), "***RAW TOKEN***");
    }

    #[test]
    fn alternate_debug_reveals_limited_prefix() {
        let token = RawToken::from_static("header.claims.signature");
        assert_eq!(format!("{:#?}", token), "\"header.claims.…\"");
    }

    #[test]
    fn explicit_width_overrides_the_reveal_limit() {
        let token = RawToken::from_static("header.claims.signature");
        assert_eq!(format!("{:#8?}", token), "\"header.…\"");
    }

    #[test]
    fn alternate_display_reveals_full_value() {
        let token = RawToken::from_static("header.claims.signature");
        assert_eq!(format!("{:#}", token), "header.claims.signature");
    }
}
