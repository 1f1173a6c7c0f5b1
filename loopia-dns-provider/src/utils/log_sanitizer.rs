//! Log sanitization utilities
//!
//! XML-RPC requests carry the account password as a positional argument and
//! responses can be large record listings, so neither is logged verbatim.

/// Maximum number of bytes to include in truncated log output.
const TRUNCATE_LIMIT: usize = 256;

/// Number of leading characters of a secret that stay visible.
const SECRET_VISIBLE_PREFIX: usize = 2;

/// MSRV-compatible replacement for `str::floor_char_boundary` (stable since 1.91.0).
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncate a string for safe logging.
///
/// Returns the original string if it's within the limit,
/// otherwise the first `TRUNCATE_LIMIT` bytes with a suffix giving the total length.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Mask a secret, keeping a short prefix so that different secrets can be told apart.
///
/// Short secrets are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars = secret.chars().count();
    if chars <= SECRET_VISIBLE_PREFIX * 4 {
        return "*".repeat(chars.max(1));
    }
    let prefix: String = secret.chars().take(SECRET_VISIBLE_PREFIX).collect();
    format!("{prefix}***")
}
