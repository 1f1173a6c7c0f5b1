//! Utility modules.

/// Log sanitization utilities to keep credentials and large payloads out of logs.
pub mod log_sanitizer;
