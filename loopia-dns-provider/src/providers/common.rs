//! Provider common utility functions

use std::time::Duration;

use crate::error::{ProviderError, Result};
use crate::types::Record;

/// Longest TTL the remote store accepts (8 days).
pub const MAX_TTL: Duration = Duration::from_secs(8 * 24 * 60 * 60);

/// Shortest zone string accepted (`"a.se"`).
const MIN_ZONE_LEN: usize = 4;

// ============ Zone name handling ============

/// Remove the trailing dot of a zone name.
pub fn clean_zone(zone: &str) -> &str {
    zone.strip_suffix('.').unwrap_or(zone)
}

/// Reject empty or implausibly short zone strings.
pub fn validate_zone(zone: &str, provider: &str) -> Result<()> {
    if zone.len() < MIN_ZONE_LEN {
        return Err(ProviderError::InvalidParameter {
            provider: provider.to_string(),
            param: "zone".to_string(),
            detail: format!("invalid zone '{zone}'"),
        });
    }
    Ok(())
}

// ============ Record validation ============

fn invalid_record(provider: &str, index: usize, detail: &str) -> ProviderError {
    ProviderError::InvalidParameter {
        provider: provider.to_string(),
        param: format!("records[{index}]"),
        detail: detail.to_string(),
    }
}

fn validate_ttl(record: &Record, index: usize, provider: &str) -> Result<()> {
    if record.ttl > MAX_TTL {
        return Err(invalid_record(provider, index, "ttl exceeds 8 days"));
    }
    Ok(())
}

/// Validate a record that is about to be written (append/set).
pub fn validate_record(record: &Record, index: usize, provider: &str) -> Result<()> {
    if record.name.is_empty() {
        return Err(invalid_record(provider, index, "name must not be empty"));
    }
    if record.record_type.is_empty() {
        return Err(invalid_record(provider, index, "type must not be empty"));
    }
    if record.data.is_empty() {
        return Err(invalid_record(provider, index, "data must not be empty"));
    }
    validate_ttl(record, index, provider)
}

/// Validate a deletion pattern.
///
/// Only `name` is mandatory, but a pattern must narrow the match by at least one of
/// `id`, `type`, `data` or a non-zero `ttl`.
pub fn validate_delete_record(record: &Record, index: usize, provider: &str) -> Result<()> {
    if record.name.is_empty() {
        return Err(invalid_record(provider, index, "name must not be empty"));
    }
    if record.id.is_some_and(|id| id <= 0) {
        return Err(invalid_record(provider, index, "id must be positive"));
    }
    let narrowed = record.id.is_some()
        || !record.record_type.is_empty()
        || !record.data.is_empty()
        || !record.ttl.is_zero();
    if !narrowed {
        return Err(invalid_record(
            provider,
            index,
            "one of id, type, data or ttl is required",
        ));
    }
    validate_ttl(record, index, provider)
}

/// Validate a whole batch before anything is sent.
pub fn validate_batch(
    records: &[Record],
    provider: &str,
    validate: fn(&Record, usize, &str) -> Result<()>,
) -> Result<()> {
    if records.is_empty() {
        return Err(ProviderError::InvalidParameter {
            provider: provider.to_string(),
            param: "records".to_string(),
            detail: "records must not be empty".to_string(),
        });
    }
    records
        .iter()
        .enumerate()
        .try_for_each(|(index, record)| validate(record, index, provider))
}

// ============ Record equality ============

/// Equality used for reconciliation: name, type and data. TTL and id are ignored.
pub fn records_equal(a: &Record, b: &Record) -> bool {
    a.name == b.name && a.record_type == b.record_type && a.data == b.data
}
