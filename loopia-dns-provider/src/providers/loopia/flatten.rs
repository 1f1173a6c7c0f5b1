//! Mapping between hierarchical zones and Loopia's flat namespace
//!
//! Loopia only knows `domain.tld` zones with single-label subdomains. A zone such as
//! `lcl.example.org` is therefore stored as base domain `example.org` and the extra
//! hierarchy is folded into the label: `www` in `lcl.example.org` becomes label
//! `www.lcl` in `example.org`.
//!
//! A zone written with a trailing dot keeps it, so `example.org.` still counts as
//! two components.

use crate::types::Record;

/// Number of zone components Loopia accepts as a base domain.
const BASE_COMPONENTS: usize = 2;

/// Map `(name, zone)` to Loopia's `(label, base_domain)`.
///
/// Excess leading zone components are appended to `name`. An empty `name` yields
/// a label starting with a dot (`""` in `lcl.example.org` is `".lcl"`).
pub fn flatten(name: &str, zone: &str) -> (String, String) {
    let components: Vec<&str> = zone.split('.').collect();
    let required = match components.last() {
        Some(last) if last.is_empty() => BASE_COMPONENTS + 1,
        _ => BASE_COMPONENTS,
    };

    if components.len() <= required {
        return (name.to_string(), zone.to_string());
    }

    let (excess, base) = components.split_at(components.len() - required);
    (
        format!("{name}.{}", excess.join(".")),
        base.join("."),
    )
}

/// Inverse of [`flatten`]: keep the first label component as the name and move
/// the rest in front of `zone`.
pub fn unflatten(name: &str, zone: &str) -> (String, String) {
    match name.split_once('.') {
        Some((label, rest)) => (label.to_string(), format!("{rest}.{zone}")),
        None => (name.to_string(), zone.to_string()),
    }
}

/// Flatten a whole batch onto one base domain.
///
/// Returns `(host_suffix, base_domain)` and appends `host_suffix` to every record
/// name in place.
pub fn flatten_record_set(zone: &str, records: &mut [Record]) -> (String, String) {
    let (host_suffix, base_domain) = flatten("", zone);
    if !host_suffix.is_empty() {
        for record in records.iter_mut() {
            record.name.push_str(&host_suffix);
        }
    }
    (host_suffix, base_domain)
}

/// Strip `host_suffix` from the end of the record name, if present.
pub fn unflatten_name(host_suffix: &str, record: &mut Record) {
    if host_suffix.is_empty() {
        return;
    }
    if let Some(stripped) = record.name.strip_suffix(host_suffix) {
        record.name = stripped.to_string();
    }
}

/// [`unflatten_name`] applied to every record.
pub fn unflatten_records(host_suffix: &str, records: &mut [Record]) {
    for record in records.iter_mut() {
        unflatten_name(host_suffix, record);
    }
}
