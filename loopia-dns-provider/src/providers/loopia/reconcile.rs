//! Append/set/delete reconciliation against the flat Loopia store
//!
//! A [`Reconciler`] lives for one provider operation. It caches the remote records of
//! every label it looks at, so each label is listed at most once for lookups, and
//! it remembers which labels it created so a label is never added twice.
//!
//! Failures after the first remote write are returned as
//! [`ProviderError::PartiallyApplied`] carrying what was already done.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::providers::common::records_equal;
use crate::types::Record;

use super::{APEX_LABEL, LoopiaRecord, LoopiaSession, PROVIDER_NAME};

pub(crate) struct Reconciler<'s> {
    session: &'s LoopiaSession<'s>,
    base_domain: String,
    cache: HashMap<String, Vec<LoopiaRecord>>,
    labels_created: HashSet<String>,
}

impl<'s> Reconciler<'s> {
    /// `base_domain` must already be clean (no trailing dot).
    pub fn new(session: &'s LoopiaSession<'s>, base_domain: &str) -> Self {
        Self {
            session,
            base_domain: base_domain.to_string(),
            cache: HashMap::new(),
            labels_created: HashSet::new(),
        }
    }

    // ============ Cache ============

    async fn load(&mut self, label: &str) -> Result<()> {
        if !self.cache.contains_key(label) {
            let records = self
                .session
                .fetch_label_records(&self.base_domain, label)
                .await?;
            log::debug!(
                "[{PROVIDER_NAME}] cached {} record(s) for label '{label}'",
                records.len()
            );
            self.cache.insert(label.to_string(), records);
        }
        Ok(())
    }

    fn cached(&self, label: &str) -> &[LoopiaRecord] {
        self.cache.get(label).map_or(&[][..], Vec::as_slice)
    }

    // ============ Get ============

    /// All records of the base domain, named by their label. Stops between labels
    /// once `cancel` fires.
    pub async fn zone_records(&mut self, cancel: &CancellationToken) -> Result<Vec<Record>> {
        let labels = self.session.list_labels(&self.base_domain).await?;
        let mut records = Vec::new();
        for label in labels {
            if cancel.is_cancelled() {
                log::debug!("[{PROVIDER_NAME}] listing cancelled before label '{label}'");
                break;
            }
            let remote = self.session.list_records(&self.base_domain, &label).await?;
            records.extend(remote.iter().map(|r| r.to_record(&label)));
            self.cache.insert(label, remote);
        }
        Ok(records)
    }

    // ============ Append ============

    pub async fn append(
        &mut self,
        cancel: &CancellationToken,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        let mut applied = Vec::with_capacity(records.len());
        for record in records {
            if cancel.is_cancelled() {
                log::debug!(
                    "[{PROVIDER_NAME}] append cancelled after {} record(s)",
                    applied.len()
                );
                break;
            }
            match self.append_one(record).await {
                Ok(out) => applied.push(out),
                Err(e) => return Err(e.with_applied(applied)),
            }
        }
        Ok(applied)
    }

    async fn append_one(&mut self, record: &Record) -> Result<Record> {
        self.load(&record.name).await?;
        if let Some(existing) = self.cached(&record.name).iter().find(|r| r.matches(record)) {
            log::debug!(
                "[{PROVIDER_NAME}] identical record exists in '{}' (id {}), skipping",
                record.name,
                existing.id
            );
            return Ok(existing.to_record(&record.name));
        }
        self.create(record).await
    }

    /// Create `record`, adding its label first when needed, and return it with the
    /// id the remote store assigned.
    async fn create(&mut self, record: &Record) -> Result<Record> {
        let label = record.name.as_str();
        if self.cached(label).is_empty() && !self.labels_created.contains(label) {
            self.session.create_label(&self.base_domain, label).await?;
            self.labels_created.insert(label.to_string());
        }

        self.session
            .create_record(&self.base_domain, label, &LoopiaRecord::from_record(record, 0))
            .await?;

        let refreshed = self
            .session
            .fetch_label_records(&self.base_domain, label)
            .await?;
        let created = refreshed
            .iter()
            .find(|r| r.matches(record))
            .map(|r| r.to_record(label))
            .ok_or_else(|| ProviderError::Reconciliation {
                provider: PROVIDER_NAME.to_string(),
                detail: format!(
                    "unable to retrieve id of newly created {} record in '{label}'",
                    record.record_type
                ),
            })?;
        self.cache.insert(label.to_string(), refreshed);
        Ok(created)
    }

    // ============ Set ============

    /// Look up every label, then refuse. Used while the diff is disabled.
    pub async fn set_unsupported(
        &mut self,
        cancel: &CancellationToken,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        for record in records {
            if cancel.is_cancelled() {
                break;
            }
            self.load(&record.name).await?;
        }
        Err(ProviderError::NotImplemented {
            provider: PROVIDER_NAME.to_string(),
            operation: "SetRecords".to_string(),
        })
    }

    /// Converge every (label, type) group of `records`.
    ///
    /// Within a group, records whose data already exists are kept (their TTL is
    /// updated if it differs), the remaining inputs take over the remaining existing
    /// records in remote order, leftover inputs are created and leftover existing
    /// records are deleted.
    ///
    /// The result holds the converged input records only; deleted leftovers are
    /// logged, not returned. Every group keeps at least one record, so no label is
    /// left empty and no label cleanup runs.
    pub async fn set(
        &mut self,
        cancel: &CancellationToken,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        let mut applied = Vec::with_capacity(records.len());
        for group in group_by_label_and_type(records) {
            if cancel.is_cancelled() {
                log::debug!("[{PROVIDER_NAME}] set cancelled after {} record(s)", applied.len());
                break;
            }
            if let Err(e) = self.set_group(&group, &mut applied).await {
                return Err(e.with_applied(applied));
            }
        }
        Ok(applied)
    }

    async fn set_group(&mut self, group: &[&Record], applied: &mut Vec<Record>) -> Result<()> {
        let Some(first) = group.first() else {
            return Ok(());
        };
        let label = first.name.clone();
        let record_type = first.record_type.clone();
        self.load(&label).await?;

        let mut existing: Vec<LoopiaRecord> = self
            .cached(&label)
            .iter()
            .filter(|r| r.record_type == record_type)
            .cloned()
            .collect();

        // exact matches
        let mut pending = Vec::new();
        for &record in group {
            match existing.iter().position(|r| r.matches(record)) {
                Some(pos) => {
                    let current = existing.remove(pos);
                    applied.push(self.retune(&label, record, &current).await?);
                }
                None => pending.push(record),
            }
        }

        // pair the rest in remote order
        let mut leftovers = pending.into_iter();
        let mut stale = existing.into_iter();
        loop {
            match (leftovers.next(), stale.next()) {
                (Some(record), Some(current)) => {
                    let updated = LoopiaRecord::from_record(record, current.id);
                    self.session
                        .update_record(&self.base_domain, &label, &updated)
                        .await?;
                    applied.push(updated.to_record(&label));
                }
                (Some(record), None) => {
                    applied.push(self.create(record).await?);
                    for record in leftovers.by_ref() {
                        applied.push(self.create(record).await?);
                    }
                    break;
                }
                (None, Some(current)) => {
                    for current in std::iter::once(current).chain(stale.by_ref()) {
                        self.session
                            .delete_record(&self.base_domain, &label, current.id)
                            .await?;
                        log::debug!(
                            "[{PROVIDER_NAME}] removed surplus {record_type} record {} from '{label}'",
                            current.id
                        );
                    }
                    break;
                }
                (None, None) => break,
            }
        }
        Ok(())
    }

    /// Keep `current`, updating it in place when the TTL drifted.
    async fn retune(
        &self,
        label: &str,
        record: &Record,
        current: &LoopiaRecord,
    ) -> Result<Record> {
        let wanted = LoopiaRecord::from_record(record, current.id);
        if wanted.ttl == current.ttl {
            return Ok(current.to_record(label));
        }
        self.session
            .update_record(&self.base_domain, label, &wanted)
            .await?;
        Ok(wanted.to_record(label))
    }

    // ============ Delete ============

    /// Delete every remote record matched by one of `records`.
    ///
    /// All targets are collected before the first deletion. Labels left empty
    /// afterwards are removed on a best-effort basis.
    pub async fn delete(
        &mut self,
        cancel: &CancellationToken,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        let mut targets: Vec<(String, LoopiaRecord)> = Vec::new();
        for pattern in records {
            if cancel.is_cancelled() {
                log::debug!("[{PROVIDER_NAME}] delete cancelled while collecting targets");
                return Ok(Vec::new());
            }
            self.load(&pattern.name).await?;
            for candidate in self.cached(&pattern.name) {
                let duplicate = targets
                    .iter()
                    .any(|(label, t)| *label == pattern.name && t.id == candidate.id);
                if !duplicate && delete_matches(pattern, candidate) {
                    targets.push((pattern.name.clone(), candidate.clone()));
                }
            }
        }

        let mut removed = Vec::with_capacity(targets.len());
        let mut touched: Vec<String> = Vec::new();
        for (label, target) in targets {
            if cancel.is_cancelled() {
                log::debug!(
                    "[{PROVIDER_NAME}] delete cancelled after {} record(s)",
                    removed.len()
                );
                return Ok(removed);
            }
            if let Err(e) = self
                .session
                .delete_record(&self.base_domain, &label, target.id)
                .await
            {
                return Err(e.with_applied(removed));
            }
            removed.push(target.to_record(&label));
            if !touched.contains(&label) {
                touched.push(label);
            }
        }

        self.remove_empty_labels(&touched).await;
        Ok(removed)
    }

    async fn remove_empty_labels(&mut self, labels: &[String]) {
        for label in labels {
            if label == APEX_LABEL {
                continue;
            }
            match self
                .session
                .fetch_label_records(&self.base_domain, label)
                .await
            {
                Ok(remaining) if remaining.is_empty() => {
                    log::debug!("[{PROVIDER_NAME}] removing empty label '{label}'");
                    if let Err(e) = self.session.delete_label(&self.base_domain, label).await {
                        log::warn!("[{PROVIDER_NAME}] failed to remove empty label '{label}': {e}");
                    }
                }
                Ok(remaining) => {
                    self.cache.insert(label.clone(), remaining);
                }
                Err(e) => {
                    log::warn!("[{PROVIDER_NAME}] failed to re-list label '{label}': {e}");
                }
            }
        }
    }
}

/// Partial match for deletion: unset fields of `pattern` match anything.
fn delete_matches(pattern: &Record, candidate: &LoopiaRecord) -> bool {
    let remote = candidate.to_record(&pattern.name);
    pattern.id.is_none_or(|id| id == candidate.id)
        && (pattern.record_type.is_empty() || pattern.record_type == remote.record_type)
        && (pattern.data.is_empty() || pattern.data == remote.data)
        && (pattern.ttl.is_zero() || pattern.ttl.as_secs() == remote.ttl.as_secs())
}

/// Group by (name, type) in order of first appearance, dropping repeated
/// (name, type, data) entries.
fn group_by_label_and_type(records: &[Record]) -> Vec<Vec<&Record>> {
    let mut groups: Vec<Vec<&Record>> = Vec::new();
    for record in records {
        let group = groups.iter_mut().find(|g| {
            g.first().is_some_and(|first| {
                first.name == record.name && first.record_type == record.record_type
            })
        });
        match group {
            Some(group) if group.iter().any(|r| records_equal(r, record)) => {}
            Some(group) => group.push(record),
            None => groups.push(vec![record]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn remote(id: i64, record_type: &str, rdata: &str, ttl: u32) -> LoopiaRecord {
        LoopiaRecord {
            id,
            ttl,
            record_type: record_type.to_string(),
            rdata: rdata.to_string(),
            priority: 0,
        }
    }

    fn pattern(record_type: &str, data: &str, ttl: u64, id: Option<i64>) -> Record {
        Record {
            name: "www".to_string(),
            record_type: record_type.to_string(),
            data: data.to_string(),
            ttl: Duration::from_secs(ttl),
            id,
        }
    }

    #[test]
    fn delete_by_id_ignores_other_fields() {
        let candidate = remote(7, "TXT", "\"hello\"", 300);
        assert!(delete_matches(&pattern("", "", 0, Some(7)), &candidate));
        assert!(!delete_matches(&pattern("", "", 0, Some(8)), &candidate));
    }

    #[test]
    fn delete_by_id_and_mismatched_type_matches_nothing() {
        let candidate = remote(7, "TXT", "hello", 300);
        assert!(!delete_matches(&pattern("A", "", 0, Some(7)), &candidate));
        assert!(delete_matches(&pattern("TXT", "", 0, Some(7)), &candidate));
    }

    #[test]
    fn delete_wildcards_on_data_and_ttl() {
        let candidate = remote(7, "TXT", "\"hello\"", 300);
        assert!(delete_matches(&pattern("TXT", "hello", 0, None), &candidate));
        assert!(delete_matches(&pattern("TXT", "", 300, None), &candidate));
        assert!(!delete_matches(&pattern("TXT", "bye", 0, None), &candidate));
        assert!(!delete_matches(&pattern("TXT", "", 60, None), &candidate));
    }

    #[test]
    fn grouping_keeps_order_and_drops_duplicates() {
        let a1 = Record::new("www", "A", "192.0.2.1", Duration::from_secs(60));
        let a2 = Record::new("www", "A", "192.0.2.2", Duration::from_secs(60));
        let txt = Record::new("www", "TXT", "v", Duration::from_secs(60));
        let other = Record::new("api", "A", "192.0.2.1", Duration::from_secs(60));
        let records = vec![a1.clone(), txt.clone(), a1.clone(), other.clone(), a2.clone()];

        let groups = group_by_label_and_type(&records);
        let names: Vec<Vec<&str>> = groups
            .iter()
            .map(|g| g.iter().map(|r| r.data.as_str()).collect())
            .collect();
        assert_eq!(
            names,
            vec![vec!["192.0.2.1", "192.0.2.2"], vec!["v"], vec!["192.0.2.1"]]
        );
        assert_eq!(groups[2][0].name, "api");
    }
}
