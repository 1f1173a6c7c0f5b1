//! Loopia RecordProvider trait implementation

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::providers::common::{
    clean_zone, validate_batch, validate_delete_record, validate_record, validate_zone,
};
use crate::traits::RecordProvider;
use crate::types::Record;

use super::flatten::{flatten, flatten_record_set, unflatten_name, unflatten_records};
use super::reconcile::Reconciler;
use super::{LoopiaProvider, LoopiaSession, PROVIDER_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOperation {
    Append,
    Set,
    Delete,
}

impl LoopiaProvider {
    /// Validate, flatten, lock and hand the batch to the reconciler. Names in the
    /// result, including the records carried by a partial failure, are translated
    /// back into the caller's zone.
    async fn run_batch(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
        operation: BatchOperation,
    ) -> Result<Vec<Record>> {
        validate_zone(zone, PROVIDER_NAME)?;
        match operation {
            BatchOperation::Append | BatchOperation::Set => {
                validate_batch(records, PROVIDER_NAME, validate_record)?;
            }
            BatchOperation::Delete => {
                validate_batch(records, PROVIDER_NAME, validate_delete_record)?;
            }
        }

        let mut flattened = records.to_vec();
        let (host_suffix, base_domain) = flatten_record_set(zone, &mut flattened);
        log::debug!(
            "[{PROVIDER_NAME}] {operation:?} {} record(s) in {zone} (base {base_domain}, suffix '{host_suffix}')",
            flattened.len()
        );

        let transport = self.transport.lock().await;
        let session = LoopiaSession::new(self, transport.as_ref());
        let mut reconciler = Reconciler::new(&session, clean_zone(&base_domain));

        let result = match operation {
            BatchOperation::Append => reconciler.append(cancel, &flattened).await,
            BatchOperation::Set if self.experimental_set_records => {
                reconciler.set(cancel, &flattened).await
            }
            BatchOperation::Set => reconciler.set_unsupported(cancel, &flattened).await,
            BatchOperation::Delete => reconciler.delete(cancel, &flattened).await,
        };

        match result {
            Ok(mut done) => {
                unflatten_records(&host_suffix, &mut done);
                Ok(done)
            }
            Err(mut e) => {
                if let Some(applied) = e.applied_records_mut() {
                    unflatten_records(&host_suffix, applied);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RecordProvider for LoopiaProvider {
    fn id(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn get_records(&self, cancel: &CancellationToken, zone: &str) -> Result<Vec<Record>> {
        validate_zone(zone, PROVIDER_NAME)?;
        let (host_suffix, base_domain) = flatten("", zone);

        let transport = self.transport.lock().await;
        let session = LoopiaSession::new(self, transport.as_ref());
        let records = Reconciler::new(&session, clean_zone(&base_domain))
            .zone_records(cancel)
            .await?;

        if host_suffix.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| r.name.ends_with(&host_suffix))
            .map(|mut r| {
                unflatten_name(&host_suffix, &mut r);
                r
            })
            .collect())
    }

    async fn append_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        self.run_batch(cancel, zone, records, BatchOperation::Append)
            .await
    }

    async fn set_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        self.run_batch(cancel, zone, records, BatchOperation::Set)
            .await
    }

    async fn delete_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        self.run_batch(cancel, zone, records, BatchOperation::Delete)
            .await
    }
}
