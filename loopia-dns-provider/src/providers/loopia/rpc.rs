//! Loopia remote store accessor

use crate::error::{ProviderError, Result};
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError, RpcTransport};
use crate::utils::log_sanitizer::truncate_for_log;
use crate::xmlrpc::{FromValue, Value};

use super::{LoopiaProvider, LoopiaRecord, SUCCESS_MARKER};

/// Remote calls of one provider operation.
///
/// Borrows the transport out of the provider's lock guard, so a session can only
/// exist while that lock is held.
pub(crate) struct LoopiaSession<'a> {
    provider: &'a LoopiaProvider,
    transport: &'a dyn RpcTransport,
}

impl<'a> LoopiaSession<'a> {
    pub fn new(provider: &'a LoopiaProvider, transport: &'a dyn RpcTransport) -> Self {
        Self {
            provider,
            transport,
        }
    }

    /// One round trip with the credentials prepended to `args`.
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        log::debug!(
            "[{}] {method} {}",
            self.provider.provider_name(),
            truncate_for_log(&format!("{args:?}"))
        );

        let credentials = &self.provider.credentials;
        let mut params = Vec::with_capacity(args.len() + 3);
        params.push(Value::from(credentials.username.as_str()));
        params.push(Value::from(credentials.password.as_str()));
        if let Some(customer) = &credentials.customer {
            params.push(Value::from(customer.as_str()));
        }
        params.extend(args);

        self.transport
            .call(method, params)
            .await
            .map_err(|e| match e {
                ProviderError::RemoteFault {
                    fault_code,
                    fault_string,
                    ..
                } => self.provider.map_fault(fault_code, fault_string),
                other => {
                    log::error!("[{}] {method} failed: {other}", self.provider.provider_name());
                    other
                }
            })
    }

    /// Call a method that answers with a list. A bare string reply is a status
    /// such as `AUTH_ERROR`.
    async fn call_for_list<T: FromValue>(
        &self,
        method: &str,
        args: Vec<Value>,
        ctx: ErrorContext,
    ) -> Result<Vec<T>> {
        match self.call(method, args).await? {
            Value::String(status) => Err(self.status_error(method, status, ctx)),
            reply => Vec::<T>::from_value(reply).map_err(|e| {
                log::error!("[{}] {method}: {e}", self.provider.provider_name());
                self.provider.parse_error(format!("{method}: {e}"))
            }),
        }
    }

    /// Call a method that answers with [`SUCCESS_MARKER`].
    async fn call_for_status(&self, method: &str, args: Vec<Value>, ctx: ErrorContext) -> Result<()> {
        match self.call(method, args).await? {
            Value::String(status) if status == SUCCESS_MARKER => Ok(()),
            Value::String(status) => Err(self.status_error(method, status, ctx)),
            other => Err(self.provider.map_error(
                RawApiError::new(format!(
                    "{method} returned {} instead of a status",
                    other.type_name()
                )),
                ctx,
            )),
        }
    }

    fn status_error(&self, method: &str, status: String, ctx: ErrorContext) -> ProviderError {
        log::error!("[{}] {method} returned {status}", self.provider.provider_name());
        let message = format!("{method} returned {status}");
        self.provider
            .map_error(RawApiError::with_code(status, message), ctx)
    }

    // ============ Operations ============

    /// `getSubdomains`
    pub async fn list_labels(&self, base_domain: &str) -> Result<Vec<String>> {
        self.call_for_list(
            "getSubdomains",
            vec![Value::from(base_domain)],
            ErrorContext::domain(base_domain),
        )
        .await
    }

    /// `getZoneRecords`
    pub async fn list_records(&self, base_domain: &str, label: &str) -> Result<Vec<LoopiaRecord>> {
        self.call_for_list(
            "getZoneRecords",
            vec![Value::from(base_domain), Value::from(label)],
            ErrorContext::label(base_domain, label),
        )
        .await
    }

    /// Records under `label`, or none if the label does not exist. Skips
    /// `getZoneRecords` for missing labels.
    pub async fn fetch_label_records(
        &self,
        base_domain: &str,
        label: &str,
    ) -> Result<Vec<LoopiaRecord>> {
        let labels = self.list_labels(base_domain).await?;
        if !labels.iter().any(|l| l == label) {
            log::debug!(
                "[{}] label '{label}' not found in {base_domain}",
                self.provider.provider_name()
            );
            return Ok(Vec::new());
        }
        self.list_records(base_domain, label).await
    }

    /// `addSubdomain`
    pub async fn create_label(&self, base_domain: &str, label: &str) -> Result<()> {
        self.call_for_status(
            "addSubdomain",
            vec![Value::from(base_domain), Value::from(label)],
            ErrorContext::label(base_domain, label),
        )
        .await
    }

    /// `addZoneRecord`
    pub async fn create_record(
        &self,
        base_domain: &str,
        label: &str,
        record: &LoopiaRecord,
    ) -> Result<()> {
        self.call_for_status(
            "addZoneRecord",
            vec![
                Value::from(base_domain),
                Value::from(label),
                record.to_value(),
            ],
            ErrorContext::label(base_domain, label),
        )
        .await
    }

    /// `updateZoneRecord`. `record.id` must identify an existing record.
    pub async fn update_record(
        &self,
        base_domain: &str,
        label: &str,
        record: &LoopiaRecord,
    ) -> Result<()> {
        if record.id <= 0 {
            return Err(ProviderError::InvalidParameter {
                provider: self.provider.provider_name().to_string(),
                param: "record_id".to_string(),
                detail: format!("cannot update record with id {}", record.id),
            });
        }
        self.call_for_status(
            "updateZoneRecord",
            vec![
                Value::from(base_domain),
                Value::from(label),
                record.to_value(),
            ],
            ErrorContext::label(base_domain, label),
        )
        .await
    }

    /// `removeZoneRecord`
    pub async fn delete_record(&self, base_domain: &str, label: &str, id: i64) -> Result<()> {
        self.call_for_status(
            "removeZoneRecord",
            vec![Value::from(base_domain), Value::from(label), Value::from(id)],
            ErrorContext::label(base_domain, label),
        )
        .await
    }

    /// `removeSubdomain`
    pub async fn delete_label(&self, base_domain: &str, label: &str) -> Result<()> {
        self.call_for_status(
            "removeSubdomain",
            vec![Value::from(base_domain), Value::from(label)],
            ErrorContext::label(base_domain, label),
        )
        .await
    }
}
