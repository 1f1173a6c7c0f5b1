use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::types::Record;
use crate::xmlrpc::Value;

/// Raw API error (internal use)
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// Status string or fault code returned by the remote service
    pub code: Option<String>,
    /// Original error message
    pub message: String,
}

impl RawApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Error context (internal use)
/// Extra information used while mapping remote errors
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// Record or label name the call was about
    pub record_name: Option<String>,
    /// Base domain the call was about (used for `DomainNotFound`)
    pub domain: Option<String>,
}

impl ErrorContext {
    pub fn domain(domain: &str) -> Self {
        Self {
            domain: Some(domain.to_string()),
            record_name: None,
        }
    }

    pub fn label(domain: &str, label: &str) -> Self {
        Self {
            domain: Some(domain.to_string()),
            record_name: Some(label.to_string()),
        }
    }
}

/// Provider error mapping trait (internal use)
/// Maps raw remote status values onto the unified error type
pub(crate) trait ProviderErrorMapper {
    /// Provider identifier
    fn provider_name(&self) -> &'static str;

    /// Map a raw remote error onto the unified error type
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    /// Shortcut: parse error
    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// Shortcut: unknown error (fallback)
    fn unknown_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::Unknown {
            provider: self.provider_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// Request/response RPC client used by the provider.
///
/// Implementations receive the method name and the full positional argument list
/// (credentials included) and return the decoded reply. The provider never issues
/// two calls concurrently on the same transport.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Perform one round trip.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value>;
}

/// Record management on a hierarchical zone.
///
/// `zone` may be any depth (`"lcl.example.org"`) and may carry a trailing dot.
/// Record names are relative to `zone`. Every operation checks `cancel` between
/// remote calls and, once it fires, returns the records handled so far instead
/// of an error.
#[async_trait]
pub trait RecordProvider: Send + Sync {
    /// Provider identifier
    fn id(&self) -> &'static str;

    /// List all records in the zone.
    async fn get_records(&self, cancel: &CancellationToken, zone: &str) -> Result<Vec<Record>>;

    /// Add records to the zone. Records that already exist are not created again;
    /// the existing remote record is returned in their place.
    async fn append_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>>;

    /// Make the zone's records for every (name, type) pair in `records` equal to
    /// exactly those records.
    async fn set_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>>;

    /// Delete matching records. Empty `type`, `data`, zero `ttl` and missing `id`
    /// act as wildcards. Returns the records that were removed.
    async fn delete_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>>;
}
