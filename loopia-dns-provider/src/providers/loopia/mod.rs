//! Loopia Provider

mod error;
pub mod flatten;
mod provider;
mod reconcile;
mod rpc;
mod types;

use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{ProviderError, Result};
use crate::http_client::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, XmlRpcHttpTransport,
};
use crate::traits::RpcTransport;
use crate::types::ProviderCredentials;

pub(crate) use rpc::LoopiaSession;
pub(crate) use types::LoopiaRecord;

/// Loopia XML-RPC endpoint
pub const LOOPIA_API_URL: &str = "https://api.loopia.se/RPCSERV";
/// Status string returned by successful write calls
pub(crate) const SUCCESS_MARKER: &str = "OK";
/// Label holding the records of the base domain itself
pub(crate) const APEX_LABEL: &str = "@";
pub(crate) const PROVIDER_NAME: &str = "loopia";

/// Loopia Provider
///
/// All remote calls of one public operation run under a single lock on the
/// transport, so concurrent operations on the same provider never interleave.
/// Separate providers do not share anything.
pub struct LoopiaProvider {
    pub(crate) credentials: ProviderCredentials,
    pub(crate) transport: Mutex<Box<dyn RpcTransport>>,
    pub(crate) experimental_set_records: bool,
}

/// Loopia Provider Builder
pub struct LoopiaProviderBuilder {
    credentials: ProviderCredentials,
    endpoint: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    transport: Option<Box<dyn RpcTransport>>,
    experimental_set_records: bool,
}

impl LoopiaProviderBuilder {
    fn new(credentials: ProviderCredentials) -> Self {
        Self {
            credentials,
            endpoint: LOOPIA_API_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            transport: None,
            experimental_set_records: false,
        }
    }

    /// XML-RPC endpoint of the bundled HTTP transport.
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Use `transport` instead of the bundled HTTP transport. Endpoint and
    /// timeouts are ignored in that case.
    #[must_use]
    pub fn transport(mut self, transport: impl RpcTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Enable the create/update/delete diff behind `set_records`. When disabled,
    /// `set_records` performs its lookups and then fails with `NotImplemented`.
    ///
    /// Surplus records removed by the diff are not part of the returned list. Labels
    /// are never removed by `set_records`, since each (name, type) pair in the input
    /// keeps at least one record.
    #[must_use]
    pub fn experimental_set_records(mut self, enabled: bool) -> Self {
        self.experimental_set_records = enabled;
        self
    }

    pub fn build(self) -> Result<LoopiaProvider> {
        self.credentials
            .validate()
            .map_err(|e| ProviderError::InvalidParameter {
                provider: PROVIDER_NAME.to_string(),
                param: "credentials".to_string(),
                detail: e.to_string(),
            })?;

        let transport: Box<dyn RpcTransport> = match self.transport {
            Some(transport) => transport,
            None => Box::new(XmlRpcHttpTransport::with_timeouts(
                self.endpoint,
                self.connect_timeout,
                self.request_timeout,
            )?),
        };

        Ok(LoopiaProvider {
            credentials: self.credentials,
            transport: Mutex::new(transport),
            experimental_set_records: self.experimental_set_records,
        })
    }
}

impl LoopiaProvider {
    pub fn new(credentials: ProviderCredentials) -> Result<Self> {
        Self::builder(credentials).build()
    }

    pub fn builder(credentials: ProviderCredentials) -> LoopiaProviderBuilder {
        LoopiaProviderBuilder::new(credentials)
    }
}

impl std::fmt::Debug for LoopiaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopiaProvider")
            .field("credentials", &self.credentials)
            .field("experimental_set_records", &self.experimental_set_records)
            .finish_non_exhaustive()
    }
}
