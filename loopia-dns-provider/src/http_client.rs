//! HTTP transport for XML-RPC calls
//!
//! [`HttpUtils`] owns the generic request flow (send, log, map transport failures,
//! read body). [`XmlRpcHttpTransport`] layers XML-RPC encoding and decoding on top
//! and is the default [`RpcTransport`] of the Loopia provider.
//!
//! # design principles
//! - **No retry** - a replayed `addZoneRecord` creates a duplicate record, so every
//!   failure is terminal for the call that hit it
//! - **Decode at the boundary** - callers only ever see a decoded [`Value`] or a
//!   [`ProviderError`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};

use crate::error::{ProviderError, Result};
use crate::traits::RpcTransport;
use crate::utils::log_sanitizer::truncate_for_log;
use crate::xmlrpc::{self, Value, XmlRpcError};

/// Default connect timeout (seconds)
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default request timeout (seconds)
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const PROVIDER_NAME: &str = "loopia";

/// Create an HTTP client with timeout configuration.
pub(crate) fn create_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ProviderError::NetworkError {
            provider: PROVIDER_NAME.to_string(),
            detail: format!("Failed to create HTTP client: {e}"),
        })
}

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns response text
    ///
    /// Unified processing: sending requests, logging, error handling
    ///
    /// # Arguments
    /// * `request_builder` - configured request constructor (URL, headers, body)
    /// * `provider_name` - Provider name (for logging)
    /// * `method_name` - HTTP method (for logging)
    /// * `url_or_action` - URL or RPC method name (for logging)
    ///
    /// # Returns
    /// * `Ok((status_code, response_text))` - status code and response text on success
    /// * `Err(ProviderError::Timeout | NetworkError | RateLimited)` - transport failure
    pub async fn execute_request(
        request_builder: RequestBuilder,
        provider_name: &str,
        method_name: &str,
        url_or_action: &str,
    ) -> Result<(u16, String)> {
        log::debug!("[{provider_name}] {method_name} {url_or_action}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: provider_name.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ProviderError::NetworkError {
                    provider: provider_name.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{provider_name}] Response Status: {status_code}");

        if status_code == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Rate limited (HTTP 429)");
            return Err(ProviderError::RateLimited {
                provider: provider_name.to_string(),
                raw_message: Some(truncate_for_log(&body)),
            });
        }

        if !(200..300).contains(&status_code) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Server error (HTTP {status_code})");
            return Err(ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("HTTP {status_code}: {}", truncate_for_log(&body)),
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        log::debug!(
            "[{provider_name}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    /// Decode an XML-RPC response body
    ///
    /// Faults become [`ProviderError::RemoteFault`]; anything else that fails to
    /// decode becomes [`ProviderError::ParseError`].
    pub fn parse_xmlrpc(response_text: &str, provider_name: &str) -> Result<Value> {
        xmlrpc::decode_response(response_text).map_err(|e| match e {
            XmlRpcError::Fault { code, message } => {
                log::warn!("[{provider_name}] XML-RPC fault {code}: {message}");
                ProviderError::RemoteFault {
                    provider: provider_name.to_string(),
                    fault_code: code,
                    fault_string: message,
                }
            }
            other => {
                log::error!("[{provider_name}] XML-RPC parse failed: {other}");
                log::error!(
                    "[{provider_name}] Raw response: {}",
                    truncate_for_log(response_text)
                );
                ProviderError::ParseError {
                    provider: provider_name.to_string(),
                    detail: other.to_string(),
                }
            }
        })
    }
}

/// [`RpcTransport`] speaking XML-RPC over HTTP(S) with reqwest.
#[derive(Debug, Clone)]
pub struct XmlRpcHttpTransport {
    client: Client,
    endpoint: String,
}

impl XmlRpcHttpTransport {
    /// Transport with the default timeouts (10 s connect, 30 s request).
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(
            endpoint,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Transport with explicit timeouts.
    pub fn with_timeouts(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: create_http_client(connect_timeout, request_timeout)?,
            endpoint: endpoint.into(),
        })
    }

    /// URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RpcTransport for XmlRpcHttpTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let body =
            xmlrpc::encode_call(method, &params).map_err(|e| ProviderError::SerializationError {
                provider: PROVIDER_NAME.to_string(),
                detail: e.to_string(),
            })?;

        let request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body);

        let (_status, response_text) =
            HttpUtils::execute_request(request, PROVIDER_NAME, "POST", method).await?;

        HttpUtils::parse_xmlrpc(&response_text, PROVIDER_NAME)
    }
}
