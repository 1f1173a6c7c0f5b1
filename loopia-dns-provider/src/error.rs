use serde::{Deserialize, Serialize};

use crate::types::Record;

/// Unified error type for all Loopia provider operations.
///
/// Each variant includes a `provider` field identifying which provider produced the error,
/// plus variant-specific context. All variants are serializable for structured error reporting.
///
/// Use [`kind()`](Self::kind) to classify an error without matching on every variant.
///
/// # Partial results
///
/// Batch operations that fail after some remote writes already went through return
/// [`PartiallyApplied`](Self::PartiallyApplied), which carries the records that were
/// applied before the failure. Nothing is rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    NetworkError {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The provided credentials were rejected by the API.
    InvalidCredentials {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// The API rate limit has been exceeded.
    RateLimited {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// The zone is not registered on the account.
    DomainNotFound {
        /// Provider that produced the error.
        provider: String,
        /// Domain name that was not found.
        domain: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// An input failed validation before any remote call was made.
    InvalidParameter {
        /// Provider that produced the error.
        provider: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// The remote service answered with an XML-RPC fault.
    RemoteFault {
        /// Provider that produced the error.
        provider: String,
        /// `faultCode` member of the fault struct.
        fault_code: i64,
        /// `faultString` member of the fault struct.
        fault_string: String,
    },

    /// The response could not be decoded.
    ParseError {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The request could not be encoded.
    SerializationError {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The remote store is in a state the reconciliation engine cannot make sense of,
    /// e.g. a record that was just created cannot be found again.
    Reconciliation {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The requested operation is not available.
    NotImplemented {
        /// Provider that produced the error.
        provider: String,
        /// Name of the operation.
        operation: String,
    },

    /// A batch failed after some of its records were already applied remotely.
    PartiallyApplied {
        /// Provider that produced the error.
        provider: String,
        /// Records that were applied before the failure.
        applied: Vec<Record>,
        /// The failure that stopped the batch.
        source: Box<ProviderError>,
    },

    /// Fallback for unrecognized remote status values.
    Unknown {
        /// Provider that produced the error.
        provider: String,
        /// Original status or error code from the provider API.
        raw_code: Option<String>,
        /// Original error message.
        raw_message: String,
    },
}

/// Coarse classification of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before any remote side effect.
    Validation,
    /// The RPC round trip itself failed (network, timeout, encoding, decoding).
    Transport,
    /// The RPC succeeded but the service reported a failure.
    Remote,
    /// The remote store ended up in an inconsistent observable state.
    Reconciliation,
    /// The operation is not available.
    NotImplemented,
}

impl ProviderError {
    /// Classify the error. [`PartiallyApplied`](Self::PartiallyApplied) reports the kind
    /// of its underlying failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. } => ErrorKind::Validation,
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::ParseError { .. }
            | Self::SerializationError { .. } => ErrorKind::Transport,
            Self::InvalidCredentials { .. }
            | Self::RateLimited { .. }
            | Self::DomainNotFound { .. }
            | Self::RemoteFault { .. }
            | Self::Unknown { .. } => ErrorKind::Remote,
            Self::Reconciliation { .. } => ErrorKind::Reconciliation,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::PartiallyApplied { source, .. } => source.kind(),
        }
    }

    /// Records that were applied remotely before this error stopped the batch.
    pub fn applied_records(&self) -> &[Record] {
        match self {
            Self::PartiallyApplied { applied, .. } => applied,
            _ => &[],
        }
    }

    /// Attach the records applied so far. Returns `self` unchanged when nothing was applied.
    pub(crate) fn with_applied(self, applied: Vec<Record>) -> Self {
        if applied.is_empty() {
            return self;
        }
        match self {
            Self::PartiallyApplied {
                provider,
                applied: mut earlier,
                source,
            } => {
                earlier.extend(applied);
                Self::PartiallyApplied {
                    provider,
                    applied: earlier,
                    source,
                }
            }
            other => Self::PartiallyApplied {
                provider: other.provider().to_string(),
                applied,
                source: Box::new(other),
            },
        }
    }

    /// Mutable access to the partially applied records, used to translate their names
    /// back into the caller's namespace.
    pub(crate) fn applied_records_mut(&mut self) -> Option<&mut Vec<Record>> {
        match self {
            Self::PartiallyApplied { applied, .. } => Some(applied),
            _ => None,
        }
    }

    /// Provider that produced the error.
    pub fn provider(&self) -> &str {
        match self {
            Self::NetworkError { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::InvalidCredentials { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::DomainNotFound { provider, .. }
            | Self::InvalidParameter { provider, .. }
            | Self::RemoteFault { provider, .. }
            | Self::ParseError { provider, .. }
            | Self::SerializationError { provider, .. }
            | Self::Reconciliation { provider, .. }
            | Self::NotImplemented { provider, .. }
            | Self::PartiallyApplied { provider, .. }
            | Self::Unknown { provider, .. } => provider,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { provider, detail } => {
                write!(f, "[{provider}] Network error: {detail}")
            }
            Self::Timeout { provider, detail } => {
                write!(f, "[{provider}] Request timeout: {detail}")
            }
            Self::InvalidCredentials {
                provider,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{provider}] Invalid credentials: {msg}")
                } else {
                    write!(f, "[{provider}] Invalid credentials")
                }
            }
            Self::RateLimited { provider, .. } => {
                write!(f, "[{provider}] Rate limited")
            }
            Self::DomainNotFound {
                provider,
                domain,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{provider}] Domain '{domain}' not found: {msg}")
                } else {
                    write!(f, "[{provider}] Domain '{domain}' not found")
                }
            }
            Self::InvalidParameter {
                provider,
                param,
                detail,
            } => {
                write!(f, "[{provider}] Invalid parameter '{param}': {detail}")
            }
            Self::RemoteFault {
                provider,
                fault_code,
                fault_string,
            } => {
                write!(f, "[{provider}] Remote fault {fault_code}: {fault_string}")
            }
            Self::ParseError { provider, detail } => {
                write!(f, "[{provider}] Parse error: {detail}")
            }
            Self::SerializationError { provider, detail } => {
                write!(f, "[{provider}] Serialization error: {detail}")
            }
            Self::Reconciliation { provider, detail } => {
                write!(f, "[{provider}] Reconciliation failed: {detail}")
            }
            Self::NotImplemented {
                provider,
                operation,
            } => {
                write!(f, "[{provider}] {operation} is not implemented")
            }
            Self::PartiallyApplied {
                provider,
                applied,
                source,
            } => {
                write!(
                    f,
                    "[{provider}] {} record(s) applied before failure: {source}",
                    applied.len()
                )
            }
            Self::Unknown {
                provider,
                raw_code,
                raw_message,
            } => {
                if let Some(code) = raw_code {
                    write!(f, "[{provider}] {code}: {raw_message}")
                } else {
                    write!(f, "[{provider}] {raw_message}")
                }
            }
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PartiallyApplied { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Convenience type alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn applied_record() -> Record {
        Record {
            name: "www".into(),
            record_type: "A".into(),
            data: "192.0.2.1".into(),
            ttl: Duration::from_secs(300),
            id: Some(7),
        }
    }

    #[test]
    fn display_network_error() {
        let e = ProviderError::NetworkError {
            provider: "loopia".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(e.to_string(), "[loopia] Network error: connection refused");
    }

    #[test]
    fn display_invalid_credentials_with_message() {
        let e = ProviderError::InvalidCredentials {
            provider: "loopia".to_string(),
            raw_message: Some("AUTH_ERROR".to_string()),
        };
        assert_eq!(e.to_string(), "[loopia] Invalid credentials: AUTH_ERROR");
    }

    #[test]
    fn display_invalid_parameter() {
        let e = ProviderError::InvalidParameter {
            provider: "loopia".to_string(),
            param: "zone".to_string(),
            detail: "too short".to_string(),
        };
        assert_eq!(e.to_string(), "[loopia] Invalid parameter 'zone': too short");
    }

    #[test]
    fn display_remote_fault() {
        let e = ProviderError::RemoteFault {
            provider: "loopia".to_string(),
            fault_code: 620,
            fault_string: "Method not found".to_string(),
        };
        assert_eq!(e.to_string(), "[loopia] Remote fault 620: Method not found");
    }

    #[test]
    fn display_not_implemented() {
        let e = ProviderError::NotImplemented {
            provider: "loopia".to_string(),
            operation: "SetRecords".to_string(),
        };
        assert_eq!(e.to_string(), "[loopia] SetRecords is not implemented");
    }

    #[test]
    fn display_unknown_with_code() {
        let e = ProviderError::Unknown {
            provider: "loopia".to_string(),
            raw_code: Some("BAD_INDATA".to_string()),
            raw_message: "addZoneRecord rejected".to_string(),
        };
        assert_eq!(e.to_string(), "[loopia] BAD_INDATA: addZoneRecord rejected");
    }

    #[test]
    fn kind_classification() {
        let transport = ProviderError::Timeout {
            provider: "t".into(),
            detail: "x".into(),
        };
        assert_eq!(transport.kind(), ErrorKind::Transport);

        let remote = ProviderError::RateLimited {
            provider: "t".into(),
            raw_message: None,
        };
        assert_eq!(remote.kind(), ErrorKind::Remote);

        let reconciliation = ProviderError::Reconciliation {
            provider: "t".into(),
            detail: "x".into(),
        };
        assert_eq!(reconciliation.kind(), ErrorKind::Reconciliation);
    }

    #[test]
    fn with_applied_wraps_and_keeps_kind() {
        let e = ProviderError::NetworkError {
            provider: "loopia".into(),
            detail: "reset".into(),
        }
        .with_applied(vec![applied_record()]);

        assert_eq!(e.kind(), ErrorKind::Transport);
        assert_eq!(e.applied_records().len(), 1);
        assert_eq!(
            e.to_string(),
            "[loopia] 1 record(s) applied before failure: [loopia] Network error: reset"
        );
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn with_applied_empty_is_identity() {
        let e = ProviderError::NetworkError {
            provider: "loopia".into(),
            detail: "reset".into(),
        }
        .with_applied(Vec::new());

        assert!(matches!(e, ProviderError::NetworkError { .. }));
        assert!(e.applied_records().is_empty());
    }

    #[test]
    fn with_applied_merges_nested() {
        let e = ProviderError::NetworkError {
            provider: "loopia".into(),
            detail: "reset".into(),
        }
        .with_applied(vec![applied_record()])
        .with_applied(vec![applied_record()]);

        assert_eq!(e.applied_records().len(), 2);
        assert!(matches!(
            e,
            ProviderError::PartiallyApplied { ref source, .. }
                if matches!(**source, ProviderError::NetworkError { .. })
        ));
    }

    #[test]
    fn serialize_json_round_trip() {
        let e = ProviderError::RemoteFault {
            provider: "loopia".to_string(),
            fault_code: 623,
            fault_string: "Authentication failed".to_string(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"code\":\"RemoteFault\""));
        assert!(json.contains("\"fault_code\":623"));

        let back: ProviderError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), e.to_string());
    }

    #[test]
    fn partially_applied_round_trip() {
        let e = ProviderError::Reconciliation {
            provider: "loopia".into(),
            detail: "missing id".into(),
        }
        .with_applied(vec![applied_record()]);

        let json = serde_json::to_string(&e).unwrap();
        let back: ProviderError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ErrorKind::Reconciliation);
        assert_eq!(back.applied_records(), e.applied_records());
    }
}
