//! Loopia error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::{LoopiaProvider, PROVIDER_NAME};

/// XML-RPC fault codes Loopia uses for rejected logins.
const AUTH_FAULT_CODES: [i64; 2] = [623, 624];

/// Loopia status mapping
/// Reference: <https://www.loopia.com/api/>
impl ProviderErrorMapper for LoopiaProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match raw.code.as_deref() {
            Some("AUTH_ERROR") => ProviderError::InvalidCredentials {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            Some("RATE_LIMITED") => ProviderError::RateLimited {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // Loopia answers UNKNOWN_ERROR for domains that are not on the account
            Some("UNKNOWN_ERROR") if context.domain.is_some() && context.record_name.is_none() => {
                ProviderError::DomainNotFound {
                    provider: self.provider_name().to_string(),
                    domain: context.domain.unwrap_or_default(),
                    raw_message: Some(raw.message),
                }
            }

            Some(code @ "BAD_INDATA") => ProviderError::Unknown {
                provider: self.provider_name().to_string(),
                raw_code: Some(code.to_string()),
                raw_message: match context.record_name {
                    Some(name) => format!("{} (label '{name}')", raw.message),
                    None => raw.message,
                },
            },

            _ => self.unknown_error(raw),
        }
    }
}

impl LoopiaProvider {
    /// Map an XML-RPC fault. Login faults become `InvalidCredentials`; everything
    /// else stays a `RemoteFault`.
    pub(crate) fn map_fault(&self, fault_code: i64, fault_string: String) -> ProviderError {
        if AUTH_FAULT_CODES.contains(&fault_code) {
            ProviderError::InvalidCredentials {
                provider: self.provider_name().to_string(),
                raw_message: Some(fault_string),
            }
        } else {
            ProviderError::RemoteFault {
                provider: self.provider_name().to_string(),
                fault_code,
                fault_string,
            }
        }
    }
}
