use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};
use crate::utils::log_sanitizer::mask_secret;

// ============ Records ============

/// Provider-neutral DNS resource record.
///
/// `name` is relative to the zone passed alongside it. `data` is the presentation
/// form of the record value (e.g. `"10 mail.example.com"` for MX).
/// `id` is assigned by the remote store and is `None` until the record exists there.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Record name relative to the zone (e.g. `"www"`, `"@"`, `"_acme-challenge.test"`).
    pub name: String,
    /// RR type tag (e.g. `"A"`, `"TXT"`).
    #[serde(rename = "type")]
    pub record_type: String,
    /// Type-specific presentation value.
    pub data: String,
    /// Time to live.
    pub ttl: Duration,
    /// Remote record identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Record {
    /// Create a record without an id.
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        data: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            data: data.into(),
            ttl,
            id: None,
        }
    }

    /// Builder-style setter for the remote id.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Parse `record_type`/`data` into a [`TypedRecord`].
    pub fn parse(&self) -> Result<TypedRecord> {
        Ok(TypedRecord {
            name: self.name.clone(),
            ttl: self.ttl,
            data: RecordData::parse(&self.record_type, &self.data)?,
            id: self.id,
        })
    }
}

/// Anything that exposes name, type, data and TTL and can therefore be sent
/// to the provider as a [`Record`].
pub trait ToRecord {
    /// Neutral form of this record.
    fn to_record(&self) -> Record;
}

impl ToRecord for Record {
    fn to_record(&self) -> Record {
        self.clone()
    }
}

impl ToRecord for TypedRecord {
    fn to_record(&self) -> Record {
        Record {
            name: self.name.clone(),
            record_type: self.data.record_type().to_string(),
            data: self.data.to_presentation(),
            ttl: self.ttl,
            id: self.id,
        }
    }
}

/// A record whose data has been parsed into a [`RecordData`] variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedRecord {
    /// Record name relative to the zone.
    pub name: String,
    /// Time to live.
    pub ttl: Duration,
    /// Type-specific record data.
    pub data: RecordData,
    /// Remote record identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Supported DNS record types for typed records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name (alias) record.
    Cname,
    /// Mail exchange record.
    Mx,
    /// Text record.
    Txt,
    /// Name server record.
    Ns,
    /// Service locator record.
    Srv,
    /// Certificate Authority Authorization record.
    Caa,
}

impl DnsRecordType {
    /// Upper-case RR type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
        }
    }
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DnsRecordType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "SRV" => Ok(Self::Srv),
            "CAA" => Ok(Self::Caa),
            _ => Err(ProviderError::InvalidParameter {
                provider: "loopia".to_string(),
                param: "type".to_string(),
                detail: format!("unsupported record type: {s}"),
            }),
        }
    }
}

/// Type-safe representation of DNS record data.
///
/// Each variant carries the fields specific to that record type and prints to,
/// or parses from, the presentation string stored in [`Record::data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum RecordData {
    /// A record: maps a hostname to an IPv4 address.
    A {
        /// IPv4 address (e.g., `"1.2.3.4"`).
        address: String,
    },

    /// AAAA record: maps a hostname to an IPv6 address.
    AAAA {
        /// IPv6 address (e.g., `"2001:db8::1"`).
        address: String,
    },

    /// CNAME record: alias from one name to another.
    CNAME {
        /// Target hostname.
        target: String,
    },

    /// MX record: mail exchange server.
    MX {
        /// Priority (lower = preferred).
        priority: u16,
        /// Mail server hostname.
        exchange: String,
    },

    /// TXT record: arbitrary text data.
    TXT {
        /// Text content.
        text: String,
    },

    /// NS record: authoritative name server.
    NS {
        /// Name server hostname.
        nameserver: String,
    },

    /// SRV record: service locator.
    SRV {
        /// Priority (lower = preferred).
        priority: u16,
        /// Weight for load balancing among same-priority targets.
        weight: u16,
        /// TCP/UDP port number.
        port: u16,
        /// Target hostname providing the service.
        target: String,
    },

    /// CAA record: Certificate Authority Authorization.
    CAA {
        /// Issuer critical flag (0 or 128).
        flags: u8,
        /// Property tag (`"issue"`, `"issuewild"`, or `"iodef"`).
        tag: String,
        /// CA domain or reporting URI.
        value: String,
    },
}

impl RecordData {
    /// Returns the [`DnsRecordType`] discriminant for this record data.
    pub fn record_type(&self) -> DnsRecordType {
        match self {
            Self::A { .. } => DnsRecordType::A,
            Self::AAAA { .. } => DnsRecordType::Aaaa,
            Self::CNAME { .. } => DnsRecordType::Cname,
            Self::MX { .. } => DnsRecordType::Mx,
            Self::TXT { .. } => DnsRecordType::Txt,
            Self::NS { .. } => DnsRecordType::Ns,
            Self::SRV { .. } => DnsRecordType::Srv,
            Self::CAA { .. } => DnsRecordType::Caa,
        }
    }

    /// Presentation form of the data, as stored in [`Record::data`].
    pub fn to_presentation(&self) -> String {
        match self {
            Self::A { address } | Self::AAAA { address } => address.clone(),
            Self::CNAME { target } => target.clone(),
            Self::MX { priority, exchange } => format!("{priority} {exchange}"),
            Self::TXT { text } => text.clone(),
            Self::NS { nameserver } => nameserver.clone(),
            Self::SRV {
                priority,
                weight,
                port,
                target,
            } => format!("{priority} {weight} {port} {target}"),
            Self::CAA { flags, tag, value } => format!("{flags} {tag} \"{value}\""),
        }
    }

    /// Parse a presentation string for the given RR type.
    pub fn parse(record_type: &str, data: &str) -> Result<Self> {
        let parse_error = |detail: String| ProviderError::ParseError {
            provider: "loopia".to_string(),
            detail,
        };

        match record_type.parse::<DnsRecordType>()? {
            DnsRecordType::A => Ok(Self::A {
                address: data.to_string(),
            }),
            DnsRecordType::Aaaa => Ok(Self::AAAA {
                address: data.to_string(),
            }),
            DnsRecordType::Cname => Ok(Self::CNAME {
                target: data.to_string(),
            }),
            DnsRecordType::Txt => Ok(Self::TXT {
                text: data.to_string(),
            }),
            DnsRecordType::Ns => Ok(Self::NS {
                nameserver: data.to_string(),
            }),
            DnsRecordType::Mx => {
                let (priority, exchange) = data
                    .split_once(' ')
                    .ok_or_else(|| parse_error(format!("Invalid MX data: '{data}'")))?;
                Ok(Self::MX {
                    priority: priority
                        .parse()
                        .map_err(|_| parse_error(format!("Invalid MX priority: '{priority}'")))?,
                    exchange: exchange.to_string(),
                })
            }
            DnsRecordType::Srv => {
                let parts: Vec<&str> = data.splitn(4, ' ').collect();
                let [priority, weight, port, target] = parts.as_slice() else {
                    return Err(parse_error(format!(
                        "Invalid SRV record format: expected 'priority weight port target', got '{data}'"
                    )));
                };
                Ok(Self::SRV {
                    priority: priority
                        .parse()
                        .map_err(|_| parse_error(format!("Invalid SRV priority: '{priority}'")))?,
                    weight: weight
                        .parse()
                        .map_err(|_| parse_error(format!("Invalid SRV weight: '{weight}'")))?,
                    port: port
                        .parse()
                        .map_err(|_| parse_error(format!("Invalid SRV port: '{port}'")))?,
                    target: (*target).to_string(),
                })
            }
            DnsRecordType::Caa => {
                let parts: Vec<&str> = data.splitn(3, ' ').collect();
                let [flags, tag, value] = parts.as_slice() else {
                    return Err(parse_error(format!(
                        "Invalid CAA record format: expected 'flags tag value', got '{data}'"
                    )));
                };
                Ok(Self::CAA {
                    flags: flags
                        .parse()
                        .map_err(|_| parse_error(format!("Invalid CAA flags: '{flags}'")))?,
                    tag: (*tag).to_string(),
                    value: value.trim_matches('"').to_string(),
                })
            }
        }
    }
}

// ============ Credential Types ============

/// Validation error for provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code")]
pub enum CredentialValidationError {
    /// A required credential field is missing entirely.
    MissingField {
        /// Machine-readable field key.
        field: String,
    },
    /// A credential field is present but empty/whitespace-only.
    EmptyField {
        /// Machine-readable field key.
        field: String,
    },
}

impl std::fmt::Display for CredentialValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "Missing required field: {field}"),
            Self::EmptyField { field } => write!(f, "Field must not be empty: {field}"),
        }
    }
}

impl std::error::Error for CredentialValidationError {}

/// Loopia API credentials.
///
/// Sent as the leading positional arguments of every remote call. `customer` is only
/// set by resellers acting on behalf of one of their customers.
///
/// ```json
/// { "username": "user@loopiaapi", "password": "...", "customer": "C12345" }
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// API username (`...@loopiaapi`).
    pub username: String,
    /// API password.
    pub password: String,
    /// Optional reseller customer number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("username", &self.username)
            .field("password", &mask_secret(&self.password))
            .field("customer", &self.customer)
            .finish()
    }
}

impl ProviderCredentials {
    /// Environment variable holding the API username.
    pub const ENV_USERNAME: &'static str = "LOOPIA_USER";
    /// Environment variable holding the API password.
    pub const ENV_PASSWORD: &'static str = "LOOPIA_PASSWORD";
    /// Environment variable holding the optional customer number.
    pub const ENV_CUSTOMER: &'static str = "LOOPIA_CUSTOMER";

    /// Create credentials without a customer number.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            customer: None,
        }
    }

    /// Builder-style setter for the customer number.
    #[must_use]
    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    /// Load credentials from `LOOPIA_USER`, `LOOPIA_PASSWORD` and `LOOPIA_CUSTOMER`.
    pub fn from_env() -> std::result::Result<Self, CredentialValidationError> {
        let required = |key: &str| {
            std::env::var(key).map_err(|_| CredentialValidationError::MissingField {
                field: key.to_string(),
            })
        };

        let credentials = Self {
            username: required(Self::ENV_USERNAME)?,
            password: required(Self::ENV_PASSWORD)?,
            customer: std::env::var(Self::ENV_CUSTOMER)
                .ok()
                .filter(|c| !c.trim().is_empty()),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Check that username and password are non-blank.
    pub fn validate(&self) -> std::result::Result<(), CredentialValidationError> {
        for (field, value) in [("username", &self.username), ("password", &self.password)] {
            if value.trim().is_empty() {
                return Err(CredentialValidationError::EmptyField {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}
