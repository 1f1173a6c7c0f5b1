//! # loopia-dns-provider
//!
//! DNS record management for zones hosted at [Loopia](https://www.loopia.com/),
//! including zones nested below a registered domain.
//!
//! Loopia's XML-RPC API only knows registered domains (`example.org`) and flat,
//! single-label subdomains. This crate lets you address any depth
//! (`_acme-challenge.www` in `lcl.example.org`) by folding the extra hierarchy into
//! the Loopia label and translating names back on the way out.
//!
//! ## Feature Flags
//!
//! ### TLS Backend
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls. Recommended for cross-compilation and static builds.
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! loopia-dns-provider = "0.1"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use loopia_dns_provider::{
//!     CancellationToken, LoopiaProvider, ProviderCredentials, Record, RecordProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Create a provider from LOOPIA_USER / LOOPIA_PASSWORD
//!     let provider = LoopiaProvider::new(ProviderCredentials::from_env()?)?;
//!     let cancel = CancellationToken::new();
//!
//!     // 2. Add a record; existing identical records are reused
//!     let added = provider
//!         .append_records(
//!             &cancel,
//!             "lcl.example.org",
//!             &[Record::new("_acme-challenge", "TXT", "token", Duration::from_secs(300))],
//!         )
//!         .await?;
//!     println!("record id: {:?}", added[0].id);
//!
//!     // 3. List the zone
//!     for record in provider.get_records(&cancel, "lcl.example.org").await? {
//!         println!("{} {} {}", record.name, record.record_type, record.data);
//!     }
//!
//!     // 4. Delete by id
//!     provider.delete_records(&cancel, "lcl.example.org", &added).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Typed Records
//!
//! ```rust,no_run
//! # use loopia_dns_provider::*;
//! # async fn example(provider: &LoopiaProvider, cancel: &CancellationToken) -> Result<()> {
//! let mx = TypedRecord {
//!     name: "@".to_string(),
//!     ttl: std::time::Duration::from_secs(3600),
//!     data: RecordData::MX { priority: 10, exchange: "mail.example.org".to_string() },
//!     id: None,
//! };
//! provider.append_records(cancel, "example.org", &[mx.to_record()]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All provider operations return [`Result<T, ProviderError>`](ProviderError).
//! [`ProviderError::kind`] groups the variants:
//!
//! - [`ErrorKind::Validation`]: rejected before any remote call
//! - [`ErrorKind::Transport`]: network, timeout or decoding failure
//! - [`ErrorKind::Remote`]: Loopia answered with an error status or fault
//! - [`ErrorKind::Reconciliation`]: the remote state could not be confirmed
//! - [`ErrorKind::NotImplemented`]: `set_records` without the experimental diff
//!
//! A batch that fails after remote writes returns [`ProviderError::PartiallyApplied`];
//! [`ProviderError::applied_records`] lists what was already done. Nothing is
//! retried or rolled back.

mod error;
mod http_client;
mod providers;
mod traits;
mod types;
mod utils;
pub mod xmlrpc;

// Re-export error types
pub use error::{ErrorKind, ProviderError, Result};

// Re-export traits (internal traits are not exported)
pub use traits::{RecordProvider, RpcTransport};

// Re-export the bundled transport
pub use http_client::XmlRpcHttpTransport;

// Re-export types
pub use types::{
    CredentialValidationError, DnsRecordType, ProviderCredentials, Record, RecordData, ToRecord,
    TypedRecord,
};

// Re-export the provider and its name mapping
pub use providers::loopia::{LOOPIA_API_URL, LoopiaProvider, LoopiaProviderBuilder, flatten};

pub use tokio_util::sync::CancellationToken;
pub use xmlrpc::Value;
