//! Shared test tools and helper functions

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use loopia_dns_provider::{
    CancellationToken, LoopiaProvider, ProviderCredentials, ProviderError, Result, RpcTransport,
    Value,
};

pub const USERNAME: &str = "user@loopiaapi";
pub const PASSWORD: &str = "secret-password";
pub const DOMAIN: &str = "example.org";

/// Macro to skip a test when environment variables are missing
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("skipping test: missing environment variable {}", $var);
                return;
            }
        )+
    };
}

/// Assert that an `Option` is `Some` and unwrap it (fail the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Assert that a `Result` is `Ok` and unwrap it (fail the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Generate a unique test record name
pub fn generate_test_record_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("_test-{}", &uuid.to_string()[..8])
}

// ============ In-memory Loopia ============

/// Record as held by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: i64,
    pub ttl: i64,
    pub record_type: String,
    pub rdata: String,
}

/// One call as seen by the mock, credentials stripped.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
}

/// Injected failure.
#[derive(Debug, Clone)]
pub enum Failure {
    /// Reply with this status string instead of performing the call.
    Status(String),
    /// Fail the round trip with a network error.
    Network,
    /// Report success without changing anything.
    SilentOk,
}

#[derive(Default)]
struct MockState {
    /// domain -> label -> records
    domains: BTreeMap<String, BTreeMap<String, Vec<StoredRecord>>>,
    next_id: i64,
    calls: Vec<Call>,
    /// (method, calls to that method still to let through, failure)
    failures: Vec<(String, usize, Failure)>,
    quote_txt: bool,
    /// Cancel this token once a call to the method has been served.
    cancel_on: Option<(String, CancellationToken)>,
}

/// [`RpcTransport`] serving a fake Loopia account from memory.
///
/// Clones share state, so a test can keep one handle for assertions after
/// handing another to the provider.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    customer: Option<String>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Account owning `DOMAIN` with an empty apex label.
    pub fn new() -> Self {
        let mock = Self {
            state: Arc::new(Mutex::new(MockState {
                next_id: 1000,
                ..MockState::default()
            })),
            customer: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        };
        mock.add_label(DOMAIN, "@");
        mock
    }

    /// Expect a customer number after the password.
    pub fn with_customer(mut self, customer: &str) -> Self {
        self.customer = Some(customer.to_string());
        self
    }

    /// Serve TXT rdata wrapped in double quotes, like Loopia does.
    pub fn quote_txt(&self) {
        self.state().quote_txt = true;
    }

    /// Cancel `token` right after the first call to `method` is served.
    pub fn cancel_after(&self, method: &str, token: &CancellationToken) {
        self.state().cancel_on = Some((method.to_string(), token.clone()));
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_label(&self, domain: &str, label: &str) {
        self.state()
            .domains
            .entry(domain.to_string())
            .or_default()
            .entry(label.to_string())
            .or_default();
    }

    /// Store a record directly and return its id.
    pub fn seed(&self, label: &str, record_type: &str, rdata: &str, ttl: i64) -> i64 {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        state
            .domains
            .entry(DOMAIN.to_string())
            .or_default()
            .entry(label.to_string())
            .or_default()
            .push(StoredRecord {
                id,
                ttl,
                record_type: record_type.to_string(),
                rdata: rdata.to_string(),
            });
        id
    }

    /// Fail the call to `method` after letting `skip` calls to it through.
    pub fn fail(&self, method: &str, skip: usize, failure: Failure) {
        self.state()
            .failures
            .push((method.to_string(), skip, failure));
    }

    pub fn labels(&self) -> Vec<String> {
        self.state()
            .domains
            .get(DOMAIN)
            .map(|labels| labels.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn records(&self, label: &str) -> Vec<StoredRecord> {
        self.state()
            .domains
            .get(DOMAIN)
            .and_then(|labels| labels.get(label))
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Calls that change remote state.
    pub fn write_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c.method.as_str(),
                    "addSubdomain"
                        | "addZoneRecord"
                        | "updateZoneRecord"
                        | "removeZoneRecord"
                        | "removeSubdomain"
                )
            })
            .count()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    /// Provider wired to this mock.
    pub fn provider(&self) -> LoopiaProvider {
        self.provider_with(|b| b)
    }

    pub fn provider_with(
        &self,
        configure: impl FnOnce(
            loopia_dns_provider::LoopiaProviderBuilder,
        ) -> loopia_dns_provider::LoopiaProviderBuilder,
    ) -> LoopiaProvider {
        let mut credentials = ProviderCredentials::new(USERNAME, PASSWORD);
        if let Some(customer) = &self.customer {
            credentials = credentials.with_customer(customer.clone());
        }
        let builder = LoopiaProvider::builder(credentials).transport(self.clone());
        match configure(builder).build() {
            Ok(provider) => provider,
            Err(e) => panic!("failed to build provider: {e}"),
        }
    }
}

fn status(s: &str) -> Value {
    Value::String(s.to_string())
}

fn string_arg(args: &[Value], index: usize) -> Option<String> {
    args.get(index).and_then(Value::as_str).map(str::to_string)
}

fn record_arg(args: &[Value], index: usize) -> Option<StoredRecord> {
    let Some(Value::Struct(members)) = args.get(index) else {
        return None;
    };
    let int = |key: &str| match members.get(key) {
        Some(Value::Int(i)) => Some(*i),
        _ => None,
    };
    let text = |key: &str| members.get(key).and_then(Value::as_str).map(str::to_string);
    Some(StoredRecord {
        id: int("record_id")?,
        ttl: int("ttl")?,
        record_type: text("type")?,
        rdata: text("rdata")?,
    })
}

impl MockState {
    fn take_failure(&mut self, method: &str) -> Option<Failure> {
        let pos = self.failures.iter().position(|(m, _, _)| m == method)?;
        if self.failures[pos].1 > 0 {
            self.failures[pos].1 -= 1;
            return None;
        }
        Some(self.failures.remove(pos).2)
    }

    fn to_value(&self, record: &StoredRecord) -> Value {
        let rdata = if self.quote_txt && record.record_type == "TXT" {
            format!("\"{}\"", record.rdata)
        } else {
            record.rdata.clone()
        };
        let mut members = BTreeMap::new();
        members.insert("record_id".to_string(), Value::Int(record.id));
        members.insert("ttl".to_string(), Value::Int(record.ttl));
        members.insert("type".to_string(), status(&record.record_type));
        members.insert("rdata".to_string(), Value::String(rdata));
        members.insert("priority".to_string(), Value::Int(0));
        Value::Struct(members)
    }

    fn dispatch(&mut self, method: &str, args: &[Value]) -> Value {
        let Some(domain) = string_arg(args, 0) else {
            return status("BAD_INDATA");
        };
        let label = string_arg(args, 1);

        match method {
            "getSubdomains" => match self.domains.get(&domain) {
                Some(labels) => Value::Array(labels.keys().map(|l| status(l)).collect()),
                None => status("UNKNOWN_ERROR"),
            },
            "getZoneRecords" => {
                let records = label.and_then(|l| self.domains.get(&domain)?.get(&l).cloned());
                match records {
                    Some(records) => {
                        Value::Array(records.iter().map(|r| self.to_value(r)).collect())
                    }
                    None => status("UNKNOWN_ERROR"),
                }
            }
            "addSubdomain" => {
                let (Some(labels), Some(label)) = (self.domains.get_mut(&domain), label) else {
                    return status("UNKNOWN_ERROR");
                };
                labels.entry(label).or_default();
                status("OK")
            }
            "addZoneRecord" => {
                let Some(mut record) = record_arg(args, 2) else {
                    return status("BAD_INDATA");
                };
                self.next_id += 1;
                record.id = self.next_id;
                match label.and_then(|l| self.domains.get_mut(&domain)?.get_mut(&l)) {
                    Some(records) => {
                        records.push(record);
                        status("OK")
                    }
                    None => status("UNKNOWN_ERROR"),
                }
            }
            "updateZoneRecord" => {
                let Some(record) = record_arg(args, 2) else {
                    return status("BAD_INDATA");
                };
                let existing = label
                    .and_then(|l| self.domains.get_mut(&domain)?.get_mut(&l))
                    .and_then(|records| records.iter_mut().find(|r| r.id == record.id));
                match existing {
                    Some(existing) => {
                        *existing = record;
                        status("OK")
                    }
                    None => status("UNKNOWN_ERROR"),
                }
            }
            "removeZoneRecord" => {
                let Some(Value::Int(id)) = args.get(2) else {
                    return status("BAD_INDATA");
                };
                let records = label.and_then(|l| self.domains.get_mut(&domain)?.get_mut(&l));
                match records {
                    Some(records) if records.iter().any(|r| r.id == *id) => {
                        records.retain(|r| r.id != *id);
                        status("OK")
                    }
                    _ => status("UNKNOWN_ERROR"),
                }
            }
            "removeSubdomain" => {
                let removed = label.and_then(|l| self.domains.get_mut(&domain)?.remove(&l));
                if removed.is_some() {
                    status("OK")
                } else {
                    status("UNKNOWN_ERROR")
                }
            }
            _ => status("UNKNOWN_ERROR"),
        }
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    /// Yields once before serving, so overlapping callers would be visible in
    /// [`MockTransport::max_in_flight`].
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let reply = self.serve(method, &params);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

impl MockTransport {
    fn serve(&self, method: &str, params: &[Value]) -> Result<Value> {
        let credentials = usize::from(self.customer.is_some()) + 2;
        let mut state = self.state();

        let authenticated = params.first().and_then(Value::as_str) == Some(USERNAME)
            && params.get(1).and_then(Value::as_str) == Some(PASSWORD)
            && self
                .customer
                .as_deref()
                .is_none_or(|c| params.get(2).and_then(Value::as_str) == Some(c));
        let args = params.get(credentials..).unwrap_or_default().to_vec();
        state.calls.push(Call {
            method: method.to_string(),
            args: args.clone(),
        });

        if !authenticated {
            return Ok(status("AUTH_ERROR"));
        }

        match state.take_failure(method) {
            Some(Failure::Status(s)) => return Ok(status(&s)),
            Some(Failure::Network) => {
                return Err(ProviderError::NetworkError {
                    provider: "mock".to_string(),
                    detail: "connection reset".to_string(),
                });
            }
            Some(Failure::SilentOk) => return Ok(status("OK")),
            None => {}
        }

        if !matches!(
            method,
            "getSubdomains"
                | "getZoneRecords"
                | "addSubdomain"
                | "addZoneRecord"
                | "updateZoneRecord"
                | "removeZoneRecord"
                | "removeSubdomain"
        ) {
            return Err(ProviderError::RemoteFault {
                provider: "mock".to_string(),
                fault_code: 620,
                fault_string: format!("Method not found: {method}"),
            });
        }

        let reply = state.dispatch(method, &args);
        if let Some((trigger, token)) = &state.cancel_on
            && trigger == method
        {
            token.cancel();
        }
        Ok(reply)
    }
}

// ============ Live test context ============

/// Test context - provider plus test zone, from the environment
pub struct TestContext {
    pub provider: LoopiaProvider,
    pub domain: String,
}

impl TestContext {
    /// Create a Loopia test context
    pub fn loopia() -> Option<Self> {
        let credentials = ProviderCredentials::from_env().ok()?;
        let domain = env::var("TEST_DOMAIN").ok()?;
        let provider = LoopiaProvider::new(credentials).ok()?;
        Some(Self { provider, domain })
    }
}
