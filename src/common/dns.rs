use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("NXDOMAIN: domain does not exist")]
    NxDomain,
    #[error("no TXT records")]
    NoRecords,
    #[error("SERVFAIL: server failure")]
    ServFail,
    #[error("timeout")]
    Timeout,
    #[error("incompatible character encoding: {0}")]
    Encoding(String),
    #[error("DNS error: {0}")]
    Other(String),
}

impl DnsError {
    /// True when the name (or its TXT set) simply does not exist.
    pub fn is_absent(&self) -> bool {
        matches!(self, DnsError::NxDomain | DnsError::NoRecords)
    }
}

/// DNS resolver trait for abstracting TXT lookups.
///
/// Each returned string is one TXT record with its character-strings
/// concatenated without a delimiter.
pub trait DnsResolver: Clone + Send + Sync + 'static {
    fn query_txt(&self, domain: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
}

/// Hickory DNS resolver implementation
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default(), ResolverOpts::default())
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Self { resolver }
    }

    fn classify_error(e: &hickory_resolver::ResolveError) -> DnsError {
        if e.is_nx_domain() {
            return DnsError::NxDomain;
        }
        if e.is_no_records_found() {
            return DnsError::NoRecords;
        }
        let msg = e.to_string().to_lowercase();
        if msg.contains("timeout") || msg.contains("timed out") {
            DnsError::Timeout
        } else if msg.contains("servfail") {
            DnsError::ServFail
        } else {
            DnsError::Other(e.to_string())
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsResolver for HickoryResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        // Names go on the wire as ASCII; IDNs must arrive punycode-encoded.
        if !domain.is_ascii() {
            return Err(DnsError::Encoding(format!("'{}' is not an ASCII host name", domain)));
        }
        match self.resolver.txt_lookup(domain).await {
            Ok(lookup) => {
                let records: Vec<String> = lookup
                    .iter()
                    .map(|txt| {
                        txt.txt_data()
                            .iter()
                            .map(|segment| String::from_utf8_lossy(segment))
                            .collect::<String>()
                    })
                    .collect();
                Ok(records)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }
}

/// Mock DNS resolver for testing
#[derive(Clone, Default)]
pub struct MockResolver {
    txt_records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    txt_errors: Arc<Mutex<HashMap<String, DnsError>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_txt(&self, domain: &str, records: Vec<String>) {
        if let Ok(mut map) = self.txt_records.lock() {
            map.insert(domain.to_lowercase(), records);
        }
    }

    pub fn add_txt_err(&self, domain: &str, err: DnsError) {
        if let Ok(mut map) = self.txt_errors.lock() {
            map.insert(domain.to_lowercase(), err);
        }
    }

    pub fn set_nxdomain(&self, domain: &str) {
        self.add_txt_err(domain, DnsError::NxDomain);
    }

    /// Names queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl DnsResolver for MockResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(domain.to_string());
        }
        let domain_lower = domain.to_lowercase();
        if let Some(err) = self.txt_errors.lock().ok().and_then(|m| m.get(&domain_lower).cloned()) {
            return Err(err);
        }
        let records = self
            .txt_records
            .lock()
            .ok()
            .and_then(|m| m.get(&domain_lower).cloned());
        match records {
            Some(records) => Ok(records),
            None => Err(DnsError::NoRecords),
        }
    }
}
