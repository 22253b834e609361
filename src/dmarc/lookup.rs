use tracing::{debug, warn};

use crate::common::dns::DnsResolver;
use crate::common::domain::dmarc_host;

use super::record::DmarcRecord;

/// Outcome of fetching the DMARC TXT record for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxtLookup {
    /// Record text, character-strings concatenated.
    Found(String),
    /// No TXT record at `_dmarc.<domain>`.
    Absent,
    /// Resolution or encoding failure, with the resolver's message.
    Failure(String),
}

/// Fetch the TXT record published at `_dmarc.<domain>`.
///
/// When several TXT records exist, the first one starting with
/// `v=DMARC1` is used, else the first one.
pub async fn lookup_txt<R: DnsResolver>(resolver: &R, domain: &str) -> TxtLookup {
    let host = dmarc_host(domain);
    debug!(host = %host, "querying DMARC record");

    let records = match resolver.query_txt(&host).await {
        Ok(records) => records,
        Err(e) if e.is_absent() => return TxtLookup::Absent,
        Err(e) => {
            warn!(host = %host, error = %e, "DMARC lookup failed");
            return TxtLookup::Failure(e.to_string());
        }
    };

    let dmarc: Vec<&String> = records.iter().filter(|r| is_dmarc_record(r)).collect();
    if dmarc.len() > 1 {
        warn!(host = %host, count = dmarc.len(), "multiple DMARC records published, using the first");
    }
    match dmarc.first().copied().or_else(|| records.first()) {
        Some(record) => TxtLookup::Found(record.clone()),
        None => TxtLookup::Absent,
    }
}

/// Look up and parse the DMARC record for `domain`.
///
/// - No record → `None`
/// - Lookup failure → a record with no tags and one lookup error
/// - Otherwise → [`DmarcRecord::parse`] of the record text
pub async fn query<R: DnsResolver>(resolver: &R, domain: &str) -> Option<DmarcRecord> {
    match lookup_txt(resolver, domain).await {
        TxtLookup::Found(text) => Some(DmarcRecord::parse(&text)),
        TxtLookup::Absent => {
            debug!(domain, "no DMARC record published");
            None
        }
        TxtLookup::Failure(cause) => Some(DmarcRecord::lookup_failure(cause)),
    }
}

impl DmarcRecord {
    /// See [`query`].
    pub async fn query<R: DnsResolver>(resolver: &R, domain: &str) -> Option<Self> {
        query(resolver, domain).await
    }
}

/// Check if a TXT record declares `v=DMARC1` as its first tag.
fn is_dmarc_record(txt: &str) -> bool {
    let first = txt.split(';').next().unwrap_or_default();
    match first.split_once('=') {
        Some((name, value)) => {
            name.trim().eq_ignore_ascii_case("v") && value.trim().eq_ignore_ascii_case("DMARC1")
        }
        None => false,
    }
}
