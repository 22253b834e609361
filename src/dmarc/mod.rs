//! DMARC (Domain-based Message Authentication, Reporting, and Conformance)
//! policy records per RFC 7489, including the DMARCbis `np`, `psd` and `t` tags.

mod error;
mod lookup;
mod parser;
mod record;
mod types;
pub mod validator;

pub use error::{ActualValue, Expected, RecordError, PUNYCODE_HINT};
pub use lookup::{lookup_txt, query, TxtLookup};
pub use parser::{parse_tags, RawValue, TagMap};
pub use record::{DmarcRecord, DEFAULT_PERCENTAGE, DEFAULT_REPORT_INTERVAL};
pub use types::{
    AlignmentMode, FailureOption, Flag, Policy, PsdFlag, ReportFormat, ReportUri, Tag, TagValue,
    Value,
};

/// Parse and validate a DMARC TXT record.
pub fn parse(record: &str) -> DmarcRecord {
    DmarcRecord::parse(record)
}
