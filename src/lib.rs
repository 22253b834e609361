//! DMARC policy records: DNS discovery, tag parsing and validation.
//!
//! DNS caching is the caller's responsibility. This library consumes DNS
//! through the `DnsResolver` trait; implement it with caching at the
//! resolver layer.

pub mod common;
pub mod dmarc;

pub use dmarc::{parse, query, DmarcRecord, RecordError};
