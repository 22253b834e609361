//! Infrastructure shared by the DMARC layer.

pub mod dns;
pub mod domain;
