use std::fmt;

use serde::{Serialize, Serializer};
use url::Url;

/// Known DMARC tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// Protocol version (v=).
    V,
    /// Domain policy (p=).
    P,
    /// Subdomain policy (sp=).
    Sp,
    /// Non-existent subdomain policy (np=, DMARCbis).
    Np,
    /// Aggregate report URIs (rua=).
    Rua,
    /// Failure report URIs (ruf=).
    Ruf,
    /// DKIM alignment mode (adkim=).
    Adkim,
    /// SPF alignment mode (aspf=).
    Aspf,
    /// Failure reporting options (fo=).
    Fo,
    /// Public suffix domain flag (psd=, DMARCbis).
    Psd,
    /// Testing mode flag (t=, DMARCbis).
    T,
    /// Sampling percentage (pct=).
    Pct,
    /// Failure report format (rf=).
    Rf,
    /// Aggregate report interval (ri=).
    Ri,
}

impl Tag {
    /// Every tag, in canonical serialization order.
    pub const ALL: [Tag; 14] = [
        Tag::V,
        Tag::P,
        Tag::Sp,
        Tag::Np,
        Tag::Rua,
        Tag::Ruf,
        Tag::Adkim,
        Tag::Aspf,
        Tag::Fo,
        Tag::Psd,
        Tag::T,
        Tag::Pct,
        Tag::Rf,
        Tag::Ri,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tag::V => "v",
            Tag::P => "p",
            Tag::Sp => "sp",
            Tag::Np => "np",
            Tag::Rua => "rua",
            Tag::Ruf => "ruf",
            Tag::Adkim => "adkim",
            Tag::Aspf => "aspf",
            Tag::Fo => "fo",
            Tag::Psd => "psd",
            Tag::T => "t",
            Tag::Pct => "pct",
            Tag::Rf => "rf",
            Tag::Ri => "ri",
        }
    }

    /// Look up a tag by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Tag::ALL.into_iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Tags whose value is a list rather than a scalar.
    pub fn is_list(self) -> bool {
        matches!(self, Tag::Rua | Tag::Ruf | Tag::Fo)
    }

    /// Separator between list items, for list-valued tags.
    pub fn list_separator(self) -> Option<char> {
        match self {
            Tag::Rua | Tag::Ruf => Some(','),
            Tag::Fo => Some(':'),
            _ => Option::None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed tag value with a canonical text form.
pub trait TagValue: Copy + PartialEq + fmt::Display {
    fn from_tag(s: &str) -> Option<Self>;
}

/// A tag value as published: recognized and typed, or kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<T> {
    Known(T),
    Unrecognized(String),
}

impl<T: TagValue> Value<T> {
    pub fn parse(raw: &str) -> Self {
        match T::from_tag(raw) {
            Some(v) => Value::Known(v),
            None => Value::Unrecognized(raw.to_string()),
        }
    }

    pub fn known(&self) -> Option<T> {
        match self {
            Value::Known(v) => Some(*v),
            Value::Unrecognized(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }
}

impl<T: TagValue> fmt::Display for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Known(v) => v.fmt(f),
            Value::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl<T: TagValue> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Numeric tags (pct=, ri=): one or more ASCII digits.
impl TagValue for u32 {
    fn from_tag(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Option::None;
        }
        s.parse().ok()
    }
}

/// DMARC policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No action, monitoring only.
    None,
    /// Treat as suspicious (spam folder).
    Quarantine,
    /// Reject the message.
    Reject,
}

impl Policy {
    pub const NAMES: &'static [&'static str] = &["none", "quarantine", "reject"];

    /// Parse policy string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Policy::None),
            "quarantine" => Some(Policy::Quarantine),
            "reject" => Some(Policy::Reject),
            _ => Option::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Policy::None => "none",
            Policy::Quarantine => "quarantine",
            Policy::Reject => "reject",
        }
    }
}

/// Alignment mode for DKIM/SPF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    /// Organizational domain match.
    Relaxed,
    /// Exact domain match.
    Strict,
}

impl AlignmentMode {
    pub const NAMES: &'static [&'static str] = &["r", "s"];

    /// Parse alignment mode: "r" → Relaxed, "s" → Strict.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "r" => Some(AlignmentMode::Relaxed),
            "s" => Some(AlignmentMode::Strict),
            _ => Option::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentMode::Relaxed => "r",
            AlignmentMode::Strict => "s",
        }
    }
}

/// Failure reporting option (fo= tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOption {
    /// Generate report if all mechanisms fail.
    Zero,
    /// Generate report if any mechanism fails.
    One,
    /// Generate report if DKIM fails.
    D,
    /// Generate report if SPF fails.
    S,
}

impl FailureOption {
    pub const NAMES: &'static [&'static str] = &["0", "1", "d", "s"];

    /// Parse a single failure option character (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "0" => Some(FailureOption::Zero),
            "1" => Some(FailureOption::One),
            "d" => Some(FailureOption::D),
            "s" => Some(FailureOption::S),
            _ => Option::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureOption::Zero => "0",
            FailureOption::One => "1",
            FailureOption::D => "d",
            FailureOption::S => "s",
        }
    }
}

/// Failure report format (rf= tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Authentication Failure Reporting Format (RFC 6591).
    Afrf,
    /// Incident Object Description Exchange Format (RFC 5070).
    Iodef,
}

impl ReportFormat {
    pub const NAMES: &'static [&'static str] = &["afrf", "iodef"];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "afrf" => Some(ReportFormat::Afrf),
            "iodef" => Some(ReportFormat::Iodef),
            _ => Option::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Afrf => "afrf",
            ReportFormat::Iodef => "iodef",
        }
    }
}

/// Public suffix domain flag (psd= tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsdFlag {
    Yes,
    No,
    Unknown,
}

impl PsdFlag {
    pub const NAMES: &'static [&'static str] = &["y", "n", "u"];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "y" => Some(PsdFlag::Yes),
            "n" => Some(PsdFlag::No),
            "u" => Some(PsdFlag::Unknown),
            _ => Option::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PsdFlag::Yes => "y",
            PsdFlag::No => "n",
            PsdFlag::Unknown => "u",
        }
    }
}

/// Two-valued flag (t= tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Yes,
    No,
}

impl Flag {
    pub const NAMES: &'static [&'static str] = &["y", "n"];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "y" => Some(Flag::Yes),
            "n" => Some(Flag::No),
            _ => Option::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Yes => "y",
            Flag::No => "n",
        }
    }
}

macro_rules! tag_enum {
    ($($ty:ty),*) => {
        $(
            impl TagValue for $ty {
                fn from_tag(s: &str) -> Option<Self> {
                    <$ty>::parse(s)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

tag_enum!(Policy, AlignmentMode, FailureOption, ReportFormat, PsdFlag, Flag);

/// Report URI (rua=/ruf= item), kept as published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportUri(String);

impl ReportUri {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as an absolute URI.
    pub fn to_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.0)
    }

    /// Mailbox of a `mailto:` URI, without the size limit suffix.
    pub fn address(&self) -> Option<&str> {
        let rest = strip_mailto(&self.0)?;
        let address = match rest.rfind('!') {
            Some(bang) => &rest[..bang],
            None => rest,
        };
        if address.is_empty() {
            None
        } else {
            Some(address)
        }
    }

    /// Report size limit in bytes (`!size[kmgt]` suffix), if any.
    pub fn max_size(&self) -> Option<u64> {
        let rest = strip_mailto(&self.0)?;
        let bang = rest.rfind('!')?;
        parse_size_suffix(&rest[bang + 1..])
    }
}

impl fmt::Display for ReportUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_mailto(uri: &str) -> Option<&str> {
    let scheme = uri.get(..7)?;
    if scheme.eq_ignore_ascii_case("mailto:") {
        Some(&uri[7..])
    } else {
        None
    }
}

/// Parse size suffix: number + optional unit (k/m/g/t).
fn parse_size_suffix(s: &str) -> Option<u64> {
    let s_lower = s.to_ascii_lowercase();
    let (num_str, multiplier) = match s_lower.chars().last()? {
        'k' => (&s_lower[..s_lower.len() - 1], 1024u64),
        'm' => (&s_lower[..s_lower.len() - 1], 1024u64 * 1024),
        'g' => (&s_lower[..s_lower.len() - 1], 1024u64 * 1024 * 1024),
        't' => (&s_lower[..s_lower.len() - 1], 1024u64 * 1024 * 1024 * 1024),
        _ => (s_lower.as_str(), 1u64),
    };
    let num: u64 = num_str.parse().ok()?;
    num.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names_round_trip() {
        for tag in Tag::ALL {
            assert_eq!(Tag::from_name(tag.name()), Some(tag));
        }
        assert_eq!(Tag::from_name("ADKIM"), Some(Tag::Adkim));
        assert_eq!(Tag::from_name("x"), None);
    }

    #[test]
    fn list_separators() {
        assert_eq!(Tag::Rua.list_separator(), Some(','));
        assert_eq!(Tag::Fo.list_separator(), Some(':'));
        assert_eq!(Tag::P.list_separator(), None);
        assert!(!Tag::Pct.is_list());
    }

    #[test]
    fn all_policy_variants() {
        assert_eq!(Policy::parse("none"), Some(Policy::None));
        assert_eq!(Policy::parse("quarantine"), Some(Policy::Quarantine));
        assert_eq!(Policy::parse("reject"), Some(Policy::Reject));
        assert_eq!(Policy::parse("NONE"), Some(Policy::None));
        assert_eq!(Policy::parse("invalid"), Option::None);
    }

    #[test]
    fn all_alignment_variants() {
        assert_eq!(AlignmentMode::parse("r"), Some(AlignmentMode::Relaxed));
        assert_eq!(AlignmentMode::parse("s"), Some(AlignmentMode::Strict));
        assert_eq!(AlignmentMode::parse("R"), Some(AlignmentMode::Relaxed));
        assert_eq!(AlignmentMode::parse("x"), Option::None);
    }

    #[test]
    fn all_failure_option_variants() {
        assert_eq!(FailureOption::parse("0"), Some(FailureOption::Zero));
        assert_eq!(FailureOption::parse("1"), Some(FailureOption::One));
        assert_eq!(FailureOption::parse("d"), Some(FailureOption::D));
        assert_eq!(FailureOption::parse("s"), Some(FailureOption::S));
        assert_eq!(FailureOption::parse("D"), Some(FailureOption::D));
        assert_eq!(FailureOption::parse("x"), Option::None);
    }

    #[test]
    fn names_match_parsers() {
        for name in Policy::NAMES {
            assert_eq!(Policy::parse(name).map(Policy::as_str), Some(*name));
        }
        for name in PsdFlag::NAMES {
            assert_eq!(PsdFlag::parse(name).map(PsdFlag::as_str), Some(*name));
        }
        for name in ReportFormat::NAMES {
            assert_eq!(ReportFormat::parse(name).map(ReportFormat::as_str), Some(*name));
        }
    }

    #[test]
    fn numeric_values() {
        assert_eq!(u32::from_tag("50"), Some(50));
        assert_eq!(u32::from_tag("+5"), None);
        assert_eq!(u32::from_tag("-5"), None);
        assert_eq!(u32::from_tag(""), None);
        assert_eq!(u32::from_tag("abc"), None);
    }

    #[test]
    fn value_keeps_unrecognized_text() {
        let v: Value<Policy> = Value::parse("Reject");
        assert_eq!(v, Value::Known(Policy::Reject));
        assert_eq!(v.to_string(), "reject");

        let v: Value<Policy> = Value::parse("bogus");
        assert_eq!(v.known(), None);
        assert_eq!(v.to_string(), "bogus");
    }

    #[test]
    fn report_uri_no_size() {
        let uri = ReportUri::new("mailto:dmarc@example.com");
        assert_eq!(uri.address(), Some("dmarc@example.com"));
        assert!(uri.max_size().is_none());
        assert!(uri.to_url().is_ok());
    }

    #[test]
    fn report_uri_with_size() {
        assert_eq!(ReportUri::new("mailto:a@b.com!100k").max_size(), Some(100 * 1024));
        assert_eq!(ReportUri::new("mailto:a@b.com!10M").max_size(), Some(10 * 1024 * 1024));
        assert_eq!(ReportUri::new("mailto:a@b.com!5000").max_size(), Some(5000));
        assert_eq!(
            ReportUri::new("mailto:a@b.com!1t").max_size(),
            Some(1024u64 * 1024 * 1024 * 1024)
        );
        assert_eq!(ReportUri::new("mailto:a@b.com!100k").address(), Some("a@b.com"));
    }

    #[test]
    fn report_uri_non_mailto() {
        let uri = ReportUri::new("https://example.com/report");
        assert_eq!(uri.address(), None);
        assert!(uri.to_url().is_ok());
    }

    #[test]
    fn report_uri_relative_is_not_a_url() {
        assert!(ReportUri::new("not-a-uri").to_url().is_err());
    }
}
