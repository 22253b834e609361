use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use super::error::{ActualValue, RecordError};
use super::parser::{parse_tags, RawValue, TagMap};
use super::types::{
    AlignmentMode, FailureOption, Flag, Policy, PsdFlag, ReportFormat, ReportUri, Tag, TagValue,
    Value,
};
use super::validator;

pub const DEFAULT_PERCENTAGE: u32 = 100;
pub const DEFAULT_REPORT_INTERVAL: u32 = 86400;

/// A DMARC policy record.
///
/// Fields hold only what was published; defaults and fallbacks are applied
/// by the accessors, so `has_*` always reflects presence in the record text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmarcRecord {
    version: Option<String>,
    policy: Option<Value<Policy>>,
    subdomain_policy: Option<Value<Policy>>,
    nonexistent_subdomain_policy: Option<Value<Policy>>,
    percentage: Option<Value<u32>>,
    dkim_alignment: Option<Value<AlignmentMode>>,
    spf_alignment: Option<Value<AlignmentMode>>,
    report_format: Option<Value<ReportFormat>>,
    report_interval: Option<Value<u32>>,
    failure_options: Option<Vec<Value<FailureOption>>>,
    aggregate_report_uris: Option<Vec<ReportUri>>,
    failure_report_uris: Option<Vec<ReportUri>>,
    public_suffix_domain: Option<Value<PsdFlag>>,
    strict_mode: Option<Value<Flag>>,
    errors: Vec<RecordError>,
}

impl DmarcRecord {
    /// Parse and validate a DMARC TXT record. Never fails: problems are
    /// reported through [`DmarcRecord::errors`].
    pub fn parse(record: &str) -> Self {
        let tags = parse_tags(record);
        debug!(tags = tags.len(), "parsed DMARC tag list");
        let mut record = Self::from_tags(&tags);
        validator::validate(&mut record);
        record
    }

    #[deprecated(note = "use `DmarcRecord::parse` instead")]
    pub fn from_txt(record: &str) -> Self {
        Self::parse(record)
    }

    /// Build a record from raw tags without validating it.
    pub fn from_tags(tags: &TagMap) -> Self {
        for name in tags.unknown_tags() {
            debug!(tag = name, "ignoring unknown DMARC tag");
        }
        Self {
            version: tags.get(Tag::V).map(scalar),
            policy: typed(tags, Tag::P),
            subdomain_policy: typed(tags, Tag::Sp),
            nonexistent_subdomain_policy: typed(tags, Tag::Np),
            percentage: typed(tags, Tag::Pct),
            dkim_alignment: typed(tags, Tag::Adkim),
            spf_alignment: typed(tags, Tag::Aspf),
            report_format: typed(tags, Tag::Rf),
            report_interval: typed(tags, Tag::Ri),
            failure_options: tags.get(Tag::Fo).map(|raw| {
                let mut options: Vec<Value<FailureOption>> = Vec::new();
                for item in list(raw) {
                    let value = Value::parse(&item);
                    if !options.contains(&value) {
                        options.push(value);
                    }
                }
                options
            }),
            aggregate_report_uris: tags
                .get(Tag::Rua)
                .map(|raw| list(raw).into_iter().map(ReportUri::new).collect()),
            failure_report_uris: tags
                .get(Tag::Ruf)
                .map(|raw| list(raw).into_iter().map(ReportUri::new).collect()),
            public_suffix_domain: typed(tags, Tag::Psd),
            strict_mode: typed(tags, Tag::T),
            errors: Vec::new(),
        }
    }

    /// Record carrying a single lookup failure and no tags.
    pub(crate) fn lookup_failure(cause: impl fmt::Display) -> Self {
        let mut record = Self::default();
        record.errors.push(RecordError::lookup(cause));
        record
    }

    // ─── Presence ────────────────────────────────────────────────────

    /// Whether `tag` was published (with or without a value).
    pub fn has_tag(&self, tag: Tag) -> bool {
        match tag {
            Tag::V => self.version.is_some(),
            Tag::P => self.policy.is_some(),
            Tag::Sp => self.subdomain_policy.is_some(),
            Tag::Np => self.nonexistent_subdomain_policy.is_some(),
            Tag::Rua => self.aggregate_report_uris.is_some(),
            Tag::Ruf => self.failure_report_uris.is_some(),
            Tag::Adkim => self.dkim_alignment.is_some(),
            Tag::Aspf => self.spf_alignment.is_some(),
            Tag::Fo => self.failure_options.is_some(),
            Tag::Psd => self.public_suffix_domain.is_some(),
            Tag::T => self.strict_mode.is_some(),
            Tag::Pct => self.percentage.is_some(),
            Tag::Rf => self.report_format.is_some(),
            Tag::Ri => self.report_interval.is_some(),
        }
    }

    pub fn has_version(&self) -> bool {
        self.has_tag(Tag::V)
    }

    pub fn has_policy(&self) -> bool {
        self.has_tag(Tag::P)
    }

    pub fn has_subdomain_policy(&self) -> bool {
        self.has_tag(Tag::Sp)
    }

    pub fn has_nonexistent_subdomain_policy(&self) -> bool {
        self.has_tag(Tag::Np)
    }

    pub fn has_percentage(&self) -> bool {
        self.has_tag(Tag::Pct)
    }

    pub fn has_dkim_alignment(&self) -> bool {
        self.has_tag(Tag::Adkim)
    }

    pub fn has_spf_alignment(&self) -> bool {
        self.has_tag(Tag::Aspf)
    }

    pub fn has_report_format(&self) -> bool {
        self.has_tag(Tag::Rf)
    }

    pub fn has_report_interval(&self) -> bool {
        self.has_tag(Tag::Ri)
    }

    pub fn has_failure_options(&self) -> bool {
        self.has_tag(Tag::Fo)
    }

    pub fn has_aggregate_report_uris(&self) -> bool {
        self.has_tag(Tag::Rua)
    }

    pub fn has_failure_report_uris(&self) -> bool {
        self.has_tag(Tag::Ruf)
    }

    pub fn has_public_suffix_domain(&self) -> bool {
        self.has_tag(Tag::Psd)
    }

    pub fn has_strict_mode(&self) -> bool {
        self.has_tag(Tag::T)
    }

    // ─── Effective values ────────────────────────────────────────────

    /// The `v=` value, exactly as published.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `p=`. No default.
    pub fn policy(&self) -> Option<Policy> {
        self.policy.as_ref().and_then(Value::known)
    }

    /// `sp=`, or `p=` when `sp=` was omitted.
    pub fn subdomain_policy(&self) -> Option<Policy> {
        self.subdomain_policy_value().and_then(Value::known)
    }

    /// `np=`, falling back to the effective subdomain policy.
    pub fn nonexistent_subdomain_policy(&self) -> Option<Policy> {
        self.nonexistent_subdomain_policy
            .as_ref()
            .or_else(|| self.subdomain_policy_value())
            .and_then(Value::known)
    }

    /// `pct=`, default 100.
    pub fn percentage(&self) -> u32 {
        known_or(&self.percentage, DEFAULT_PERCENTAGE)
    }

    /// `adkim=`, default relaxed.
    pub fn dkim_alignment(&self) -> AlignmentMode {
        known_or(&self.dkim_alignment, AlignmentMode::Relaxed)
    }

    /// `aspf=`, default relaxed.
    pub fn spf_alignment(&self) -> AlignmentMode {
        known_or(&self.spf_alignment, AlignmentMode::Relaxed)
    }

    /// `rf=`, default afrf.
    pub fn report_format(&self) -> ReportFormat {
        known_or(&self.report_format, ReportFormat::Afrf)
    }

    /// `ri=` in seconds, default 86400.
    pub fn report_interval(&self) -> u32 {
        known_or(&self.report_interval, DEFAULT_REPORT_INTERVAL)
    }

    /// `fo=` options in published order; unrecognized options are dropped
    /// and an option list with none left means the default `0`.
    pub fn failure_options(&self) -> Vec<FailureOption> {
        let known: Vec<FailureOption> = self
            .failure_options
            .iter()
            .flatten()
            .filter_map(Value::known)
            .collect();
        if known.is_empty() {
            vec![FailureOption::Zero]
        } else {
            known
        }
    }

    /// `rua=`; empty when omitted.
    pub fn aggregate_report_uris(&self) -> &[ReportUri] {
        self.aggregate_report_uris.as_deref().unwrap_or_default()
    }

    /// `ruf=`; empty when omitted.
    pub fn failure_report_uris(&self) -> &[ReportUri] {
        self.failure_report_uris.as_deref().unwrap_or_default()
    }

    /// `psd=`, default unknown.
    pub fn public_suffix_domain(&self) -> PsdFlag {
        known_or(&self.public_suffix_domain, PsdFlag::Unknown)
    }

    /// `t=`, default n.
    pub fn strict_mode(&self) -> Flag {
        known_or(&self.strict_mode, Flag::No)
    }

    // ─── Published values ────────────────────────────────────────────

    pub fn policy_value(&self) -> Option<&Value<Policy>> {
        self.policy.as_ref()
    }

    /// Explicit `sp=`, else explicit `p=`.
    pub fn subdomain_policy_value(&self) -> Option<&Value<Policy>> {
        self.subdomain_policy.as_ref().or(self.policy.as_ref())
    }

    pub fn failure_options_value(&self) -> Option<&[Value<FailureOption>]> {
        self.failure_options.as_deref()
    }

    /// Text of a published tag; lists stay split.
    pub fn tag_value(&self, tag: Tag) -> Option<ActualValue> {
        fn text<T: TagValue>(v: &Option<Value<T>>) -> Option<ActualValue> {
            v.as_ref().map(|v| ActualValue::Scalar(Some(v.to_string())))
        }
        fn items<T: fmt::Display>(v: Option<&[T]>) -> Option<ActualValue> {
            v.map(|v| ActualValue::Sequence(v.iter().map(ToString::to_string).collect()))
        }
        match tag {
            Tag::V => self.version.clone().map(|v| ActualValue::Scalar(Some(v))),
            Tag::P => text(&self.policy),
            Tag::Sp => text(&self.subdomain_policy),
            Tag::Np => text(&self.nonexistent_subdomain_policy),
            Tag::Rua => items(self.aggregate_report_uris.as_deref()),
            Tag::Ruf => items(self.failure_report_uris.as_deref()),
            Tag::Adkim => text(&self.dkim_alignment),
            Tag::Aspf => text(&self.spf_alignment),
            Tag::Fo => items(self.failure_options.as_deref()),
            Tag::Psd => text(&self.public_suffix_domain),
            Tag::T => text(&self.strict_mode),
            Tag::Pct => text(&self.percentage),
            Tag::Rf => text(&self.report_format),
            Tag::Ri => text(&self.report_interval),
        }
    }

    // ─── Errors ──────────────────────────────────────────────────────

    pub fn errors(&self) -> &[RecordError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True when the record parsed and validated without errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn push_error(&mut self, error: RecordError) {
        self.errors.push(error);
    }

    // ─── Export ──────────────────────────────────────────────────────

    /// Published tags in canonical order, plus `errors` (rendered) if any.
    pub fn to_map(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        for tag in Tag::ALL {
            let json = match (tag, self.tag_value(tag)) {
                (_, None) => continue,
                (Tag::Pct, Some(_)) => numeric_json(&self.percentage),
                (Tag::Ri, Some(_)) => numeric_json(&self.report_interval),
                (_, Some(ActualValue::Scalar(v))) => JsonValue::String(v.unwrap_or_default()),
                (_, Some(ActualValue::Sequence(items))) => {
                    JsonValue::Array(items.into_iter().map(JsonValue::String).collect())
                }
            };
            map.insert(tag.name().to_string(), json);
        }
        if self.has_errors() {
            let errors = self.errors.iter().map(|e| JsonValue::String(e.to_string())).collect();
            map.insert("errors".to_string(), JsonValue::Array(errors));
        }
        map
    }
}

/// Canonical tag-list text: published tags only, in canonical order.
impl fmt::Display for DmarcRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in Tag::ALL {
            let text = match self.tag_value(tag) {
                None => continue,
                Some(ActualValue::Scalar(v)) => v.unwrap_or_default(),
                Some(ActualValue::Sequence(items)) => {
                    let sep = tag.list_separator().unwrap_or(',');
                    items.join(sep.to_string().as_str())
                }
            };
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}={}", tag, text)?;
        }
        Ok(())
    }
}

impl Serialize for DmarcRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

fn scalar(raw: &RawValue) -> String {
    match raw {
        RawValue::Missing => String::new(),
        RawValue::Scalar(s) => s.clone(),
        RawValue::List(items) => items.join(","),
    }
}

fn list(raw: &RawValue) -> Vec<String> {
    match raw {
        RawValue::Missing => Vec::new(),
        RawValue::Scalar(s) => vec![s.clone()],
        RawValue::List(items) => items.clone(),
    }
}

fn typed<T: TagValue>(tags: &TagMap, tag: Tag) -> Option<Value<T>> {
    tags.get(tag).map(|raw| Value::parse(&scalar(raw)))
}

fn known_or<T: TagValue>(value: &Option<Value<T>>, default: T) -> T {
    value.as_ref().and_then(Value::known).unwrap_or(default)
}

fn numeric_json(value: &Option<Value<u32>>) -> JsonValue {
    match value {
        Some(Value::Known(n)) => JsonValue::from(*n),
        Some(Value::Unrecognized(raw)) => JsonValue::String(raw.clone()),
        None => JsonValue::Null,
    }
}
