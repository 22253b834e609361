//! Rule tables and validation passes for parsed DMARC records.

use tracing::debug;

use super::error::{ActualValue, Expected, RecordError};
use super::record::DmarcRecord;
use super::types::{AlignmentMode, FailureOption, Flag, Policy, PsdFlag, ReportFormat, Tag};

/// Constraint shown for malformed report URIs.
pub const URI_EXAMPLE: &str = "mailto:username@somehost.com";

pub const DMARC_VERSION: &str = "DMARC1";

/// A required tag, checked against its effective value.
struct RequiredRule {
    tag: Tag,
    effective: fn(&DmarcRecord) -> ActualValue,
    expected: Expected,
}

static REQUIRED_RULES: [RequiredRule; 3] = [
    RequiredRule {
        tag: Tag::V,
        effective: effective_version,
        expected: Expected::Literal(DMARC_VERSION),
    },
    RequiredRule {
        tag: Tag::P,
        effective: effective_policy,
        expected: Expected::OneOf(Policy::NAMES),
    },
    RequiredRule {
        tag: Tag::Sp,
        effective: effective_subdomain_policy,
        expected: Expected::OneOf(Policy::NAMES),
    },
];

/// Optional tags, checked only when published.
static OPTIONAL_RULES: [(Tag, Expected); 9] = [
    (Tag::Fo, Expected::OneOf(FailureOption::NAMES)),
    (Tag::Rf, Expected::OneOf(ReportFormat::NAMES)),
    (Tag::Aspf, Expected::OneOf(AlignmentMode::NAMES)),
    (Tag::Adkim, Expected::OneOf(AlignmentMode::NAMES)),
    (Tag::Pct, Expected::Range(0, 100)),
    (Tag::Ri, Expected::Range(0, 86400)),
    (Tag::Np, Expected::OneOf(Policy::NAMES)),
    (Tag::Psd, Expected::OneOf(PsdFlag::NAMES)),
    (Tag::T, Expected::OneOf(Flag::NAMES)),
];

fn effective_version(record: &DmarcRecord) -> ActualValue {
    ActualValue::Scalar(record.version().map(str::to_string))
}

fn effective_policy(record: &DmarcRecord) -> ActualValue {
    ActualValue::Scalar(record.policy_value().map(ToString::to_string))
}

fn effective_subdomain_policy(record: &DmarcRecord) -> ActualValue {
    ActualValue::Scalar(record.subdomain_policy_value().map(ToString::to_string))
}

/// Validate `record`, appending one error per violated rule.
///
/// Order: required tags (v, p, sp), published optional tags in table
/// order, then `rua` URIs followed by `ruf` URIs.
pub fn validate(record: &mut DmarcRecord) {
    let errors = check(record);
    debug!(errors = errors.len(), "validated DMARC record");
    for error in errors {
        record.push_error(error);
    }
}

/// Run every rule against `record` without modifying it.
pub fn check(record: &DmarcRecord) -> Vec<RecordError> {
    let mut errors = Vec::new();
    check_required(record, &mut errors);
    check_optional(record, &mut errors);
    check_uris(record, &mut errors);
    errors
}

fn check_required(record: &DmarcRecord, errors: &mut Vec<RecordError>) {
    for rule in &REQUIRED_RULES {
        let actual = (rule.effective)(record);
        if !satisfies(&actual, &rule.expected) {
            errors.push(RecordError::violation(rule.tag, actual, rule.expected));
        }
    }
}

fn check_optional(record: &DmarcRecord, errors: &mut Vec<RecordError>) {
    for (tag, expected) in &OPTIONAL_RULES {
        // Presence, not the effective value, decides whether a rule applies.
        let Some(actual) = record.tag_value(*tag) else {
            continue;
        };
        if !satisfies(&actual, expected) {
            errors.push(RecordError::violation(*tag, actual, *expected));
        }
    }
}

fn check_uris(record: &DmarcRecord, errors: &mut Vec<RecordError>) {
    let lists = [
        (Tag::Rua, record.aggregate_report_uris()),
        (Tag::Ruf, record.failure_report_uris()),
    ];
    for (tag, uris) in lists {
        for uri in uris {
            if uri.to_url().is_err() {
                errors.push(RecordError::violation(
                    tag,
                    ActualValue::Scalar(Some(uri.to_string())),
                    Expected::Literal(URI_EXAMPLE),
                ));
            }
        }
    }
}

fn satisfies(actual: &ActualValue, expected: &Expected) -> bool {
    match actual {
        ActualValue::Scalar(Some(value)) => expected.admits(value),
        ActualValue::Scalar(None) => false,
        ActualValue::Sequence(items) => expected.admits_all(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_of(record: &DmarcRecord) -> Vec<Option<Tag>> {
        record.errors().iter().map(RecordError::tag).collect()
    }

    #[test]
    fn valid_minimal_record() {
        let r = DmarcRecord::parse("v=DMARC1; p=reject");
        assert!(r.errors().is_empty());
        assert_eq!(r.policy(), Some(Policy::Reject));
        assert_eq!(r.subdomain_policy(), Some(Policy::Reject));
    }

    #[test]
    fn missing_version() {
        let r = DmarcRecord::parse("p=reject");
        assert_eq!(r.errors().len(), 1);
        let err = &r.errors()[0];
        assert_eq!(err.tag(), Some(Tag::V));
        assert_eq!(err.actual_value(), Some(&ActualValue::Scalar(None)));
        assert_eq!(err.expected_constraint(), Some(&Expected::Literal("DMARC1")));
    }

    #[test]
    fn wrong_version() {
        let r = DmarcRecord::parse("v=DMARC2; p=none");
        assert_eq!(tags_of(&r), vec![Some(Tag::V)]);
        assert_eq!(
            r.errors()[0].actual_value(),
            Some(&ActualValue::Scalar(Some("DMARC2".into())))
        );
    }

    #[test]
    fn version_is_case_sensitive() {
        let r = DmarcRecord::parse("v=dmarc1; p=none");
        assert_eq!(tags_of(&r), vec![Some(Tag::V)]);
    }

    #[test]
    fn missing_policy_reports_p_and_sp() {
        let r = DmarcRecord::parse("v=DMARC1");
        assert_eq!(tags_of(&r), vec![Some(Tag::P), Some(Tag::Sp)]);
    }

    #[test]
    fn explicit_sp_satisfies_sp_rule() {
        let r = DmarcRecord::parse("v=DMARC1; sp=none");
        assert_eq!(tags_of(&r), vec![Some(Tag::P)]);
    }

    #[test]
    fn empty_record_reports_required_tags_in_order() {
        let r = DmarcRecord::parse("");
        assert_eq!(tags_of(&r), vec![Some(Tag::V), Some(Tag::P), Some(Tag::Sp)]);
    }

    #[test]
    fn invalid_policy_propagates_to_sp() {
        let r = DmarcRecord::parse("v=DMARC1; p=sometimes");
        assert_eq!(tags_of(&r), vec![Some(Tag::P), Some(Tag::Sp)]);
        assert_eq!(
            r.errors()[1].actual_value(),
            Some(&ActualValue::Scalar(Some("sometimes".into())))
        );
    }

    #[test]
    fn case_insensitive_values_are_valid() {
        let r = DmarcRecord::parse("v=DMARC1; P=Quarantine; ADKIM=S; ASPF=R; rf=AFRF");
        assert!(r.is_valid(), "{:?}", r.errors());
    }

    #[test]
    fn failure_options_valid() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; fo=0:1:d");
        assert!(r.is_valid());
        assert_eq!(
            r.failure_options(),
            vec![FailureOption::Zero, FailureOption::One, FailureOption::D]
        );
    }

    #[test]
    fn failure_options_invalid_member() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; fo=0:9");
        assert_eq!(r.errors().len(), 1);
        let err = &r.errors()[0];
        assert_eq!(err.tag(), Some(Tag::Fo));
        assert_eq!(
            err.actual_value(),
            Some(&ActualValue::Sequence(vec!["0".into(), "9".into()]))
        );
        assert_eq!(err.expected_constraint(), Some(&Expected::OneOf(&["0", "1", "d", "s"])));
    }

    #[test]
    fn failure_options_blank() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; fo=");
        assert_eq!(tags_of(&r), vec![Some(Tag::Fo)]);
        assert!(r.errors()[0].to_string().contains("Current value is blank"));
    }

    #[test]
    fn failure_options_only_separators() {
        for input in ["v=DMARC1; p=none; fo=:", "v=DMARC1; p=none; fo=::"] {
            let r = DmarcRecord::parse(input);
            assert_eq!(tags_of(&r), vec![Some(Tag::Fo)]);
            assert!(r.errors()[0].to_string().contains("Current value is blank"));

            let again = DmarcRecord::parse(&r.to_string());
            assert_eq!(again.to_map(), r.to_map());
        }
    }

    #[test]
    fn scalar_tag_without_value_is_blank() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; adkim");
        assert!(r.has_dkim_alignment());
        assert_eq!(tags_of(&r), vec![Some(Tag::Adkim)]);
        let err = &r.errors()[0];
        assert_eq!(err.actual_value(), Some(&ActualValue::Scalar(Some(String::new()))));
        assert_eq!(
            err.to_string(),
            "Invalid adkim tag. Current value is blank. Value should be one of these: r, s"
        );
        assert_eq!(r.dkim_alignment(), AlignmentMode::Relaxed);
    }

    #[test]
    fn alignment_and_format_rules() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; adkim=x; aspf=y; rf=xml");
        assert_eq!(tags_of(&r), vec![Some(Tag::Rf), Some(Tag::Aspf), Some(Tag::Adkim)]);
    }

    #[test]
    fn numeric_ranges_enforced() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; pct=150; ri=90000");
        assert_eq!(tags_of(&r), vec![Some(Tag::Pct), Some(Tag::Ri)]);
        assert_eq!(r.errors()[0].expected_constraint(), Some(&Expected::Range(0, 100)));

        let r = DmarcRecord::parse("v=DMARC1; p=none; pct=0; ri=86400");
        assert!(r.is_valid());
    }

    #[test]
    fn non_numeric_percentage() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; pct=abc");
        assert_eq!(tags_of(&r), vec![Some(Tag::Pct)]);
        assert_eq!(r.percentage(), 100);
    }

    #[test]
    fn dmarcbis_tags() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; np=reject; psd=n; t=y");
        assert!(r.is_valid());

        let r = DmarcRecord::parse("v=DMARC1; p=none; np=maybe; psd=x; t=u");
        assert_eq!(tags_of(&r), vec![Some(Tag::Np), Some(Tag::Psd), Some(Tag::T)]);
    }

    #[test]
    fn uri_lists() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; rua=mailto:a@x.com,mailto:b@x.com");
        assert!(r.is_valid());
        assert_eq!(r.aggregate_report_uris().len(), 2);
    }

    #[test]
    fn malformed_uri() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; rua=not-a-uri");
        assert_eq!(r.errors().len(), 1);
        let err = &r.errors()[0];
        assert_eq!(err.tag(), Some(Tag::Rua));
        assert_eq!(err.expected_constraint(), Some(&Expected::Literal(URI_EXAMPLE)));
        assert_eq!(
            err.to_string(),
            "Invalid rua tag. Current value is not-a-uri. Value should be mailto:username@somehost.com"
        );
    }

    #[test]
    fn aggregate_uris_checked_before_failure_uris() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; ruf=bad-ruf; rua=mailto:ok@x.com,bad-rua");
        assert_eq!(tags_of(&r), vec![Some(Tag::Rua), Some(Tag::Ruf)]);
    }

    #[test]
    fn errors_accumulate_in_rule_order() {
        let r = DmarcRecord::parse("p=bogus; fo=7; adkim=q; pct=999; rua=nope");
        assert_eq!(
            tags_of(&r),
            vec![
                Some(Tag::V),
                Some(Tag::P),
                Some(Tag::Sp),
                Some(Tag::Fo),
                Some(Tag::Adkim),
                Some(Tag::Pct),
                Some(Tag::Rua),
            ]
        );
    }

    #[test]
    fn validate_appends() {
        let mut r = DmarcRecord::parse("p=reject");
        assert_eq!(r.errors().len(), 1);
        validate(&mut r);
        assert_eq!(r.errors().len(), 2);
        assert_eq!(r.errors()[0], r.errors()[1]);
    }

    #[test]
    fn record_with_percentage_and_aggregate_uri() {
        let r = DmarcRecord::parse("v=DMARC1; p=none; pct=50; rua=mailto:agg@example.com");
        assert_eq!(r.version(), Some("DMARC1"));
        assert_eq!(r.policy(), Some(Policy::None));
        assert_eq!(r.percentage(), 50);
        assert_eq!(r.aggregate_report_uris()[0].as_str(), "mailto:agg@example.com");
        assert!(r.errors().is_empty());
    }

    #[test]
    fn reparse_of_serialized_record_is_stable() {
        let inputs = [
            "v=DMARC1; p=reject",
            "v=DMARC1;p=quarantine;sp=none;np=reject;adkim=s;aspf=s;pct=25;fo=1:d;rf=iodef;ri=3600",
            "V=DMARC1; P=Reject; rua=mailto:a@x.com, mailto:b@x.com!10m; psd=y; t=n",
        ];
        for input in inputs {
            let first = DmarcRecord::parse(input);
            let second = DmarcRecord::parse(&first.to_string());
            assert_eq!(second.to_map(), first.to_map(), "{}", input);
        }
    }
}
