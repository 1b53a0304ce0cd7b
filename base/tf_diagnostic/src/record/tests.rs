use super::*;
use pretty_assertions::assert_eq;

fn base(code: DiagnosticCode, commentary: &str) -> DiagnosticBase {
    DiagnosticBase::new(
        code,
        Cow::Borrowed(code.name()),
        CallContext::new("stage.rs", "open", 12, "usd::stage::open"),
        commentary.to_owned(),
        None,
        false,
    )
}

#[test]
fn accessors_reflect_construction() {
    let err = Error::new(base(DiagnosticCode::RUNTIME_ERROR, "could not open"));
    assert_eq!(err.commentary(), "could not open");
    assert_eq!(err.pretty_print_string(), "could not open");
    assert_eq!(err.diagnostic_code(), DiagnosticCode::RUNTIME_ERROR);
    assert_eq!(err.diagnostic_code_as_str(), "RuntimeError");
    assert_eq!(err.source_file(), "stage.rs");
    assert_eq!(err.source_function(), "open");
    assert_eq!(err.source_line(), 12);
    assert_eq!(err.serial(), 0);
    assert!(!err.is_quiet());
    assert!(err.info().is_none());
}

#[test]
fn predicates_follow_code() {
    let coding = Error::new(base(DiagnosticCode::CODING_ERROR, "bad call"));
    assert!(coding.is_coding_error());
    assert!(!coding.is_fatal());

    let fatal = Error::new(base(DiagnosticCode::FATAL_CODING_ERROR, "worse"));
    assert!(fatal.is_coding_error());
    assert!(fatal.is_fatal());

    let warning = Warning::new(base(DiagnosticCode::WARNING, "hmm"));
    assert!(!warning.is_fatal());
    assert!(!warning.is_coding_error());
}

#[test]
fn augment_commentary_joins_with_newline() {
    let mut err = Error::new(base(DiagnosticCode::RUNTIME_ERROR, "first"));
    err.augment_commentary("second");
    err.augment_commentary("third");
    assert_eq!(err.commentary(), "first\nsecond\nthird");
}

#[test]
fn augment_empty_commentary_has_no_leading_newline() {
    let mut status = Status::new(base(DiagnosticCode::STATUS, ""));
    status.augment_commentary("loaded");
    assert_eq!(status.commentary(), "loaded");
}

#[test]
fn info_payload_downcasts() {
    let mut b = base(DiagnosticCode::RUNTIME_ERROR, "with info");
    b.info = Some(DiagnosticInfo::new(17_usize));
    let err = Error::new(b);
    assert_eq!(err.info_as::<usize>(), Some(&17));
    assert_eq!(err.info_as::<String>(), None);
    assert!(err.info().is_some_and(DiagnosticInfo::is::<usize>));
    assert_eq!(format!("{:?}", err.info()), "Some(DiagnosticInfo(..))");
}

#[test]
fn clone_shares_info() {
    let mut b = base(DiagnosticCode::RUNTIME_ERROR, "shared");
    b.info = Some(DiagnosticInfo::new(String::from("payload")));
    let err = Error::new(b);
    let copy = err.clone();
    assert_eq!(copy.info_as::<String>().map(String::as_str), Some("payload"));
    assert_eq!(copy.commentary(), err.commentary());
}
