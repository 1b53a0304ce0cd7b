//! Property-based tests for error marks and serial ordering.
//!
//! Random sequences of posts, nested marks, clears, and erasures are run
//! against a private manager and checked against a plain vector model.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    reason = "Proptest macros generate code with these patterns"
)]

use proptest::prelude::*;
use tf_diagnostic::{
    CallContext, DiagnosticCode, DiagnosticConfig, DiagnosticMgr, EchoTarget, Error, ErrorMark,
    ErrorPos,
};

const CTX: CallContext = CallContext::new("model.rs", "step", 1, "model::step");

#[derive(Clone, Debug)]
enum Op {
    Error,
    Warning,
    Status,
    OpenMark,
    ClearMark,
    EraseFirst,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Error),
        1 => Just(Op::Warning),
        1 => Just(Op::Status),
        2 => Just(Op::OpenMark),
        2 => Just(Op::ClearMark),
        1 => Just(Op::EraseFirst),
    ]
}

fn silent() -> DiagnosticMgr {
    DiagnosticMgr::new(DiagnosticConfig::default().with_echo(EchoTarget::Silent))
}

fn commentaries(errors: &[Error]) -> Vec<String> {
    errors.iter().map(|e| e.commentary().to_owned()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Every mark sees exactly the errors posted since it was armed and
    /// not yet removed; the thread list matches the model.
    #[test]
    fn prop_marks_match_model(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mgr = silent();
        let mut model: Vec<String> = Vec::new();
        // Each open mark and the model length when it was armed.
        let mut marks: Vec<(ErrorMark<'_>, usize)> = Vec::new();
        let mut posted = 0usize;

        for op in ops {
            match op {
                Op::Error => {
                    let msg = format!("e{posted}");
                    posted += 1;
                    mgr.post_error(
                        DiagnosticCode::RUNTIME_ERROR,
                        "RuntimeError",
                        CTX,
                        msg.clone(),
                        None,
                        false,
                    );
                    model.push(msg);
                }
                Op::Warning => {
                    mgr.post_warning(DiagnosticCode::WARNING, "Warning", CTX, "w", None, false);
                }
                Op::Status => {
                    mgr.post_status(DiagnosticCode::STATUS, "Status", CTX, "s", None, false);
                }
                Op::OpenMark => {
                    marks.push((ErrorMark::with_manager(&mgr), model.len()));
                }
                Op::ClearMark => {
                    if let Some((mut mark, start)) = marks.pop() {
                        let had_errors = model.len() > start;
                        prop_assert_eq!(mark.clear(), had_errors);
                        model.truncate(start);
                    }
                }
                Op::EraseFirst => {
                    if !model.is_empty() {
                        mgr.erase_error(mgr.error_begin());
                        model.remove(0);
                        for (_, start) in &mut marks {
                            *start = start.saturating_sub(1);
                        }
                    }
                }
            }

            prop_assert_eq!(commentaries(&mgr.errors()), model.clone());
            prop_assert_eq!(mgr.has_active_error_mark(), !marks.is_empty());
            for (mark, start) in &marks {
                let start = *start;
                prop_assert_eq!(commentaries(&mark.errors()), model[start..].to_vec());
                prop_assert_eq!(mark.len(), model.len() - start);
            }
        }
    }

    /// Serials in a thread's list are strictly increasing, whatever was
    /// posted or erased in between.
    #[test]
    fn prop_serials_strictly_increase(
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let mgr = silent();
        for op in ops {
            match op {
                Op::Error | Op::OpenMark | Op::ClearMark => mgr.post_error(
                    DiagnosticCode::CODING_ERROR,
                    "CodingError",
                    CTX,
                    "e",
                    None,
                    false,
                ),
                Op::Warning => {
                    mgr.post_warning(DiagnosticCode::WARNING, "Warning", CTX, "w", None, false);
                }
                Op::Status => {
                    mgr.post_status(DiagnosticCode::STATUS, "Status", CTX, "s", None, false);
                }
                Op::EraseFirst => {
                    mgr.erase_error(mgr.error_begin());
                }
            }
        }

        let errors = mgr.errors();
        prop_assert!(errors.windows(2).all(|w| w[0].serial() < w[1].serial()));

        // Walking backwards visits the same positions in reverse.
        let mut backwards = Vec::new();
        let mut pos = ErrorPos::END;
        while let Some(prev) = mgr.prev_error_pos(pos) {
            backwards.push(prev.serial().expect("not the end"));
            pos = prev;
        }
        backwards.reverse();
        let forwards: Vec<u64> = errors.iter().map(|e| e.serial()).collect();
        prop_assert_eq!(backwards, forwards);
    }
}
