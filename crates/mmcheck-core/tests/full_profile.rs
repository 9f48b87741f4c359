//! Macro-level behaviour of the default `full` build.
#![cfg(feature = "full")]

mod common;

use common::{Block, Segment};
use mmcheck_core::{
    check_down, check_local, check_sig, not_reached, require, require_critical, require_type,
    set_check_depth_raw, statistic, tally, Capture, CheckDepth, Checkable, FailureKind,
};

#[test]
fn true_conditions_report_nothing() {
    let free = 16usize;
    let size = 64usize;
    let records = Capture::new().run(|| {
        require!(free <= size);
        require_critical!(size.is_power_of_two());
    });
    assert!(records.is_empty());
}

#[test]
fn false_standard_assertion_carries_text_and_site() {
    let x = 0;
    let (line, records) = Capture::new().run_with(|| {
        let line = line!() + 1;
        require!(x > 0);
        line
    });
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.message, "x > 0");
    assert!(r.is(FailureKind::Standard));
    assert!(r.file.ends_with("full_profile.rs"));
    assert_eq!(r.line, line);
}

#[test]
fn checked_code_continues_under_a_returning_handler() {
    let mut after = false;
    let records = Capture::new().run(|| {
        require_critical!(1 + 1 == 3);
        after = true;
    });
    assert!(after);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "1 + 1 == 3");
    assert!(records[0].is(FailureKind::Critical));
}

#[test]
fn typed_assertion_runs_the_check_predicate() {
    let block = Block::new(12);
    let records = Capture::new().depth(CheckDepth::Shallow).run(|| {
        require_type!(Block, &block);
    });
    // The predicate runs once; its failed local check also fails the assertion.
    assert_eq!(block.check_count(), 1);
    assert_eq!(records.len(), 2);
    assert!(records[0].is(FailureKind::Standard));
    assert_eq!(records[0].message, "self.size % 8 == 0");
    assert!(records[1].is(FailureKind::TypeCheck));
    assert_eq!(records[1].message, "TypeCheck Block: &block");
}

#[test]
fn typed_assertion_passes_for_a_well_formed_object() {
    let block = Block::new(64);
    let records = Capture::new().depth(CheckDepth::Deep).run(|| {
        require_type!(Block, &block);
    });
    assert!(records.is_empty());
    assert_eq!(block.check_count(), 1);
}

#[test]
fn corrupted_child_fails_the_parent_predicate() {
    let segment = Segment::new(Block::new(64));
    segment.block.invalidate();

    let records = Capture::new().depth(CheckDepth::Deep).run(|| {
        assert!(!segment.check(CheckDepth::Deep));
    });
    assert_eq!(records.len(), 2);
    assert!(records[0].is(FailureKind::Signature));
    assert_eq!(records[0].message, "SigCheck Block: self");
    assert!(records[1].is(FailureKind::TypeCheck));

    let records = Capture::new().depth(CheckDepth::Shallow).run(|| {
        require_type!(Segment, &segment);
    });
    assert_eq!(records.len(), 2);
    assert!(records[0].is(FailureKind::Signature));
    assert_eq!(records[0].message, "SigCheck Block: &*self.block");
    assert!(records[1].is(FailureKind::TypeCheck));
    assert_eq!(records[1].message, "TypeCheck Segment: &segment");
}

#[test]
fn typed_assertion_message_names_the_type() {
    let records = Capture::new().run(|| {
        require_type!(Block, None::<&Block>);
    });
    assert_eq!(records.len(), 1);
    assert!(records[0].is(FailureKind::TypeCheck));
    assert!(records[0].message.starts_with("TypeCheck Block: "));
}

#[test]
fn not_reached_reports_unreachable() {
    let records = Capture::new().run(|| {
        not_reached!();
    });
    assert_eq!(records.len(), 1);
    assert!(records[0].is(FailureKind::Unreachable));
    assert_eq!(records[0].message, "unreachable statement");
}

#[test]
fn local_check_at_none_is_not_evaluated() {
    let mut evaluated = 0u32;
    let records = Capture::new().depth(CheckDepth::None).run(|| {
        assert!(check_local!({
            evaluated += 1;
            false
        }));
    });
    assert!(records.is_empty());
    assert_eq!(evaluated, 0);
}

#[test]
fn shallow_descendant_check_skips_the_predicate() {
    let segment = Segment::new(Block::new(64));
    let records = Capture::new().depth(CheckDepth::Shallow).run(|| {
        assert!(check_down!(Segment, &segment));
    });
    assert!(records.is_empty());
    assert_eq!(segment.block.check_count(), 0);
}

#[test]
fn deep_check_of_well_formed_structure_passes() {
    let segment = Segment::new(Block::new(64));
    let records = Capture::new().depth(CheckDepth::Deep).run(|| {
        assert!(check_down!(Segment, &segment));
    });
    assert!(records.is_empty());
    assert_eq!(segment.block.check_count(), 1);
}

#[test]
fn corrupted_signature_is_reported_once_by_shallow_check() {
    let segment = Segment::new(Block::new(64));
    let clean = Capture::new().depth(CheckDepth::Deep).run(|| {
        assert!(check_down!(Segment, &segment));
    });
    assert!(clean.is_empty());

    segment.invalidate();
    let records = Capture::new().depth(CheckDepth::Shallow).run(|| {
        assert!(!check_down!(Segment, &segment));
    });
    assert_eq!(records.len(), 1);
    assert!(records[0].is(FailureKind::Signature));
    assert!(records[0].message.contains("Segment"));
}

#[test]
fn back_reference_check_names_the_owner_type() {
    let segment = Segment::new(Block::new(64));
    let records = Capture::new().depth(CheckDepth::Deep).run(|| {
        assert!(Segment::check_owner(Some(&segment)));
        assert!(!Segment::check_owner(None));
    });
    assert_eq!(records.len(), 1);
    assert!(records[0].is(FailureKind::Signature));
    assert_eq!(records[0].message, "SigCheck Segment: owner");
    assert_eq!(segment.block.check_count(), 0);
}

#[test]
fn out_of_range_depth_is_unreachable() {
    let records = Capture::new().depth(CheckDepth::Shallow).run(|| {
        set_check_depth_raw(7);
        assert!(check_local!(false));
    });
    assert_eq!(records.len(), 1);
    assert!(records[0].is(FailureKind::Unreachable));
    assert_eq!(mmcheck_core::check_depth(), Some(CheckDepth::Shallow));
}

#[test]
fn signature_check_ignores_an_out_of_range_depth() {
    let block = Block::new(64);
    let records = Capture::new().depth(CheckDepth::Shallow).run(|| {
        set_check_depth_raw(7);
        assert!(check_sig!(Block, &block));
    });
    assert!(records.is_empty());

    block.invalidate();
    let records = Capture::new().depth(CheckDepth::Shallow).run(|| {
        set_check_depth_raw(7);
        assert!(!check_sig!(Block, &block));
    });
    assert_eq!(records.len(), 1);
    assert!(records[0].is(FailureKind::Signature));
    assert_eq!(records[0].message, "SigCheck Block: &block");
}

#[test]
fn statistic_is_evaluated_once_per_invocation() {
    let mut allocs = 0u64;
    for _ in 0..10 {
        statistic!(allocs += 1);
    }
    assert_eq!(allocs, 10);
}

#[test]
fn tally_counts_reports_by_kind() {
    let (delta, records) = Capture::new().run_with(|| {
        let before = tally();
        require!(false);
        require!(false);
        require_critical!(false);
        let after = tally();
        (
            after.standard - before.standard,
            after.critical - before.critical,
            after.total() - before.total(),
        )
    });
    assert_eq!(records.len(), 3);
    assert_eq!(delta, (2, 1, 3));
}

#[test]
fn predicate_depth_wins_over_the_context() {
    let segment = Segment::new(Block::new(12));
    let records = Capture::new().depth(CheckDepth::Deep).run(|| {
        assert!(segment.check(CheckDepth::Shallow));
    });
    assert!(records.is_empty());
    assert_eq!(segment.block.check_count(), 0);

    let records = Capture::new().depth(CheckDepth::None).run(|| {
        assert!(!segment.check(CheckDepth::Deep));
    });
    assert_eq!(segment.block.check_count(), 1);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message, "self.size % 8 == 0");
    assert!(records[1].is(FailureKind::TypeCheck));
    assert_eq!(records[1].message, "TypeCheck Block: &*self.block");
}
