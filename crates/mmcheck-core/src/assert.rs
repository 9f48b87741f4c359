#![forbid(unsafe_op_in_unsafe_fn)]

//! Standard/critical and typed assertions.
//!
//! Callers normally go through `require!`, `require_critical!`,
//! `require_type!`, `require_type_critical!` and `not_reached!`, which pass
//! the literal condition text and call site. Conditions arrive as closures:
//! a disabled profile type-checks them but never runs them.

use crate::invariant::Checker;
use crate::profile::Profile;
use crate::sig::Checkable;
use crate::sink::{self, FailureKind, SourceSite};

/// Standard assertion: active only in the `full` profile.
#[inline(always)]
pub fn standard<P: Profile>(cond: impl FnOnce() -> bool, text: &'static str, site: SourceSite) {
    if P::STANDARD && !cond() {
        sink::report(text, FailureKind::Standard, site);
    }
}

/// Critical assertion: active in `full` and `critical-only`.
#[inline(always)]
pub fn critical<P: Profile>(cond: impl FnOnce() -> bool, text: &'static str, site: SourceSite) {
    if P::CRITICAL && !cond() {
        sink::report(text, FailureKind::Critical, site);
    }
}

/// Marks a path that must never execute.
///
/// # Safety
/// Under `strict-off` this is a compiler-level unreachable point because every
/// check has been compiled out: the caller must guarantee it is never reached.
/// The other profiles report an `"unreachable"` failure instead.
#[inline(always)]
pub unsafe fn unreachable<P: Profile>(site: SourceSite) {
    if P::REPORTS_UNREACHABLE {
        sink::report("unreachable statement", FailureKind::Unreachable, site);
    } else {
        // SAFETY: forwarded from this function's contract.
        unsafe { std::hint::unreachable_unchecked() }
    }
}

// Runs the predicate at the process-wide depth.
#[inline(always)]
fn type_check<P: Profile, T: Checkable + ?Sized>(val: Option<&T>, site: SourceSite) -> bool {
    match val {
        Some(v) => v.check(Checker::<P>::current(site).depth()),
        None => false,
    }
}

/// Standard assertion that the object produced by `val` is present and
/// passes its check predicate.
#[inline(always)]
pub fn typed<'a, P, T, V, F>(val: F, text: &'static str, site: SourceSite)
where
    P: Profile,
    T: Checkable + 'a,
    V: Into<Option<&'a T>>,
    F: FnOnce() -> V,
{
    if P::STANDARD && !type_check::<P, T>(val().into(), site) {
        sink::report(text, FailureKind::TypeCheck, site);
    }
}

/// Critical form of [`typed`].
#[inline(always)]
pub fn typed_critical<'a, P, T, V, F>(val: F, text: &'static str, site: SourceSite)
where
    P: Profile,
    T: Checkable + 'a,
    V: Into<Option<&'a T>>,
    F: FnOnce() -> V,
{
    if P::CRITICAL && !type_check::<P, T>(val().into(), site) {
        sink::report(text, FailureKind::TypeCheck, site);
    }
}
