#![forbid(unsafe_op_in_unsafe_fn)]

//! Graduated invariant checks.
//!
//! A second, runtime axis on top of the build profile. Check predicates use
//! these operations to verify an object and its neighbours:
//!
//! | operation | `None` | `Shallow` | `Deep` |
//! |-----------|--------|-----------|--------|
//! | `sig`     | signature test | signature test | signature test |
//! | `local`   | elided | condition | condition |
//! | `down`    | elided | signature test | child's check predicate at `Deep` |
//! | `up`      | elided | signature test | signature test |
//!
//! Back-references are never traversed deeper than a signature test, so
//! cyclic owner graphs cannot recurse without bound. Outside the `full`
//! profile every operation is a type-checked no-op that returns `true`.

use std::marker::PhantomData;

use crate::context::{self, CheckDepth};
use crate::profile::Profile;
use crate::sig::{sig_test, Checkable, Signed};
use crate::sink::{self, FailureKind, SourceSite};

/// Invariant checker bound to a profile and a depth.
#[derive(Debug, Clone, Copy)]
pub struct Checker<P: Profile> {
    depth: CheckDepth,
    _profile: PhantomData<P>,
}

impl<P: Profile> Checker<P> {
    /// Checker with an explicit depth.
    #[inline]
    pub const fn at(depth: CheckDepth) -> Self {
        Self {
            depth,
            _profile: PhantomData,
        }
    }

    /// Checker at the process-wide depth. The context is only read when the
    /// profile has the invariant layer; an out-of-range depth word is
    /// reported as unreachable and treated as `None`.
    #[inline]
    pub fn current(site: SourceSite) -> Self {
        if !P::INVARIANTS {
            return Self::at(CheckDepth::None);
        }
        match context::check_depth() {
            Some(depth) => Self::at(depth),
            None => {
                sink::report("unreachable statement", FailureKind::Unreachable, site);
                Self::at(CheckDepth::None)
            }
        }
    }

    #[inline]
    pub fn depth(&self) -> CheckDepth {
        self.depth
    }

    /// Signature assertion, independent of depth.
    #[inline]
    #[must_use]
    pub fn sig<'a, T, V, F>(self, val: F, text: &'static str, site: SourceSite) -> bool
    where
        T: Signed + 'a,
        V: Into<Option<&'a T>>,
        F: FnOnce() -> V,
    {
        if !P::INVARIANTS {
            return true;
        }
        signature::<T>(val().into(), text, site)
    }

    /// Local invariant.
    #[inline]
    #[must_use]
    pub fn local(self, cond: impl FnOnce() -> bool, text: &'static str, site: SourceSite) -> bool {
        if !P::INVARIANTS {
            return true;
        }
        match self.depth {
            CheckDepth::None => true,
            CheckDepth::Shallow | CheckDepth::Deep => {
                if cond() {
                    true
                } else {
                    sink::report(text, FailureKind::Standard, site);
                    false
                }
            }
        }
    }

    /// Descendant (owned object) check.
    #[inline]
    #[must_use]
    pub fn down<'a, T, V, F>(
        self,
        val: F,
        sig_text: &'static str,
        type_text: &'static str,
        site: SourceSite,
    ) -> bool
    where
        T: Checkable + 'a,
        V: Into<Option<&'a T>>,
        F: FnOnce() -> V,
    {
        if !P::INVARIANTS {
            return true;
        }
        match self.depth {
            CheckDepth::None => true,
            CheckDepth::Shallow => signature::<T>(val().into(), sig_text, site),
            CheckDepth::Deep => {
                let child: Option<&T> = val().into();
                let ok = match child {
                    Some(child) => child.check(CheckDepth::Deep),
                    None => false,
                };
                if !ok {
                    sink::report(type_text, FailureKind::TypeCheck, site);
                }
                ok
            }
        }
    }

    /// Ancestor (back-reference) check.
    #[inline]
    #[must_use]
    pub fn up<'a, T, V, F>(self, val: F, text: &'static str, site: SourceSite) -> bool
    where
        T: Signed + 'a,
        V: Into<Option<&'a T>>,
        F: FnOnce() -> V,
    {
        if !P::INVARIANTS {
            return true;
        }
        match self.depth {
            CheckDepth::None => true,
            CheckDepth::Shallow | CheckDepth::Deep => signature::<T>(val().into(), text, site),
        }
    }
}

#[inline]
fn signature<T: Signed>(val: Option<&T>, text: &'static str, site: SourceSite) -> bool {
    let ok = sig_test(val, T::SIG);
    if !ok {
        sink::report(text, FailureKind::Signature, site);
    }
    ok
}
