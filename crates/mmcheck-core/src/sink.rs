#![forbid(unsafe_op_in_unsafe_fn)]

//! The failure-reporting sink.
//!
//! Every failed check in every layer ends up in [`report_event`]: one
//! synchronous call to the installed handler on the calling thread. This path
//! takes no lock and never allocates, so a failing invariant inside the
//! allocator can still be reported, and a handler may itself fail a check.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handler;
use crate::profile::Active;
use crate::stats;

/// Call-site location captured by the check macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSite {
    pub file: &'static str,
    pub line: u32,
}

impl SourceSite {
    #[inline]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Failure taxonomy. `Structural` mismatches have no kind of their own: they
/// surface through the assertion that wraps the layout predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Standard,
    Critical,
    TypeCheck,
    Signature,
    Unreachable,
}

impl FailureKind {
    pub const ALL: [FailureKind; 5] = [
        FailureKind::Standard,
        FailureKind::Critical,
        FailureKind::TypeCheck,
        FailureKind::Signature,
        FailureKind::Unreachable,
    ];

    #[inline]
    pub const fn id(self) -> &'static str {
        match self {
            FailureKind::Standard => "standard",
            FailureKind::Critical => "critical",
            FailureKind::TypeCheck => "type-check",
            FailureKind::Signature => "signature",
            FailureKind::Unreachable => "unreachable",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    #[inline]
    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The four-component payload handed to the failure handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureEvent<'a> {
    pub message: &'a str,
    pub id: &'a str,
    pub file: &'a str,
    pub line: u32,
}

impl<'a> FailureEvent<'a> {
    #[inline]
    pub fn new(message: &'a str, kind: FailureKind, site: SourceSite) -> Self {
        Self {
            message,
            id: kind.id(),
            file: site.file,
            line: site.line,
        }
    }

    #[inline]
    pub fn kind(&self) -> Option<FailureKind> {
        FailureKind::from_id(self.id)
    }
}

/// Reports a failure of `kind` at `site`.
#[cold]
#[inline(never)]
pub fn report(message: &str, kind: FailureKind, site: SourceSite) {
    report_event(&FailureEvent::new(message, kind, site));
}

/// Reports a failure with a caller-chosen id, e.g. from a foreign host.
#[cold]
#[inline(never)]
pub fn report_raw(message: &str, id: &str, file: &str, line: u32) {
    report_event(&FailureEvent {
        message,
        id,
        file,
        line,
    });
}

/// Hands `event` to the installed handler exactly once.
pub fn report_event(event: &FailureEvent<'_>) {
    if let Some(kind) = event.kind() {
        stats::gather::<Active>(|| TALLY.bump(kind));
    }
    let handler = handler::current();
    handler(event.message, event.id, event.file, event.line);
}

struct Tally {
    counters: [AtomicU64; FailureKind::ALL.len()],
}

impl Tally {
    const fn new() -> Self {
        Self {
            counters: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    #[inline]
    fn bump(&self, kind: FailureKind) {
        self.counters[kind.slot()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn get(&self, kind: FailureKind) -> u64 {
        self.counters[kind.slot()].load(Ordering::Relaxed)
    }
}

static TALLY: Tally = Tally::new();

/// Number of reported failures per kind since start (or the last reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct ReportTally {
    pub standard: u64,
    pub critical: u64,
    pub type_check: u64,
    pub signature: u64,
    pub unreachable: u64,
}

impl ReportTally {
    #[inline]
    pub fn total(&self) -> u64 {
        self.standard + self.critical + self.type_check + self.signature + self.unreachable
    }

    #[inline]
    pub fn get(&self, kind: FailureKind) -> u64 {
        match kind {
            FailureKind::Standard => self.standard,
            FailureKind::Critical => self.critical,
            FailureKind::TypeCheck => self.type_check,
            FailureKind::Signature => self.signature,
            FailureKind::Unreachable => self.unreachable,
        }
    }
}

pub fn tally() -> ReportTally {
    ReportTally {
        standard: TALLY.get(FailureKind::Standard),
        critical: TALLY.get(FailureKind::Critical),
        type_check: TALLY.get(FailureKind::TypeCheck),
        signature: TALLY.get(FailureKind::Signature),
        unreachable: TALLY.get(FailureKind::Unreachable),
    }
}

pub fn reset_tally() {
    for c in &TALLY.counters {
        c.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for k in FailureKind::ALL {
            assert_eq!(FailureKind::from_id(k.id()), Some(k));
        }
        assert_eq!(FailureKind::from_id("structural"), None);
    }

    #[test]
    fn event_carries_four_components() {
        let ev = FailureEvent::new("x > 0", FailureKind::Critical, SourceSite::new("pool.rs", 42));
        assert_eq!(ev.message, "x > 0");
        assert_eq!(ev.id, "critical");
        assert_eq!(ev.file, "pool.rs");
        assert_eq!(ev.line, 42);
        assert_eq!(ev.kind(), Some(FailureKind::Critical));
    }

    #[test]
    fn tally_total_sums_kinds() {
        let t = ReportTally {
            standard: 1,
            critical: 2,
            type_check: 3,
            signature: 4,
            unreachable: 5,
        };
        assert_eq!(t.total(), 15);
        assert_eq!(t.get(FailureKind::Signature), 4);
    }
}
