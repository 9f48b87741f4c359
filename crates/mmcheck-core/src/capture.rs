#![forbid(unsafe_op_in_unsafe_fn)]

//! Record-and-continue capture of reported failures.
//!
//! Test harnesses use [`Capture`] to run a closure with a recording handler
//! installed and get back every failure it reported. Captures are serialised
//! process-wide because the handler binding and the check depth are global.

use parking_lot::Mutex;

use crate::context::{CheckDepth, DiagnosticsInit, Restore};
use crate::sink::FailureKind;

/// Owned copy of one reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub message: String,
    pub id: String,
    pub file: String,
    pub line: u32,
}

impl FailureRecord {
    #[inline]
    pub fn kind(&self) -> Option<FailureKind> {
        FailureKind::from_id(&self.id)
    }

    #[inline]
    pub fn is(&self, kind: FailureKind) -> bool {
        self.id == kind.id()
    }
}

static CAPTURE_LOCK: Mutex<()> = Mutex::new(());
static RECORDS: Mutex<Vec<FailureRecord>> = Mutex::new(Vec::new());

/// Handler that records the failure and lets the checked code continue.
pub fn record_handler(message: &str, id: &str, file: &str, line: u32) {
    RECORDS.lock().push(FailureRecord {
        message: message.to_owned(),
        id: id.to_owned(),
        file: file.to_owned(),
        line,
    });
}

// Puts the previous handler and depth back even if the captured closure panics.
struct RestoreOnDrop(Option<Restore>);

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        if let Some(r) = self.0.take() {
            r.restore();
        }
    }
}

/// Builder for one capture run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capture {
    depth: Option<CheckDepth>,
}

impl Capture {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs with this check depth, restoring the previous one afterwards.
    #[inline]
    pub fn depth(mut self, depth: CheckDepth) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Runs `f` and returns its result with the failures it reported.
    pub fn run_with<R>(self, f: impl FnOnce() -> R) -> (R, Vec<FailureRecord>) {
        let _serial = CAPTURE_LOCK.lock();
        RECORDS.lock().clear();

        let mut init = DiagnosticsInit::new().handler(record_handler);
        if let Some(depth) = self.depth {
            init = init.check_depth(depth);
        }
        let out = {
            let _restore = RestoreOnDrop(Some(init.apply()));
            f()
        };

        let records = std::mem::take(&mut *RECORDS.lock());
        (out, records)
    }

    /// Runs `f` and returns the failures it reported.
    #[inline]
    pub fn run(self, f: impl FnOnce()) -> Vec<FailureRecord> {
        self.run_with(f).1
    }
}
