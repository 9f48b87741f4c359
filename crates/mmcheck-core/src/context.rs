#![forbid(unsafe_op_in_unsafe_fn)]

//! Process-wide diagnostics context: the check depth and the handler binding.
//!
//! Both are written during single-threaded startup and read freely afterwards.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::handler::{self, FailureHandler};

/// Raw check-depth word as seen across the ABI.
pub type RawDepth = u8;

/// How deeply the invariant-check layer verifies relationships between structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CheckDepth {
    /// Invariant checks are elided.
    None = 0,
    /// Local invariants plus signature tests only.
    #[default]
    Shallow = 1,
    /// Full recursive descent into owned objects.
    Deep = 2,
}

impl CheckDepth {
    #[inline]
    pub const fn from_raw(raw: RawDepth) -> Option<Self> {
        match raw {
            0 => Some(CheckDepth::None),
            1 => Some(CheckDepth::Shallow),
            2 => Some(CheckDepth::Deep),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_raw(self) -> RawDepth {
        self as u8
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            CheckDepth::None => "none",
            CheckDepth::Shallow => "shallow",
            CheckDepth::Deep => "deep",
        }
    }
}

impl fmt::Display for CheckDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(CheckDepth::None),
            "shallow" | "1" => Ok(CheckDepth::Shallow),
            "deep" | "2" => Ok(CheckDepth::Deep),
            other => Err(format!("unknown check depth: '{other}'")),
        }
    }
}

static CHECK_DEPTH: AtomicU8 = AtomicU8::new(CheckDepth::Shallow as u8);

/// The raw depth word; may hold an out-of-range value set through
/// [`set_check_depth_raw`].
#[inline]
pub fn check_depth_raw() -> RawDepth {
    CHECK_DEPTH.load(Ordering::Relaxed)
}

/// The configured depth, or `None` if the raw word is out of range.
#[inline]
pub fn check_depth() -> Option<CheckDepth> {
    CheckDepth::from_raw(check_depth_raw())
}

/// Sets the depth and returns the previous raw word.
pub fn set_check_depth(depth: CheckDepth) -> RawDepth {
    let prev = CHECK_DEPTH.swap(depth.as_raw(), Ordering::Relaxed);
    log::info!(target: "mmcheck", "check depth set to {depth}");
    prev
}

/// Stores a raw depth word as received from a foreign host. Out-of-range
/// values are kept as-is and reported by the first invariant check that reads
/// them.
pub fn set_check_depth_raw(raw: RawDepth) -> RawDepth {
    if CheckDepth::from_raw(raw).is_none() {
        log::warn!(target: "mmcheck", "check depth set to out-of-range value {raw}");
    }
    CHECK_DEPTH.swap(raw, Ordering::Relaxed)
}

/// Startup initialisation of the diagnostics context.
///
/// ```
/// use mmcheck_core::{CheckDepth, DiagnosticsInit};
///
/// let restore = DiagnosticsInit::new().check_depth(CheckDepth::Deep).apply();
/// restore.restore();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticsInit {
    depth: Option<CheckDepth>,
    handler: Option<FailureHandler>,
}

impl DiagnosticsInit {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn check_depth(mut self, depth: CheckDepth) -> Self {
        self.depth = Some(depth);
        self
    }

    #[inline]
    pub fn handler(mut self, handler: FailureHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Applies the settings. Must run before concurrent checking begins.
    pub fn apply(self) -> Restore {
        let depth = self.depth.map(set_check_depth);
        let handler = self.handler.map(handler::install);
        Restore { depth, handler }
    }
}

/// Previous context values returned by [`DiagnosticsInit::apply`].
#[must_use = "dropping a Restore keeps the new settings; call restore() to undo them"]
#[derive(Debug, Clone, Copy)]
pub struct Restore {
    depth: Option<RawDepth>,
    handler: Option<FailureHandler>,
}

impl Restore {
    #[inline]
    pub fn previous_handler(&self) -> Option<FailureHandler> {
        self.handler
    }

    #[inline]
    pub fn previous_depth_raw(&self) -> Option<RawDepth> {
        self.depth
    }

    pub fn restore(self) {
        if let Some(raw) = self.depth {
            CHECK_DEPTH.store(raw, Ordering::Relaxed);
        }
        if let Some(h) = self.handler {
            handler::install(h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        for d in [CheckDepth::None, CheckDepth::Shallow, CheckDepth::Deep] {
            assert_eq!(CheckDepth::from_raw(d.as_raw()), Some(d));
            assert_eq!(d.name().parse::<CheckDepth>().unwrap(), d);
        }
        assert_eq!(CheckDepth::from_raw(3), None);
        assert!("bottomless".parse::<CheckDepth>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let d: CheckDepth = serde_json::from_str("\"deep\"").unwrap();
        assert_eq!(d, CheckDepth::Deep);
        assert_eq!(serde_json::to_string(&CheckDepth::None).unwrap(), "\"none\"");
    }

    #[test]
    fn default_depth_is_shallow() {
        assert_eq!(CheckDepth::default(), CheckDepth::Shallow);
    }
}
