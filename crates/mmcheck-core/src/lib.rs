#![forbid(unsafe_op_in_unsafe_fn)]

//! Assertion and invariant-check framework for the arena/pool memory manager.
//!
//! Exactly one build profile (`strict-off`, `critical-only`, `full`) is
//! selected per artifact. Failed checks go through a single sink to the
//! installed [`FailureHandler`]; checks never return errors.

#[macro_use]
mod macros;

pub mod assert;
pub mod capture;
pub mod config;
pub mod context;
pub mod handler;
pub mod invariant;
pub mod layout;
pub mod profile;
pub mod sig;
pub mod sink;
pub mod stats;

pub use capture::{Capture, FailureRecord};
pub use config::{ConfigError, ConfigLoadReport, DiagnosticsConfig, HandlerKind};
pub use context::{
    check_depth, set_check_depth, set_check_depth_raw, CheckDepth, DiagnosticsInit, RawDepth,
    Restore,
};
pub use handler::{abort_handler, panic_handler, FailureHandler};
pub use invariant::Checker;
pub use layout::{FieldShape, LayoutMismatch};
pub use profile::{BuildProfile, Profile, ACTIVE};
pub use sig::{Checkable, Sig, SigError, SigField, SigWord, Signed, SignatureTable};
pub use sink::{reset_tally, tally, FailureEvent, FailureKind, ReportTally, SourceSite};
