#![forbid(unsafe_op_in_unsafe_fn)]
#![allow(non_local_definitions)]

//! Stable public shapes for hosts that load the memory manager across an ABI
//! boundary.
//!
//! The `*V1` declarations are maintained separately from the internal ones in
//! `mmcheck-core`. [`verify_layout`] compares them field by field and
//! [`api_v1`] refuses to hand out the function table (critical assertion)
//! until they agree.

use std::sync::Once;

use abi_stable::std_types::RStr;
use abi_stable::StableAbi;
use mmcheck_core::context::{self, RawDepth};
use mmcheck_core::layout::{compare_size, LayoutMismatch};
use mmcheck_core::sig::SigWord;
use mmcheck_core::{field_shape, require_critical, sink, type_equiv, ReportTally};
use thiserror::Error;

/// Signature word as stored in every public structure.
pub type SigWordV1 = u32;

/// Raw check-depth word: 0 none, 1 shallow, 2 deep.
pub type DepthWordV1 = u8;

/// Public mirror of [`ReportTally`].
#[derive(StableAbi, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct ReportTallyV1 {
    pub standard: u64,
    pub critical: u64,
    pub type_check: u64,
    pub signature: u64,
    pub unreachable: u64,
}

impl From<ReportTally> for ReportTallyV1 {
    #[inline]
    fn from(t: ReportTally) -> Self {
        Self {
            standard: t.standard,
            critical: t.critical,
            type_check: t.type_check,
            signature: t.signature,
            unreachable: t.unreachable,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("public layout diverges from internal definition: {0}")]
    Layout(#[from] LayoutMismatch),

    #[error("public word type {public} does not match internal {internal}")]
    Word {
        public: &'static str,
        internal: &'static str,
    },
}

/// Every divergence between the public and internal declarations.
pub fn layout_mismatches() -> Vec<AbiError> {
    let mut out = Vec::new();

    if !type_equiv!(SigWordV1, SigWord) {
        out.push(AbiError::Word {
            public: "SigWordV1",
            internal: "SigWord",
        });
    }
    if !type_equiv!(DepthWordV1, RawDepth) {
        out.push(AbiError::Word {
            public: "DepthWordV1",
            internal: "RawDepth",
        });
    }

    let fields = [
        ("standard", field_shape!(ReportTallyV1, standard), field_shape!(ReportTally, standard)),
        ("critical", field_shape!(ReportTallyV1, critical), field_shape!(ReportTally, critical)),
        ("type_check", field_shape!(ReportTallyV1, type_check), field_shape!(ReportTally, type_check)),
        ("signature", field_shape!(ReportTallyV1, signature), field_shape!(ReportTally, signature)),
        ("unreachable", field_shape!(ReportTallyV1, unreachable), field_shape!(ReportTally, unreachable)),
    ];
    for (name, public, internal) in fields {
        if let Err(e) = public.compare(&internal, name) {
            out.push(e.into());
        }
    }
    if let Err(e) = compare_size::<ReportTallyV1, ReportTally>() {
        out.push(e.into());
    }

    out
}

/// Fails with the first divergence, if any.
pub fn verify_layout() -> Result<(), AbiError> {
    match layout_mismatches().into_iter().next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Current report tally in its public shape.
#[inline]
pub fn tally_v1() -> ReportTallyV1 {
    mmcheck_core::tally().into()
}

/// Diagnostics entry points for foreign hosts.
///
/// `report_failure` runs the installed handler on the caller's thread. A
/// handler that unwinds aborts the process at this boundary.
#[derive(StableAbi, Clone, Copy)]
#[repr(C)]
pub struct DiagnosticsApiV1 {
    /// Build profile of this artifact: 0 strict-off, 1 critical-only, 2 full.
    pub profile: extern "C" fn() -> u8,
    pub check_depth: extern "C" fn() -> DepthWordV1,
    /// Stores a raw depth word and returns the previous one.
    pub set_check_depth: extern "C" fn(depth: DepthWordV1) -> DepthWordV1,
    pub tally: extern "C" fn() -> ReportTallyV1,
    pub reset_tally: extern "C" fn(),
    pub report_failure: extern "C" fn(message: RStr<'_>, id: RStr<'_>, file: RStr<'_>, line: u32),
}

extern "C" fn api_profile() -> u8 {
    mmcheck_core::ACTIVE.as_raw()
}

extern "C" fn api_check_depth() -> DepthWordV1 {
    context::check_depth_raw()
}

extern "C" fn api_set_check_depth(depth: DepthWordV1) -> DepthWordV1 {
    context::set_check_depth_raw(depth)
}

extern "C" fn api_tally() -> ReportTallyV1 {
    tally_v1()
}

extern "C" fn api_reset_tally() {
    mmcheck_core::reset_tally();
}

extern "C" fn api_report_failure(message: RStr<'_>, id: RStr<'_>, file: RStr<'_>, line: u32) {
    sink::report_raw(message.as_str(), id.as_str(), file.as_str(), line);
}

static VERIFY: Once = Once::new();

/// The V1 function table. The first call verifies the public layouts.
pub fn api_v1() -> DiagnosticsApiV1 {
    VERIFY.call_once(|| {
        let mismatches = layout_mismatches();
        for m in &mismatches {
            log::error!(target: "mmcheck::abi", "{m}");
        }
        require_critical!(mismatches.is_empty());
        log::debug!(target: "mmcheck::abi", "public layouts verified");
    });

    DiagnosticsApiV1 {
        profile: api_profile,
        check_depth: api_check_depth,
        set_check_depth: api_set_check_depth,
        tally: api_tally,
        reset_tally: api_reset_tally,
        report_failure: api_report_failure,
    }
}
