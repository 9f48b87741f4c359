#![forbid(unsafe_op_in_unsafe_fn)]

//! Build-profile selection.
//!
//! The profile is fixed per compiled artifact by exactly one cargo feature.
//! Every check macro is parameterised by [`Active`]; the layer functions are
//! generic over [`Profile`] so a single build can exercise all three shapes.

use std::fmt;
use std::str::FromStr;

#[cfg(not(any(feature = "strict-off", feature = "critical-only", feature = "full")))]
compile_error!(
    "mmcheck-core: no build profile selected; enable exactly one of `strict-off`, `critical-only`, `full`"
);

#[cfg(any(
    all(feature = "strict-off", feature = "critical-only"),
    all(feature = "strict-off", feature = "full"),
    all(feature = "critical-only", feature = "full"),
))]
compile_error!(
    "mmcheck-core: more than one build profile selected; `strict-off`, `critical-only` and `full` are mutually exclusive"
);

/// Build profile names, as selected by cargo features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuildProfile {
    StrictOff = 0,
    CriticalOnly = 1,
    Full = 2,
}

impl BuildProfile {
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            BuildProfile::StrictOff => "strict-off",
            BuildProfile::CriticalOnly => "critical-only",
            BuildProfile::Full => "full",
        }
    }

    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuildProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict-off" => Ok(BuildProfile::StrictOff),
            "critical-only" => Ok(BuildProfile::CriticalOnly),
            "full" => Ok(BuildProfile::Full),
            other => Err(format!("unknown build profile: '{other}'")),
        }
    }
}

/// One concrete implementation of the check-operation interface.
///
/// The associated constants are the only branch points; a `false` constant
/// leaves the guarded code type-checked but statically dead.
pub trait Profile: Copy + Send + Sync + 'static {
    const PROFILE: BuildProfile;

    /// Standard assertions (`require!`, `require_type!`).
    const STANDARD: bool;
    /// Critical assertions (`require_critical!`, `require_type_critical!`).
    const CRITICAL: bool;
    /// Graduated invariant-check layer (`check_*!`).
    const INVARIANTS: bool;
    /// Statistics gathering (`statistic!`).
    const STATISTICS: bool;
    /// `not_reached!` reports instead of being a compiler-level unreachable point.
    const REPORTS_UNREACHABLE: bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrictOff;

#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalOnly;

#[derive(Debug, Clone, Copy, Default)]
pub struct Full;

impl Profile for StrictOff {
    const PROFILE: BuildProfile = BuildProfile::StrictOff;
    const STANDARD: bool = false;
    const CRITICAL: bool = false;
    const INVARIANTS: bool = false;
    const STATISTICS: bool = false;
    const REPORTS_UNREACHABLE: bool = false;
}

impl Profile for CriticalOnly {
    const PROFILE: BuildProfile = BuildProfile::CriticalOnly;
    const STANDARD: bool = false;
    const CRITICAL: bool = true;
    const INVARIANTS: bool = false;
    const STATISTICS: bool = true;
    const REPORTS_UNREACHABLE: bool = true;
}

impl Profile for Full {
    const PROFILE: BuildProfile = BuildProfile::Full;
    const STANDARD: bool = true;
    const CRITICAL: bool = true;
    const INVARIANTS: bool = true;
    const STATISTICS: bool = true;
    const REPORTS_UNREACHABLE: bool = true;
}

// Strict-Off must not leave a single live check behind.
const _: () = assert!(
    !StrictOff::STANDARD
        && !StrictOff::CRITICAL
        && !StrictOff::INVARIANTS
        && !StrictOff::STATISTICS
        && !StrictOff::REPORTS_UNREACHABLE
);

#[cfg(all(feature = "strict-off", not(feature = "critical-only"), not(feature = "full")))]
pub type Active = StrictOff;

#[cfg(all(feature = "critical-only", not(feature = "strict-off"), not(feature = "full")))]
pub type Active = CriticalOnly;

#[cfg(all(feature = "full", not(feature = "strict-off"), not(feature = "critical-only")))]
pub type Active = Full;

/// The profile this artifact was compiled with.
pub const ACTIVE: BuildProfile = <Active as Profile>::PROFILE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_are_graduated() {
        assert!(Full::STANDARD && Full::CRITICAL && Full::INVARIANTS);
        assert!(!CriticalOnly::STANDARD && CriticalOnly::CRITICAL && !CriticalOnly::INVARIANTS);
        assert!(CriticalOnly::STATISTICS);
        assert!(!StrictOff::CRITICAL && !StrictOff::STATISTICS);
    }

    #[test]
    fn active_profile_matches_feature() {
        #[cfg(feature = "full")]
        assert_eq!(ACTIVE, BuildProfile::Full);
        #[cfg(feature = "critical-only")]
        assert_eq!(ACTIVE, BuildProfile::CriticalOnly);
        #[cfg(feature = "strict-off")]
        assert_eq!(ACTIVE, BuildProfile::StrictOff);
    }

    #[test]
    fn profile_names_parse_back() {
        for p in [BuildProfile::StrictOff, BuildProfile::CriticalOnly, BuildProfile::Full] {
            assert_eq!(p.name().parse::<BuildProfile>().unwrap(), p);
        }
        assert!("lukewarm".parse::<BuildProfile>().is_err());
    }
}
