#![forbid(unsafe_op_in_unsafe_fn)]

//! Statistics-gather toggle.

use crate::profile::Profile;

/// Runs `gather` once if profile `P` gathers statistics. Otherwise the
/// closure is type-checked and dropped unevaluated.
#[inline(always)]
pub fn gather<P: Profile>(gather: impl FnOnce()) {
    if P::STATISTICS {
        gather();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CriticalOnly, Full, StrictOff};
    use std::cell::Cell;

    fn run<P: Profile>(n: usize) -> usize {
        let hits = Cell::new(0usize);
        for _ in 0..n {
            gather::<P>(|| hits.set(hits.get() + 1));
        }
        hits.get()
    }

    #[test]
    fn strict_off_never_evaluates() {
        assert_eq!(run::<StrictOff>(25), 0);
    }

    #[test]
    fn active_profiles_evaluate_exactly_once_per_call() {
        assert_eq!(run::<Full>(25), 25);
        assert_eq!(run::<CriticalOnly>(25), 25);
    }
}
