//! Check macros. Each one captures the literal expression text and call site
//! and forwards to the layer function for the active build profile.

#[doc(hidden)]
#[macro_export]
macro_rules! __here {
    () => {
        $crate::SourceSite::new(::core::file!(), ::core::line!())
    };
}

/// Standard assertion. Active in the `full` profile only.
#[macro_export]
macro_rules! require {
    ($cond:expr $(,)?) => {
        $crate::assert::standard::<$crate::profile::Active>(
            || $cond,
            ::core::stringify!($cond),
            $crate::__here!(),
        )
    };
}

/// Critical assertion. Active in `full` and `critical-only`.
#[macro_export]
macro_rules! require_critical {
    ($cond:expr $(,)?) => {
        $crate::assert::critical::<$crate::profile::Active>(
            || $cond,
            ::core::stringify!($cond),
            $crate::__here!(),
        )
    };
}

/// Standard assertion that `val` (a `&T` or `Option<&T>`) passes `T`'s check predicate.
#[macro_export]
macro_rules! require_type {
    ($ty:ty, $val:expr $(,)?) => {
        $crate::assert::typed::<$crate::profile::Active, $ty, _, _>(
            || $val,
            ::core::concat!("TypeCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
            $crate::__here!(),
        )
    };
}

/// Critical form of [`require_type!`].
#[macro_export]
macro_rules! require_type_critical {
    ($ty:ty, $val:expr $(,)?) => {
        $crate::assert::typed_critical::<$crate::profile::Active, $ty, _, _>(
            || $val,
            ::core::concat!("TypeCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
            $crate::__here!(),
        )
    };
}

/// Marks a statement that can never execute.
///
/// Reports an `"unreachable"` failure in `full` and `critical-only`. In
/// `strict-off` it is a compiler-level unreachable point, and reaching it is
/// undefined behaviour.
#[macro_export]
macro_rules! not_reached {
    () => {{
        #[allow(unused_unsafe)]
        let () = unsafe { $crate::assert::unreachable::<$crate::profile::Active>($crate::__here!()) };
    }};
}

/// Signature assertion on `val`. Never reads the check depth.
#[macro_export]
macro_rules! check_sig {
    ($ty:ty, $val:expr $(,)?) => {
        $crate::invariant::Checker::<$crate::profile::Active>::at($crate::CheckDepth::None)
            .sig::<$ty, _, _>(
                || $val,
                ::core::concat!("SigCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
                $crate::__here!(),
            )
    };
}

/// Local invariant: elided at depth `None`, a standard assertion otherwise.
///
/// `check_local!(@depth; cond)` runs at an explicit depth; the plain form
/// reads the process-wide one. The same holds for `check_down!` and `check_up!`.
#[macro_export]
macro_rules! check_local {
    (@ $depth:expr; $cond:expr $(,)?) => {
        $crate::invariant::Checker::<$crate::profile::Active>::at($depth).local(
            || $cond,
            ::core::stringify!($cond),
            $crate::__here!(),
        )
    };
    ($cond:expr $(,)?) => {
        $crate::invariant::Checker::<$crate::profile::Active>::current($crate::__here!()).local(
            || $cond,
            ::core::stringify!($cond),
            $crate::__here!(),
        )
    };
}

/// Descendant check: signature test at `Shallow`, full check predicate at `Deep`.
#[macro_export]
macro_rules! check_down {
    (@ $depth:expr; $ty:ty, $val:expr $(,)?) => {
        $crate::invariant::Checker::<$crate::profile::Active>::at($depth).down::<$ty, _, _>(
            || $val,
            ::core::concat!("SigCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
            ::core::concat!("TypeCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
            $crate::__here!(),
        )
    };
    ($ty:ty, $val:expr $(,)?) => {
        $crate::invariant::Checker::<$crate::profile::Active>::current($crate::__here!())
            .down::<$ty, _, _>(
                || $val,
                ::core::concat!("SigCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
                ::core::concat!("TypeCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
                $crate::__here!(),
            )
    };
}

/// Ancestor check: signature test at `Shallow` and `Deep`.
#[macro_export]
macro_rules! check_up {
    (@ $depth:expr; $ty:ty, $val:expr $(,)?) => {
        $crate::invariant::Checker::<$crate::profile::Active>::at($depth).up::<$ty, _, _>(
            || $val,
            ::core::concat!("SigCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
            $crate::__here!(),
        )
    };
    ($ty:ty, $val:expr $(,)?) => {
        $crate::invariant::Checker::<$crate::profile::Active>::current($crate::__here!())
            .up::<$ty, _, _>(
                || $val,
                ::core::concat!("SigCheck ", ::core::stringify!($ty), ": ", ::core::stringify!($val)),
                $crate::__here!(),
            )
    };
}

/// Evaluates `gather` once for its side effect, except under `strict-off`
/// where it is only type-checked.
#[macro_export]
macro_rules! statistic {
    ($gather:expr $(,)?) => {
        $crate::stats::gather::<$crate::profile::Active>(|| {
            let _ = $gather;
        })
    };
}

/// Shape of `$s.$f` for layout comparisons.
#[macro_export]
macro_rules! field_shape {
    ($s:ty, $f:ident) => {
        $crate::layout::FieldShape::of(::core::mem::offset_of!($s, $f), |s: &$s| &s.$f)
    };
}

/// `true` iff the two fields agree in size, offset and type.
#[macro_export]
macro_rules! field_equiv {
    ($s1:ty, $f1:ident, $s2:ty, $f2:ident $(,)?) => {
        $crate::field_shape!($s1, $f1).equivalent(&$crate::field_shape!($s2, $f2))
    };
}

/// `true` iff the two fields agree in size and offset.
#[macro_export]
macro_rules! field_equiv_approx {
    ($s1:ty, $f1:ident, $s2:ty, $f2:ident $(,)?) => {
        $crate::field_shape!($s1, $f1).approx_equivalent(&$crate::field_shape!($s2, $f2))
    };
}

/// `true` iff the two types agree in size and are mutually assignable.
#[macro_export]
macro_rules! type_equiv {
    ($t1:ty, $t2:ty $(,)?) => {
        $crate::layout::type_equivalent::<$t1, $t2>()
    };
}
