#![forbid(unsafe_op_in_unsafe_fn)]

//! Per-type signatures and the signature test.
//!
//! Every checkable structure reserves one [`SigField`] written at
//! construction. The signature test reads that single word and nothing else,
//! so it may run on any thread, concurrently with unrelated mutation, and on
//! objects that are being torn down.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

use crate::context::CheckDepth;

/// Raw signature word as seen across the ABI.
pub type SigWord = u32;

/// A per-type sentinel value, unique across all types in the system.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Sig(SigWord);

impl Sig {
    /// Written into a signature field on teardown so that use-after-free
    /// turns into a signature mismatch.
    pub const INVALID: Sig = Sig(0x5191_DEAD);

    #[inline]
    pub const fn new(word: SigWord) -> Self {
        Self(word)
    }

    /// Builds a signature from a four-byte mnemonic, e.g. `Sig::from_tag(*b"ARNA")`.
    #[inline]
    pub const fn from_tag(tag: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(tag))
    }

    #[inline]
    pub const fn word(self) -> SigWord {
        self.0
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({:#010x})", self.0)
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The reserved signature slot of a checkable object.
#[repr(transparent)]
pub struct SigField(AtomicU32);

impl SigField {
    #[inline]
    pub const fn new(sig: Sig) -> Self {
        Self(AtomicU32::new(sig.0))
    }

    #[inline]
    pub fn load(&self) -> Sig {
        Sig(self.0.load(Ordering::Relaxed))
    }

    /// Clears the signature; later signature tests on this object fail.
    #[inline]
    pub fn invalidate(&self) {
        self.0.store(Sig::INVALID.0, Ordering::Relaxed);
    }

    /// Overwrites the signature. Only for fault injection in harnesses.
    #[doc(hidden)]
    #[inline]
    pub fn store(&self, sig: Sig) {
        self.0.store(sig.0, Ordering::Relaxed);
    }
}

impl fmt::Debug for SigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigField").field(&self.load()).finish()
    }
}

/// A type that carries a signature field.
pub trait Signed {
    const SIG: Sig;
    const TYPE_NAME: &'static str;

    fn sig_field(&self) -> &SigField;
}

/// A signed type with a full (recursive) check predicate.
///
/// The predicate receives the depth it runs at. It validates the object's own
/// invariants with `check_local!`, its signature with `check_sig!`, owned
/// children with `check_down!` and back-references with `check_up!`, passing
/// the depth on (`check_down!(@depth; Child, &self.child)`), and returns
/// `true` when it finishes.
pub trait Checkable: Signed {
    fn check(&self, depth: CheckDepth) -> bool;
}

/// Signature test: `false` for an absent object, otherwise compares the
/// reserved field with `expected`.
#[inline]
pub fn sig_test<T: Signed + ?Sized>(val: Option<&T>, expected: Sig) -> bool {
    match val {
        Some(v) => v.sig_field().load() == expected,
        None => false,
    }
}

/// Signature test against the type's own signature.
#[inline]
pub fn sig_matches<'a, T: Signed + 'a>(val: impl Into<Option<&'a T>>) -> bool {
    sig_test::<T>(val.into(), T::SIG)
}

/// Signature test over a raw pointer. A null pointer yields `false` without
/// being dereferenced.
///
/// # Safety
/// A non-null `ptr` must point to memory that is readable for the lifetime of
/// the call and laid out as a `T`.
#[inline]
pub unsafe fn sig_test_ptr<T: Signed>(ptr: *const T, expected: Sig) -> bool {
    // SAFETY: null was excluded by `as_ref`; the caller guarantees readability otherwise.
    let val = unsafe { ptr.as_ref() };
    sig_test(val, expected)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigError {
    #[error("signature {sig} of '{name}' is already used by '{existing}'")]
    Duplicate {
        sig: Sig,
        name: &'static str,
        existing: &'static str,
    },

    #[error("signature {sig} of '{name}' collides with the invalidation sentinel")]
    Reserved { sig: Sig, name: &'static str },
}

/// Startup registry enforcing system-wide signature uniqueness.
#[derive(Debug, Default)]
pub struct SignatureTable {
    by_sig: HashMap<Sig, &'static str>,
}

impl SignatureTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_sig.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_sig.is_empty()
    }

    pub fn register(&mut self, name: &'static str, sig: Sig) -> Result<(), SigError> {
        if sig == Sig::INVALID {
            return Err(SigError::Reserved { sig, name });
        }
        if let Some(&existing) = self.by_sig.get(&sig) {
            return Err(SigError::Duplicate {
                sig,
                name,
                existing,
            });
        }
        self.by_sig.insert(sig, name);
        log::trace!(target: "mmcheck", "signature {sig} registered for '{name}'");
        Ok(())
    }

    #[inline]
    pub fn register_type<T: Signed>(&mut self) -> Result<(), SigError> {
        self.register(T::TYPE_NAME, T::SIG)
    }

    /// Name of the type owning `sig`, if registered.
    #[inline]
    pub fn owner(&self, sig: Sig) -> Option<&'static str> {
        self.by_sig.get(&sig).copied()
    }
}
