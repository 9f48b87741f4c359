//! Mock arena, pool, object format and generation chain.
//!
//! Ownership runs arena -> pools -> (format, chain). Pools point back at their
//! arena through a `Weak`, which the check predicates only ever signature-test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use anyhow::{ensure, Result};
use mmcheck_core::{
    check_down, check_local, check_sig, check_up, require, require_critical, CheckDepth, Checkable, Sig,
    SigField, Signed,
};
use parking_lot::Mutex;

pub const WORD: usize = std::mem::size_of::<usize>();

/// Alignment value that no pool class accepts.
pub const UNALIGNED: usize = 3;

#[inline]
pub fn is_aligned(align: usize) -> bool {
    align.is_power_of_two() && align % WORD == 0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenParam {
    pub capacity_kb: usize,
    pub mortality: f64,
}

pub struct Chain {
    sig: SigField,
    gens: Vec<GenParam>,
}

impl Chain {
    pub fn create(gens: &[GenParam]) -> Result<Self> {
        require!(!gens.is_empty());
        ensure!(!gens.is_empty(), "chain needs at least one generation");
        Ok(Self {
            sig: SigField::new(Self::SIG),
            gens: gens.to_vec(),
        })
    }

    pub fn generations(&self) -> usize {
        self.gens.len()
    }
}

impl Signed for Chain {
    const SIG: Sig = Sig::from_tag(*b"CHAN");
    const TYPE_NAME: &'static str = "Chain";

    fn sig_field(&self) -> &SigField {
        &self.sig
    }
}

impl Checkable for Chain {
    fn check(&self, depth: CheckDepth) -> bool {
        let mut ok = check_sig!(Chain, self);
        ok &= check_local!(@depth; !self.gens.is_empty());
        for g in &self.gens {
            ok &= check_local!(@depth; g.capacity_kb > 0);
            ok &= check_local!(@depth; (0.0..=1.0).contains(&g.mortality));
        }
        ok
    }
}

pub struct Format {
    sig: SigField,
    align: usize,
    header_size: usize,
}

impl Format {
    pub fn create(align: usize, header_size: usize) -> Result<Self> {
        require!(is_aligned(align));
        ensure!(is_aligned(align), "format alignment {align} is not a word-multiple power of two");
        Ok(Self {
            sig: SigField::new(Self::SIG),
            align,
            header_size,
        })
    }
}

impl Signed for Format {
    const SIG: Sig = Sig::from_tag(*b"FMTA");
    const TYPE_NAME: &'static str = "Format";

    fn sig_field(&self) -> &SigField {
        &self.sig
    }
}

impl Checkable for Format {
    fn check(&self, depth: CheckDepth) -> bool {
        let mut ok = check_sig!(Format, self);
        ok &= check_local!(@depth; is_aligned(self.align));
        ok &= check_local!(@depth; self.header_size % self.align == 0);
        ok
    }
}

pub struct Pool {
    sig: SigField,
    arena: Weak<Arena>,
    align: usize,
    format: Format,
    chain: Chain,
}

impl Pool {
    /// Creates a pool in `arena`. A misaligned `align` is an argument error.
    pub fn create(arena: &Arc<Arena>, align: usize, format: Format, chain: Chain) -> Result<Arc<Pool>> {
        require!(is_aligned(align));
        ensure!(is_aligned(align), "pool alignment {align} is not a word-multiple power of two");

        let pool = Arc::new(Pool {
            sig: SigField::new(Self::SIG),
            arena: Arc::downgrade(arena),
            align,
            format,
            chain,
        });
        arena.pools.lock().push(Arc::clone(&pool));
        log::debug!(target: "check_harness", "pool created: align={align} gens={}", pool.chain.generations());
        Ok(pool)
    }
}

impl Signed for Pool {
    const SIG: Sig = Sig::from_tag(*b"POOL");
    const TYPE_NAME: &'static str = "Pool";

    fn sig_field(&self) -> &SigField {
        &self.sig
    }
}

impl Checkable for Pool {
    fn check(&self, depth: CheckDepth) -> bool {
        let mut ok = check_sig!(Pool, self);
        let arena = self.arena.upgrade();
        ok &= check_up!(@depth; Arena, arena.as_deref());
        ok &= check_local!(@depth; is_aligned(self.align));
        ok &= check_down!(@depth; Format, &self.format);
        ok &= check_down!(@depth; Chain, &self.chain);
        ok
    }
}

pub struct Arena {
    sig: SigField,
    reserved: usize,
    committed: AtomicUsize,
    pools: Mutex<Vec<Arc<Pool>>>,
}

impl Arena {
    pub fn create(reserved: usize) -> Result<Arc<Self>> {
        require_critical!(reserved > 0);
        ensure!(reserved > 0, "arena needs a non-empty reservation");
        Ok(Arc::new(Self {
            sig: SigField::new(Self::SIG),
            reserved,
            committed: AtomicUsize::new(0),
            pools: Mutex::new(Vec::new()),
        }))
    }

    /// Records `bytes` of committed memory.
    pub fn commit(&self, bytes: usize) {
        self.committed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }

    /// Overwrites the arena's signature, as teardown does.
    pub fn invalidate(&self) {
        self.sig.invalidate();
    }

    /// Drops all pools and invalidates the arena.
    pub fn destroy(&self) {
        for pool in self.pools.lock().drain(..) {
            pool.sig.invalidate();
        }
        self.invalidate();
    }
}

impl Signed for Arena {
    const SIG: Sig = Sig::from_tag(*b"ARNA");
    const TYPE_NAME: &'static str = "Arena";

    fn sig_field(&self) -> &SigField {
        &self.sig
    }
}

impl Checkable for Arena {
    fn check(&self, depth: CheckDepth) -> bool {
        let mut ok = check_sig!(Arena, self);
        ok &= check_local!(@depth; self.committed.load(Ordering::Relaxed) <= self.reserved);
        for pool in self.pools.lock().iter() {
            ok &= check_down!(@depth; Pool, &**pool);
        }
        ok
    }
}
