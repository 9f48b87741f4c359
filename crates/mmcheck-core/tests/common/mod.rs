#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use mmcheck_core::{
    check_down, check_local, check_sig, check_up, CheckDepth, Checkable, Sig, SigField, Signed,
};

/// Leaf object with a counter bumped every time its check predicate runs.
pub struct Block {
    sig: SigField,
    pub size: usize,
    pub checks: AtomicU32,
}

impl Block {
    pub fn new(size: usize) -> Self {
        Self {
            sig: SigField::new(Self::SIG),
            size,
            checks: AtomicU32::new(0),
        }
    }

    pub fn check_count(&self) -> u32 {
        self.checks.load(Ordering::Relaxed)
    }

    pub fn invalidate(&self) {
        self.sig.invalidate();
    }
}

impl Signed for Block {
    const SIG: Sig = Sig::from_tag(*b"BLCK");
    const TYPE_NAME: &'static str = "Block";

    fn sig_field(&self) -> &SigField {
        &self.sig
    }
}

impl Checkable for Block {
    fn check(&self, depth: CheckDepth) -> bool {
        self.checks.fetch_add(1, Ordering::Relaxed);
        let mut ok = check_sig!(Block, self);
        ok &= check_local!(@depth; self.size % 8 == 0);
        ok
    }
}

/// Owner of one block.
pub struct Segment {
    sig: SigField,
    pub block: Box<Block>,
}

impl Segment {
    pub fn new(block: Block) -> Self {
        Self {
            sig: SigField::new(Self::SIG),
            block: Box::new(block),
        }
    }

    pub fn invalidate(&self) {
        self.sig.invalidate();
    }

    /// Back-reference check from a child's point of view.
    pub fn check_owner(owner: Option<&Segment>) -> bool {
        check_up!(Segment, owner)
    }
}

impl Signed for Segment {
    const SIG: Sig = Sig::from_tag(*b"SGMT");
    const TYPE_NAME: &'static str = "Segment";

    fn sig_field(&self) -> &SigField {
        &self.sig
    }
}

impl Checkable for Segment {
    fn check(&self, depth: CheckDepth) -> bool {
        let mut ok = check_sig!(Segment, self);
        ok &= check_down!(@depth; Block, &*self.block);
        ok
    }
}
