#![forbid(unsafe_op_in_unsafe_fn)]

//! Structural compatibility between independently declared layouts.
//!
//! Used to verify that a public, ABI-facing declaration still matches the
//! internal definition it stands for. The predicates are plain booleans meant
//! to be wrapped in `require!`/`require_critical!` at a startup verification
//! point.
//!
//! Rust assignment never converts, so "mutually assignable" is type identity.
//! Fields whose types differ compare unequal instead of failing to compile.

use std::any::{type_name, TypeId};
use std::mem::size_of;

use thiserror::Error;

/// Size, offset and type identity of one field within its enclosing layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub offset: usize,
    pub size: usize,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl FieldShape {
    /// Shape of the field reached by `project`, located at `offset`.
    /// `project` is only used to name the field type and is never called.
    #[inline]
    pub fn of<S, F, P>(offset: usize, _project: P) -> Self
    where
        F: 'static,
        P: Fn(&S) -> &F,
    {
        Self {
            offset,
            size: size_of::<F>(),
            type_id: TypeId::of::<F>(),
            type_name: type_name::<F>(),
        }
    }

    /// Same size and offset.
    #[inline]
    pub fn approx_equivalent(&self, other: &FieldShape) -> bool {
        self.size == other.size && self.offset == other.offset
    }

    /// Same size, offset and type.
    #[inline]
    pub fn equivalent(&self, other: &FieldShape) -> bool {
        self.approx_equivalent(other) && self.type_id == other.type_id
    }

    /// Like [`equivalent`](Self::equivalent), but names the first diverging attribute.
    pub fn compare(&self, other: &FieldShape, field: &'static str) -> Result<(), LayoutMismatch> {
        if self.size != other.size {
            return Err(LayoutMismatch::FieldSize {
                field,
                left: self.size,
                right: other.size,
            });
        }
        if self.offset != other.offset {
            return Err(LayoutMismatch::FieldOffset {
                field,
                left: self.offset,
                right: other.offset,
            });
        }
        if self.type_id != other.type_id {
            return Err(LayoutMismatch::FieldType {
                field,
                left: self.type_name,
                right: other.type_name,
            });
        }
        Ok(())
    }
}

/// Same total size and mutually assignable.
#[inline]
pub fn type_equivalent<A: 'static, B: 'static>() -> bool {
    size_of::<A>() == size_of::<B>() && TypeId::of::<A>() == TypeId::of::<B>()
}

/// Total sizes of two layouts agree.
pub fn compare_size<A, B>() -> Result<(), LayoutMismatch> {
    let (left, right) = (size_of::<A>(), size_of::<B>());
    if left != right {
        return Err(LayoutMismatch::TypeSize {
            left: type_name::<A>(),
            right: type_name::<B>(),
            left_size: left,
            right_size: right,
        });
    }
    Ok(())
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutMismatch {
    #[error("field '{field}': size {left} != {right}")]
    FieldSize {
        field: &'static str,
        left: usize,
        right: usize,
    },

    #[error("field '{field}': offset {left} != {right}")]
    FieldOffset {
        field: &'static str,
        left: usize,
        right: usize,
    },

    #[error("field '{field}': type {left} is not assignable to/from {right}")]
    FieldType {
        field: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("type {left} ({left_size} bytes) differs in size from {right} ({right_size} bytes)")]
    TypeSize {
        left: &'static str,
        right: &'static str,
        left_size: usize,
        right_size: usize,
    },
}
