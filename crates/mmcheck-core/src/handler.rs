#![forbid(unsafe_op_in_unsafe_fn)]

//! Handler registry: the process-wide binding from "a failure occurred" to
//! "do this".
//!
//! The binding is a single atomic slot. Install handlers during
//! single-threaded startup; swapping while other threads are checking is not
//! supported.

use std::fmt::{self, Write as _};
use std::io::Write as _;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Consumes a failure: message, id, file, line.
pub type FailureHandler = fn(message: &str, id: &str, file: &str, line: u32);

// Null stands for the default handler, so the binding is never observably empty.
static HANDLER: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

#[inline]
fn encode(handler: FailureHandler) -> *mut () {
    handler as *mut ()
}

#[inline]
fn decode(raw: *mut ()) -> FailureHandler {
    if raw.is_null() {
        return abort_handler;
    }
    // SAFETY: the slot only ever holds null or a value produced by `encode`.
    unsafe { std::mem::transmute::<*mut (), FailureHandler>(raw) }
}

/// Installs `handler` and returns the one it replaced.
pub fn install(handler: FailureHandler) -> FailureHandler {
    let prev = decode(HANDLER.swap(encode(handler), Ordering::AcqRel));
    log::debug!(target: "mmcheck", "failure handler replaced");
    prev
}

/// The currently installed handler.
#[inline]
pub fn current() -> FailureHandler {
    decode(HANDLER.load(Ordering::Acquire))
}

/// The built-in handler bound before any other code runs.
#[inline]
pub fn query_default() -> FailureHandler {
    abort_handler
}

const LINE_CAPACITY: usize = 512;

/// Fixed-capacity formatting target living on the stack. Overlong output is
/// truncated.
struct StackLine {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl StackLine {
    #[inline]
    fn new() -> Self {
        Self {
            buf: [0; LINE_CAPACITY],
            len: 0,
        }
    }

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl fmt::Write for StackLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = LINE_CAPACITY - self.len;
        let take = s.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

fn format_line(message: &str, id: &str, file: &str, line: u32) -> StackLine {
    let mut out = StackLine::new();
    let _ = writeln!(out, "{file}:{line}: MMCHECK {id} failure: {message}");
    if out.len == LINE_CAPACITY {
        out.buf[LINE_CAPACITY - 1] = b'\n';
    }
    out
}

/// Default handler: writes one line to stderr and aborts the process.
pub fn abort_handler(message: &str, id: &str, file: &str, line: u32) {
    let out = format_line(message, id, file, line);
    let _ = std::io::stderr().write_all(out.as_bytes());
    std::process::abort();
}

/// Unwinding handler for hosts that prefer a panic over an abort.
#[cold]
#[inline(never)]
pub fn panic_handler(message: &str, id: &str, file: &str, line: u32) {
    panic!("MMCHECK {id} failure: {message} ({file}:{line})");
}
