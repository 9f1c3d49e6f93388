//! Connection read-buffer sizing and freelist (§4.5).
//!
//! A real libevent connection struct tracks read/write buffers, an iovec
//! list and a msglist for scatter-gather `sendmsg`; on a Tokio per-connection
//! task, the scatter-gather machinery collapses into ordinary buffered
//! writes, so only the read-buffer sizing and freelist survive as
//! meaningful behavior to reproduce.

use std::sync::Mutex;

/// Initial read-buffer size for a new connection.
pub const INITIAL_READ_SIZE: usize = 2048;
/// If a connection's read buffer grows past this, it is freed outright on
/// close rather than returned to the freelist.
pub const READ_BUFFER_HIGHWAT: usize = 8192;
/// Maximum number of capacity doublings attempted in one read attempt
/// before yielding to a later wakeup (§4.5, §8 "Incoming body larger than
/// current rsize").
pub const MAX_DOUBLINGS_PER_ATTEMPT: u32 = 4;

/// Grows `buf`'s capacity towards `required`, doubling at most
/// [`MAX_DOUBLINGS_PER_ATTEMPT`] times. Returns whether `required` was
/// reached; the caller is expected to retry (on a later wakeup) if not.
pub fn grow_for_body(buf: &mut Vec<u8>, required: usize) -> bool {
    let mut doublings = 0;
    while buf.capacity() < required && doublings < MAX_DOUBLINGS_PER_ATTEMPT {
        let target = (buf.capacity().max(1) * 2).max(INITIAL_READ_SIZE);
        buf.reserve(target.saturating_sub(buf.len()));
        doublings += 1;
    }
    buf.capacity() >= required
}

/// Replaces `buf` with a fresh, minimally-sized buffer if it grew past
/// [`READ_BUFFER_HIGHWAT`] serving a previous body.
///
/// Called at `new_cmd` entry (§4.5, §8 scenario 6: a 200 KB request grows
/// the buffer once, then the next command on the same connection shrinks it
/// back down rather than keeping the oversized allocation for the
/// connection's lifetime).
pub fn shrink_if_oversized(buf: &mut Vec<u8>) {
    if buf.capacity() > READ_BUFFER_HIGHWAT {
        *buf = Vec::with_capacity(INITIAL_READ_SIZE);
    }
}

/// A freelist of read buffers shared by one worker's connections.
///
/// Checked out on `new_cmd` entry, returned on `closing`. A buffer whose
/// capacity exceeds [`READ_BUFFER_HIGHWAT`] is dropped instead of returned,
/// matching the original's "free the block rather than reuse it" rule.
#[derive(Default)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks out a buffer, reusing one from the freelist if available.
    #[must_use]
    pub fn checkout(&self) -> Vec<u8> {
        let mut free = self.free.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        free.pop().unwrap_or_else(|| Vec::with_capacity(INITIAL_READ_SIZE))
    }

    /// Returns a buffer to the pool, or drops it if oversized.
    pub fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > READ_BUFFER_HIGHWAT {
            drop(buf);
            return;
        }
        buf.clear();
        let mut free = self.free.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        free.push(buf);
    }

    /// Number of buffers currently parked in the freelist (test/introspection only).
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// Whether the freelist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
