//! Swappable destination for writers under test.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cloneable slot holding the currently active writable sink.
///
/// Components under test write through the slot (`impl Write`); tests and
/// the capture facility exchange the destination underneath them with
/// [`swap`](SinkSlot::swap) and [`restore`](SinkSlot::restore). Individual
/// writes are serialized against swaps, so a write lands entirely in either
/// the old sink or the new one.
///
/// At most one redirection may be active per slot at a time, and the slot
/// must not be swapped by anyone else while a redirection is in flight.
/// That is a caller obligation; the slot cannot detect a violation.
#[derive(Clone)]
pub struct SinkSlot {
    active: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SinkSlot {
    /// Slot initially routing writes to `sink`.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            active: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    /// Make `new_sink` the active destination, returning the sink it
    /// replaces.
    pub fn swap(&self, new_sink: Box<dyn Write + Send>) -> Box<dyn Write + Send> {
        std::mem::replace(&mut *self.active(), new_sink)
    }

    /// Put a previously swapped-out sink back, dropping the sink it
    /// replaces (which closes it, if closing is what its `Drop` does).
    pub fn restore(&self, old_sink: Box<dyn Write + Send>) {
        let _replaced = self.swap(old_sink);
    }

    fn active(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A writer that panicked mid-write does not wedge the slot.
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for SinkSlot {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.active().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.active().flush()
    }
}

impl fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSlot").finish_non_exhaustive()
    }
}
