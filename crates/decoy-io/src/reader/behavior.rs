//! Optional behaviors attached to a scripted reader.

use std::fmt;
use std::thread;
use std::time::Duration;

/// Hook run by a reader at one of its suspension points.
pub type ReadHook = Box<dyn FnMut() + Send>;

/// Configurable behaviors for a [`ScriptedReader`](super::ScriptedReader).
///
/// Every field defaults to absent: no delimiter is appended, reads execute
/// immediately, and exhausting the script reports end-of-stream at once.
#[derive(Default)]
pub struct ReaderBehavior {
    pub(crate) delimiter: Option<Vec<u8>>,
    pub(crate) on_pre_read: Option<ReadHook>,
    pub(crate) on_end_of_stream: Option<ReadHook>,
}

impl ReaderBehavior {
    /// Append `delimiter` after every script element.
    pub fn delimiter(mut self, delimiter: impl Into<Vec<u8>>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Run `hook` at the top of every read with a non-empty buffer.
    ///
    /// The hook may block for as long as it likes; this is the place to
    /// simulate source latency. A read probing with a zero-length buffer
    /// never runs it.
    pub fn on_pre_read(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_pre_read = Some(Box::new(hook));
        self
    }

    /// Run `hook` when the script is exhausted and the current read
    /// produced no bytes.
    ///
    /// If the hook returns, the read reports end-of-stream; a hook that
    /// never returns turns exhaustion into an indefinite block. The hook
    /// runs again on every subsequent read past the end.
    pub fn on_end_of_stream(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_end_of_stream = Some(Box::new(hook));
        self
    }

    /// Behaviors of an interactive console: newline after every element, a
    /// one second pause before each read, and blocking forever once the
    /// script runs out -- a stand-in for a stdin that never "ends".
    pub fn console() -> Self {
        Self::default()
            .delimiter(*b"\n")
            .on_pre_read(|| thread::sleep(Duration::from_secs(1)))
            .on_end_of_stream(|| loop {
                thread::park();
            })
    }
}

impl fmt::Debug for ReaderBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderBehavior")
            .field("delimiter", &self.delimiter)
            .field("on_pre_read", &self.on_pre_read.is_some())
            .field("on_end_of_stream", &self.on_end_of_stream.is_some())
            .finish()
    }
}
