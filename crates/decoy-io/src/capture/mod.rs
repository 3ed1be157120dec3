//! Output capture: redirect a [`SinkSlot`] through an OS pipe and deliver
//! the bytes written during the capture window back to the caller.
//!
//! # Architecture
//!
//! Three tasks cooperate over two signaling paths:
//!
//! ```text
//! producer --write--> SinkSlot ==redirected==> pipe write end
//!                                                   |
//!                                               OS pipe
//!                                                   |
//!                                    copy task (blocking read to EOF)
//!                                                   | payload
//!                                              data channel
//!                                                   |
//!                                              relay task
//!                                                   |
//!                                            CaptureOutput (caller)
//!
//! CaptureStop::stop() --request--> lifecycle task --ack--> (stop returns)
//!                                      |
//!                         restore sink, close write end
//! ```
//!
//! The control path (stop request + restoration ack) and the data path
//! (captured payload) are deliberately separate channels: the copy task can
//! sit in an unbounded-duration blocking read without ever having to notice
//! a stop request, and no flag or lock is shared between the tasks.
//!
//! Ordering guarantees:
//!
//! 1. The pipe write end closes before the copy task can observe EOF, so
//!    every byte written before the stop is captured.
//! 2. The slot holds its pre-capture sink before [`CaptureStop::stop`]
//!    returns.
//! 3. The payload (if any) is published before the copy task disconnects
//!    from the data channel, which happens before the relay closes the
//!    public output.
//!
//! No ordering holds between `stop` returning and the output closing; the
//! caller drains [`CaptureOutput`] to observe the payload.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::FromRawFd;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::sink::SinkSlot;

/// Errors produced by the capture facility.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The OS pipe backing the capture could not be created. Returned by
    /// [`begin_capture`] before any task is spawned; the slot is untouched.
    #[error("failed to create capture pipe: {0}")]
    PipeCreate(#[source] io::Error),

    /// Draining the capture pipe failed for a reason other than EOF.
    /// Delivered as an item on the capture output; bytes read before the
    /// fault are discarded.
    #[error("failed to drain capture pipe: {0}")]
    PipeRead(#[source] io::Error),
}

/// One item on the capture output: the captured bytes, or the pipe fault
/// that ended the session.
pub type CaptureResult = Result<Vec<u8>, CaptureError>;

/// Receiving side of a capture session.
///
/// Yields at most one `Ok` payload (the full capture buffer) or one `Err`,
/// then closes. An empty capture closes without yielding anything.
pub struct CaptureOutput {
    rx: mpsc::Receiver<CaptureResult>,
}

impl CaptureOutput {
    /// Receive the next item, or `None` once the session has shut the
    /// output down.
    pub async fn recv(&mut self) -> Option<CaptureResult> {
        self.rx.recv().await
    }

    /// Adapt the output into a [`futures::Stream`]-compatible stream.
    ///
    /// [`futures::Stream`]: https://docs.rs/futures/latest/futures/stream/trait.Stream.html
    pub fn into_stream(self) -> ReceiverStream<CaptureResult> {
        ReceiverStream::new(self.rx)
    }
}

impl std::fmt::Debug for CaptureOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureOutput").finish_non_exhaustive()
    }
}

/// Handle that ends a capture session.
///
/// `stop` consumes the handle, so stopping twice is unrepresentable.
/// Dropping the handle without stopping also ends the session and restores
/// the sink, just without anything to rendezvous with.
pub struct CaptureStop {
    stop_tx: oneshot::Sender<()>,
    restored_rx: oneshot::Receiver<()>,
}

impl CaptureStop {
    /// End the capture.
    ///
    /// When this returns, the slot holds its pre-capture sink again: the
    /// restoration ack is only sent after the lifecycle task has swapped
    /// the original sink back. Payload delivery on [`CaptureOutput`] is
    /// independent of this return; drain the output to observe it.
    pub async fn stop(self) {
        if self.stop_tx.send(()).is_err() {
            // The lifecycle task only exits after acking a received stop,
            // so a refused send means the runtime already tore it down.
            warn!("capture lifecycle task gone before the stop request");
            return;
        }
        if self.restored_rx.await.is_err() {
            warn!("capture lifecycle task dropped the restoration ack");
        }
    }
}

impl std::fmt::Debug for CaptureStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStop").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Redirect `slot` into a fresh OS pipe and start capturing everything
/// written to it.
///
/// Returns the output to drain and the handle that ends the session. On
/// pipe-creation failure nothing is spawned and the slot is untouched.
///
/// Must be called from within a tokio runtime. At most one capture may be
/// active per slot, and nothing else may swap the slot while the session
/// is in flight.
pub fn begin_capture(slot: &SinkSlot) -> Result<(CaptureOutput, CaptureStop), CaptureError> {
    let (pipe_read, pipe_write) = create_pipe().map_err(CaptureError::PipeCreate)?;

    let original = slot.swap(Box::new(pipe_write));
    debug!("sink redirected into capture pipe");

    let (stop_tx, stop_rx) = oneshot::channel();
    let (restored_tx, restored_rx) = oneshot::channel();
    let (data_tx, data_rx) = mpsc::channel::<CaptureResult>(1);
    let (out_tx, out_rx) = mpsc::channel::<CaptureResult>(1);

    tokio::task::spawn_blocking(move || copy_pipe(pipe_read, data_tx));
    tokio::spawn(run_lifecycle(slot.clone(), original, stop_rx, restored_tx));
    tokio::spawn(relay_output(data_rx, out_tx));

    Ok((
        CaptureOutput { rx: out_rx },
        CaptureStop {
            stop_tx,
            restored_rx,
        },
    ))
}

// ---------------------------------------------------------------------------
// Session tasks
// ---------------------------------------------------------------------------

/// Copy task: drain the pipe until the write end closes, publish the
/// buffer as a single payload, then disconnect from the data channel.
///
/// Runs on the blocking pool; the read only observes EOF once the write
/// end has been dropped.
fn copy_pipe(mut pipe_read: File, data_tx: mpsc::Sender<CaptureResult>) {
    let mut buf = Vec::new();
    match pipe_read.read_to_end(&mut buf) {
        Ok(_) => {
            if !buf.is_empty() {
                debug!(bytes = buf.len(), "capture pipe drained");
                // A refused send means the caller dropped the session.
                let _ = data_tx.blocking_send(Ok(buf));
            }
        }
        Err(e) => {
            warn!(error = %e, "capture pipe read failed");
            let _ = data_tx.blocking_send(Err(CaptureError::PipeRead(e)));
        }
    }
    // pipe_read and data_tx drop here: the read end closes and the relay
    // sees the data channel disconnect.
}

/// Lifecycle task: wait for the stop request, put the original sink back,
/// then ack so the stop call can return.
///
/// The swap happens under the slot's lock, so no write can land in the
/// pipe afterwards; dropping the swapped-out write end is what lets the
/// copy task observe EOF.
async fn run_lifecycle(
    slot: SinkSlot,
    original: Box<dyn Write + Send>,
    stop_rx: oneshot::Receiver<()>,
    restored_tx: oneshot::Sender<()>,
) {
    let stop_requested = stop_rx.await.is_ok();
    if !stop_requested {
        debug!("capture stop handle dropped; restoring the sink anyway");
    }

    // restore() swaps the original back in and drops the pipe write end it
    // displaces, closing the pipe.
    slot.restore(original);
    debug!("sink restored");

    if stop_requested {
        // A refused send means the stop future was cancelled mid-wait.
        let _ = restored_tx.send(());
    }
}

/// Relay task: republish captured payloads on the public output, closing
/// it exactly once, after the data channel disconnects.
async fn relay_output(
    mut data_rx: mpsc::Receiver<CaptureResult>,
    out_tx: mpsc::Sender<CaptureResult>,
) {
    while let Some(item) = data_rx.recv().await {
        if out_tx.send(item).await.is_err() {
            debug!("capture output receiver dropped; discarding payload");
            break;
        }
    }
    // out_tx drops here: the output stream closes.
}

/// Create an anonymous OS pipe, returning `(read_end, write_end)`.
fn create_pipe() -> io::Result<(File, File)> {
    let mut fds = [0; 2];
    // SAFETY: `fds` is a valid two-element out-array for pipe(2).
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe(2) succeeded, so both descriptors are freshly opened
    // and owned by nobody else.
    let read_end = unsafe { File::from_raw_fd(fds[0]) };
    let write_end = unsafe { File::from_raw_fd(fds[1]) };
    Ok((read_end, write_end))
}
