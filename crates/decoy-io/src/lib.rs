//! Test doubles for I/O endpoints that are awkward to drive for real.
//!
//! Two families of stand-ins:
//!
//! - **Readers** ([`ScriptedReader`], [`ChannelReader`]): simulated byte
//!   sources built from in-memory strings or from a channel of messages,
//!   with configurable blocking and termination behavior.
//! - **Capture** ([`begin_capture`], unix only): transparently redirect a
//!   [`SinkSlot`] -- the writable destination a component under test writes
//!   into -- through an OS pipe, and deliver everything written during the
//!   capture window back to the test once the capture is stopped.
//!
//! # Architecture
//!
//! ```text
//! producer --write--> SinkSlot ==redirected==> pipe write end
//!                                                   |
//!                                               OS pipe
//!                                                   |
//!                                              copy task
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
//! Stopping a capture guarantees the slot holds its pre-capture sink before
//! the stop call returns; payload delivery on the output races with that
//! return by design and is observed by draining the output.

pub mod reader;
pub mod sink;

#[cfg(unix)]
pub mod capture;

pub use reader::{ChannelReader, ReaderBehavior, ScriptedReader};
pub use sink::SinkSlot;

#[cfg(unix)]
pub use capture::{begin_capture, CaptureError, CaptureOutput, CaptureResult, CaptureStop};
