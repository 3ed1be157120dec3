//! Simulated byte sources for tests.
//!
//! Two readers cover the common shapes of canned input:
//!
//! - [`ScriptedReader`] replays an ordered list of strings as a byte
//!   stream, honoring the optional behaviors in [`ReaderBehavior`]
//!   (per-element delimiter, pre-read pause, end-of-stream blocking).
//! - [`ChannelReader`] adapts a channel of string messages into a byte
//!   stream, carrying partially-consumed messages across calls.
//!
//! Both implement [`std::io::Read`]; end-of-stream is the conventional
//! `Ok(0)` on a non-empty destination buffer. Neither reader is meant to be
//! shared across threads mid-stream.

pub mod behavior;
pub mod channel;
pub mod scripted;

pub use behavior::ReaderBehavior;
pub use channel::ChannelReader;
pub use scripted::ScriptedReader;
