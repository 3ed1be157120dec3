//! Reader that replays an ordered list of strings as a byte stream.

use std::io::{self, Read};

use super::behavior::ReaderBehavior;

/// Simulates a byte-readable source from a fixed script of strings.
///
/// Each read drains the remaining bytes of the current element, then the
/// configured delimiter (if any), then moves to the next element, stopping
/// as soon as the destination buffer is full. The cursor position survives
/// across calls, so the stream is resumable but not restartable -- replaying
/// from the start takes a fresh reader.
///
/// When the script is exhausted and a read produced no bytes, the
/// end-of-stream hook (if any) runs before `Ok(0)` is reported; a read that
/// did produce bytes returns them first and defers the end-of-stream signal
/// to the next call.
#[derive(Debug)]
pub struct ScriptedReader {
    lines: Vec<String>,
    behavior: ReaderBehavior,
    /// Index of the element currently being drained.
    line_idx: usize,
    /// Byte offset into the current element.
    byte_idx: usize,
    /// Byte offset into the delimiter following the current element.
    delim_idx: usize,
}

impl ScriptedReader {
    /// Reader over `lines` with default behavior: no delimiter, no pauses,
    /// immediate end-of-stream on exhaustion.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_behavior(lines, ReaderBehavior::default())
    }

    /// Reader over `lines` honoring `behavior`.
    pub fn with_behavior<I, S>(lines: I, behavior: ReaderBehavior) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            behavior,
            line_idx: 0,
            byte_idx: 0,
            delim_idx: 0,
        }
    }

    /// Console stand-in: [`ReaderBehavior::console`] over `lines`.
    pub fn console<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_behavior(lines, ReaderBehavior::console())
    }
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // A zero-length probe returns before the pre-read hook so it can
        // never block.
        if buf.is_empty() {
            return Ok(0);
        }

        if let Some(hook) = self.behavior.on_pre_read.as_mut() {
            hook();
        }

        let mut filled = 0;
        while self.line_idx < self.lines.len() {
            let line = self.lines[self.line_idx].as_bytes();
            while self.byte_idx < line.len() {
                if filled == buf.len() {
                    return Ok(filled);
                }
                buf[filled] = line[self.byte_idx];
                filled += 1;
                self.byte_idx += 1;
            }

            let delim = self.behavior.delimiter.as_deref().unwrap_or_default();
            while self.delim_idx < delim.len() {
                if filled == buf.len() {
                    return Ok(filled);
                }
                buf[filled] = delim[self.delim_idx];
                filled += 1;
                self.delim_idx += 1;
            }

            self.byte_idx = 0;
            self.delim_idx = 0;
            self.line_idx += 1;
        }

        if filled == 0 {
            // Script exhausted with nothing to return. The hook may block
            // forever; if it returns, this is end-of-stream.
            if let Some(hook) = self.behavior.on_end_of_stream.as_mut() {
                hook();
            }
            return Ok(0);
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const CMDS: [&str; 3] = ["cmmd 1", "cmmd 2", "cmmd 3"];

    fn total_len(lines: &[&str]) -> usize {
        lines.iter().map(|l| l.len()).sum()
    }

    #[test]
    fn empty_script_reports_end_of_stream() {
        let mut rdr = ScriptedReader::new(Vec::<String>::new());
        let mut buf = [0u8; 8];
        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn zero_length_buffer_never_blocks_and_never_advances() {
        let behavior = ReaderBehavior::default()
            .on_pre_read(|| panic!("pre-read hook must not run on a zero-length probe"))
            .on_end_of_stream(|| panic!("end hook must not run on a zero-length probe"));
        let mut rdr = ScriptedReader::with_behavior(CMDS, behavior);

        let mut empty: [u8; 0] = [];
        assert_eq!(rdr.read(&mut empty).unwrap(), 0);

        // The probe must not have consumed anything.
        let mut buf = [0u8; 6];
        assert_eq!(rdr.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b"cmmd 1");
    }

    #[test]
    fn consume_all_at_once() {
        let mut rdr = ScriptedReader::new(CMDS);
        let mut buf = vec![0u8; total_len(&CMDS)];

        assert_eq!(rdr.read(&mut buf).unwrap(), total_len(&CMDS));
        assert_eq!(buf, b"cmmd 1cmmd 2cmmd 3");

        // The script is exhausted: end-of-stream now, and it stays sticky.
        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn consume_one_element_at_a_time() {
        let mut rdr = ScriptedReader::new(CMDS);
        let mut buf = [0u8; 6];

        for cmd in CMDS {
            assert_eq!(rdr.read(&mut buf).unwrap(), cmd.len());
            assert_eq!(&buf, cmd.as_bytes());
        }
        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn any_buffer_size_reconstructs_the_concatenation() {
        for buf_size in 1..=5 {
            let mut rdr = ScriptedReader::new(CMDS);
            let mut buf = vec![0u8; buf_size];
            let mut result = Vec::new();
            loop {
                let n = rdr.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                result.extend_from_slice(&buf[..n]);
            }
            assert_eq!(
                result, b"cmmd 1cmmd 2cmmd 3",
                "reconstruction failed for buffer size {buf_size}"
            );
        }
    }

    #[test]
    fn delimiter_appended_to_each_element() {
        let behavior = ReaderBehavior::default().delimiter(*b"\n");
        let mut rdr = ScriptedReader::with_behavior(CMDS, behavior);
        let mut buf = [0u8; 7];

        for cmd in CMDS {
            let n = rdr.read(&mut buf).unwrap();
            assert_eq!(n, cmd.len() + 1);
            assert_eq!(&buf[..n - 1], cmd.as_bytes());
            assert_eq!(buf[n - 1], b'\n');
        }
        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn delimiter_survives_awkward_buffer_sizes() {
        // Buffer sized to the element alone, so every delimiter straddles
        // a call boundary.
        let behavior = ReaderBehavior::default().delimiter(*b"\n");
        let mut rdr = ScriptedReader::with_behavior(CMDS, behavior);
        let mut buf = [0u8; 6];

        let mut result = Vec::new();
        loop {
            let n = rdr.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            result.extend_from_slice(&buf[..n]);
        }
        assert_eq!(result, b"cmmd 1\ncmmd 2\ncmmd 3\n");
    }

    #[test]
    fn partial_data_is_returned_before_end_of_stream() {
        let mut rdr = ScriptedReader::new(["abc"]);
        let mut buf = [0u8; 2];

        assert_eq!(rdr.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ab");

        // Exhaustion with one byte in hand: the byte wins, the signal waits.
        assert_eq!(rdr.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'c');

        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn pre_read_hook_runs_once_per_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let behavior =
            ReaderBehavior::default().on_pre_read(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let mut rdr = ScriptedReader::with_behavior(["ab"], behavior);

        let mut buf = [0u8; 1];
        rdr.read(&mut buf).unwrap();
        rdr.read(&mut buf).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn end_hook_runs_on_every_read_past_the_end() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let behavior = ReaderBehavior::default().on_end_of_stream(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut rdr = ScriptedReader::with_behavior(["x"], behavior);

        let mut buf = [0u8; 4];
        assert_eq!(rdr.read(&mut buf).unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "hook must wait for an empty read");

        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
        assert_eq!(rdr.read(&mut buf).unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn console_reads_line_by_line() {
        let mut rdr = ScriptedReader::console(CMDS);
        let mut buf = [0u8; 7];

        for cmd in CMDS {
            let n = rdr.read(&mut buf).unwrap();
            assert_eq!(n, cmd.len() + 1);
            assert_eq!(&buf[..n - 1], cmd.as_bytes());
            assert_eq!(buf[n - 1], b'\n');
        }
        // A further read would block forever on the end hook; stop here.
    }
}
