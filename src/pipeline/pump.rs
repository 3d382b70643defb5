//! Byte pumps between the parent and the child's standard streams.
//!
//! Each pump runs on its own thread and owns exactly one end of the
//! transfer, so no pump ever shares a buffer with another.

use std::fmt;
use std::io::{self, Read, Write};

/// One of the child's three standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdin,
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stream::Stdin => "stdin",
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        })
    }
}

/// Copy `source` into the child's stdin, then close it.
///
/// Taking the pipe by value means the write end is dropped on every path,
/// including errors, so the child always sees end-of-input.
pub(crate) fn feed<R, P>(source: &mut R, mut stdin: P) -> io::Result<u64>
where
    R: Read + ?Sized,
    P: Write,
{
    let copied = io::copy(source, &mut stdin)?;
    stdin.flush()?;
    Ok(copied)
}

/// Copy a child output pipe into `sink` until end-of-stream.
pub(crate) fn drain<P, W>(mut pipe: P, sink: &mut W) -> io::Result<u64>
where
    P: Read,
    W: Write + ?Sized,
{
    let copied = io::copy(&mut pipe, sink)?;
    sink.flush()?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Accepts `limit` bytes, then fails every write.
    struct ShortWriter {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit - self.written.len();
            if room == 0 {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "sink is full"));
            }
            let n = buf.len().min(room);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drain_copies_everything_in_order() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut sink = Vec::new();

        let copied = drain(Cursor::new(data.clone()), &mut sink).unwrap();

        assert_eq!(copied, 10_000);
        assert_eq!(sink, data);
    }

    #[test]
    fn drain_surfaces_sink_errors() {
        let mut sink = ShortWriter {
            written: Vec::new(),
            limit: 4,
        };

        let err = drain(Cursor::new(b"abcdefgh".to_vec()), &mut sink).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        assert_eq!(sink.written, b"abcd");
    }

    #[test]
    fn feed_copies_source_into_pipe() {
        let mut source = Cursor::new(b"pixels".to_vec());
        let mut pipe = Vec::new();

        let copied = feed(&mut source, &mut pipe).unwrap();

        assert_eq!(copied, 6);
        assert_eq!(pipe, b"pixels");
    }

    #[test]
    fn stream_names() {
        assert_eq!(Stream::Stdin.to_string(), "stdin");
        assert_eq!(Stream::Stdout.to_string(), "stdout");
        assert_eq!(Stream::Stderr.to_string(), "stderr");
    }
}
