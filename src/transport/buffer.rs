//! Inbound line framing and outbound byte queueing.
//!
//! Both halves are plain buffers with no socket attached, so the framing
//! rules can be exercised without a network.

use std::io::{self, Write};

use crate::error::ParseError;

/// Default limit for a single unterminated line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits an inbound byte stream into lines.
///
/// A line ends at the first CR or LF, whichever comes first. Lines are
/// trimmed and blank ones are skipped; the unterminated tail stays buffered
/// until more bytes arrive.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    max_line: usize,
    /// Dropping the rest of an oversized line until its terminator
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineFramer {
    /// Create a framer that discards partial lines longer than `max_line`
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet framed
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Next complete, non-blank line.
    ///
    /// Returns `Some(Err(LineTooLong))` once when the unterminated tail
    /// exceeds the limit. The rest of that line, up to and including its
    /// terminator, is dropped as it arrives.
    pub fn next_line(&mut self) -> Option<Result<String, ParseError>> {
        loop {
            let eol = self.buf.iter().position(|b| *b == b'\r' || *b == b'\n');

            if self.discarding {
                match eol {
                    Some(eol) => {
                        self.buf.drain(..=eol);
                        self.discarding = false;
                        continue;
                    },
                    None => {
                        self.buf.clear();
                        return None;
                    },
                }
            }

            let Some(eol) = eol else {
                if self.buf.len() > self.max_line {
                    let len = self.buf.len();
                    self.buf.clear();
                    self.discarding = true;
                    return Some(Err(ParseError::LineTooLong {
                        len,
                        limit: self.max_line,
                    }));
                }
                return None;
            };

            let raw: Vec<u8> = self.buf.drain(..=eol).collect();
            let line = String::from_utf8_lossy(&raw[..eol]);
            let line = line.trim();
            if !line.is_empty() {
                return Some(Ok(line.to_string()));
            }
        }
    }
}

/// Bytes waiting to be written, oldest first.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    buf: Vec<u8>,
}

impl OutboundQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the end of the queue
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Queued byte count
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Queued bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Issue a single write and drop the accepted prefix.
    ///
    /// A short write is normal: the unsent suffix stays queued in order.
    /// `WouldBlock` and other errors are returned untouched with the queue
    /// unchanged.
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        if self.buf.is_empty() {
            return Ok(0);
        }
        let sent = writer.write(&self.buf)?;
        if sent == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "socket accepted no bytes",
            ));
        }
        self.buf.drain(..sent);
        Ok(sent)
    }

    /// Drop everything queued, returning how much was lost
    pub fn clear(&mut self) -> usize {
        let len = self.buf.len();
        self.buf.clear();
        len
    }
}
