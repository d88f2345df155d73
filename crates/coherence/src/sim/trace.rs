//! Memory-trace format, reader, and errors.
//!
//! A trace is line-oriented text, one event per line:
//!
//! ```text
//! <tid> <L|S> <addr> <len>
//! ```
//!
//! `tid` and `len` are decimal; `addr` is decimal or `0x`-prefixed hex.
//! Blank lines and lines starting with `#` are ignored. This is the
//! serialised form of what an instrumentation frontend observes: thread 3
//! storing 8 bytes at `0x7ffe_0010` is `3 S 0x7ffe0010 8`.

use std::io::BufRead;

use thiserror::Error;

use crate::common::AccessType;

/// One observed memory reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    /// Thread id; selects the cache the access is dispatched to.
    pub tid: usize,
    /// Load or store.
    pub kind: AccessType,
    /// Byte address of the first byte referenced.
    pub addr: u64,
    /// Number of bytes referenced.
    pub len: u64,
}

/// Failure reading or parsing a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The underlying reader failed.
    #[error("trace read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A line did not parse as an event.
    #[error("trace line {line}: {reason}")]
    Parse {
        /// 1-based line number of the offending line.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Pull-based reader over a trace stream.
#[derive(Debug)]
pub struct TraceReader<R> {
    inner: R,
    line: usize,
}

impl<R: BufRead> TraceReader<R> {
    /// Wraps a buffered reader.
    pub fn new(inner: R) -> Self {
        Self { inner, line: 0 }
    }

    /// Reads the next event, skipping blanks and comments.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Io`] on read failure and [`TraceError::Parse`]
    /// (with the line number) on a malformed record.
    pub fn next_event(&mut self) -> Result<Option<TraceEvent>, TraceError> {
        let mut buf = String::new();
        loop {
            buf.clear();
            self.line += 1;
            if self.inner.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            let text = buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return parse_event(text)
                .map(Some)
                .map_err(|reason| TraceError::Parse {
                    line: self.line,
                    reason,
                });
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceEvent, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Parses one non-empty, non-comment trace line.
fn parse_event(text: &str) -> Result<TraceEvent, String> {
    let mut fields = text.split_whitespace();
    let tid = fields.next().ok_or("missing thread id")?;
    let kind = fields.next().ok_or("missing access kind")?;
    let addr = fields.next().ok_or("missing address")?;
    let len = fields.next().ok_or("missing length")?;
    if let Some(extra) = fields.next() {
        return Err(format!("trailing field {extra:?}"));
    }

    let tid: usize = tid
        .parse()
        .map_err(|_| format!("bad thread id {tid:?}"))?;
    let kind = match kind {
        "L" | "l" => AccessType::Load,
        "S" | "s" => AccessType::Store,
        other => return Err(format!("bad access kind {other:?}, expected L or S")),
    };
    let addr = parse_u64(addr).ok_or_else(|| format!("bad address {addr:?}"))?;
    let len = parse_u64(len).ok_or_else(|| format!("bad length {len:?}"))?;

    Ok(TraceEvent {
        tid,
        kind,
        addr,
        len,
    })
}

/// Parses decimal or `0x`-prefixed hex.
fn parse_u64(text: &str) -> Option<u64> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok())
}
