//! Chunk-level SSE record demultiplexing.
//!
//! The transport hands us decoded text in arbitrary chunks: a record can be
//! split mid-line, mid-prefix, or inside the blank-line terminator itself.
//! The demuxer buffers the trailing partial record between calls and emits
//! each record's joined `data:` payload as soon as the record completes.

/// Field prefix that marks payload-bearing lines within a record.
const DATA_PREFIX: &str = "data:";

/// Record terminator: a blank line, i.e. two consecutive line feeds in the
/// carriage-return-normalized stream.
const RECORD_TERMINATOR: &str = "\n\n";

/// Stateful demultiplexer turning raw text chunks into event payloads.
///
/// Feed chunks in arrival order with [`push`](Self::push); call
/// [`flush`](Self::flush) exactly once when the stream ends to surface a
/// final record that lacked its trailing blank line.
#[derive(Debug, Default)]
pub struct StreamDemuxer {
    /// Not-yet-terminated input carried across chunk boundaries.
    pending: String,
}

impl StreamDemuxer {
    /// Create a demuxer with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of decoded text.
    ///
    /// Returns the payload of every record the chunk completed, in
    /// completion order. A chunk containing no terminator only grows the
    /// internal buffer and returns nothing; a chunk containing several
    /// terminators returns several payloads.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        // Line endings vary by server; the framing is defined on line feeds
        // alone, so carriage returns are dropped before buffering.
        if chunk.contains('\r') {
            self.pending.push_str(&chunk.replace('\r', ""));
        } else {
            self.pending.push_str(chunk);
        }

        self.drain()
    }

    /// Drain the buffer at end-of-stream.
    ///
    /// Sources routinely close right after their last write, leaving the
    /// final record without a trailing blank line. Flushing appends a
    /// synthetic terminator so that record is still surfaced, then clears
    /// the buffer.
    pub fn flush(&mut self) -> Vec<String> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        self.pending.push_str(RECORD_TERMINATOR);
        let payloads = self.drain();
        self.pending.clear();
        payloads
    }

    /// Extract every complete record currently in the buffer.
    ///
    /// After this returns the buffer holds no terminator sequence.
    fn drain(&mut self) -> Vec<String> {
        let mut payloads = Vec::new();

        while let Some(pos) = self.pending.find(RECORD_TERMINATOR) {
            let record: String = self.pending[..pos].to_string();
            self.pending = self.pending[pos + RECORD_TERMINATOR.len()..].to_string();

            match parse_record(&record) {
                Some(payload) => payloads.push(payload),
                None => tracing::debug!("dropping record with no data lines"),
            }
        }

        payloads
    }
}

/// Join the `data:` line values of one raw record.
///
/// Returns `None` when no line carries the data prefix (keep-alive or
/// comment-only records), which is distinct from a payload that happens to
/// be an empty string.
fn parse_record(record: &str) -> Option<String> {
    let mut values = record
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim_start);

    let first = values.next()?;
    let mut payload = first.to_string();
    for value in values {
        payload.push('\n');
        payload.push_str(value);
    }
    Some(payload)
}
