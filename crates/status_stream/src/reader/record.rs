use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::{Framing, StreamLimits};
use crate::error::ReadError;
use crate::reader::scan::{Scan, ValueScanner};

/// A structured value read off the wire, before typed decoding.
pub type RawRecord = Value;

/// Longest accepted length-prefix line, digits plus optional `\r`.
const MAX_PREFIX_BYTES: usize = 24;

/// Reads one complete JSON value at a time from an async byte stream.
///
/// Returns whole records or an error, never partial records. After
/// [`ReadError::EndOfStream`] or [`ReadError::Transport`] every later call
/// returns [`ReadError::EndOfStream`].
pub struct RecordReader<R> {
    reader: R,
    framing: Framing,
    limits: StreamLimits,
    buf: Vec<u8>,
    scanner: ValueScanner,
    /// Concatenated framing: drop bytes through the next newline before scanning.
    resync: bool,
    /// Length-prefixed framing: size of the frame currently being collected.
    frame_len: Option<usize>,
    /// Length-prefixed framing: bytes of a rejected frame still to be skipped.
    skip_bytes: usize,
    eof: bool,
    closed: bool,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    pub fn new(reader: R, framing: Framing, limits: StreamLimits) -> Self {
        Self {
            reader,
            framing,
            limits,
            buf: Vec::with_capacity(limits.read_chunk_bytes),
            scanner: ValueScanner::default(),
            resync: false,
            frame_len: None,
            skip_bytes: 0,
            eof: false,
            closed: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    pub async fn read_record(&mut self) -> Result<RawRecord, ReadError> {
        if self.closed {
            return Err(ReadError::EndOfStream);
        }
        let outcome = match self.framing {
            Framing::Concatenated => self.read_concatenated().await,
            Framing::LengthPrefixed => self.read_length_prefixed().await,
        };
        if matches!(
            outcome,
            Err(ReadError::EndOfStream | ReadError::Transport(_))
        ) {
            self.closed = true;
            self.buf = Vec::new();
        }
        outcome
    }

    async fn read_concatenated(&mut self) -> Result<RawRecord, ReadError> {
        loop {
            if self.resync {
                match self.buf.iter().position(|b| *b == b'\n') {
                    Some(idx) => {
                        self.buf.drain(..=idx);
                        self.resync = false;
                    }
                    None => self.buf.clear(),
                }
            }

            if !self.resync {
                if self.scanner.is_idle() {
                    self.trim_leading_whitespace();
                }
                if let Scan::Complete { end } = self.scanner.scan(&self.buf) {
                    if end > self.limits.max_record_bytes {
                        self.discard_failed_span(end);
                        return Err(self.oversized(end));
                    }
                    return self.take_scanned(end);
                }
                if self.buf.len() > self.limits.max_record_bytes {
                    let observed = self.buf.len();
                    match self.buf.iter().position(|b| *b == b'\n') {
                        Some(idx) => {
                            self.buf.drain(..=idx);
                        }
                        None => {
                            self.buf.clear();
                            self.resync = true;
                        }
                    }
                    self.scanner.reset();
                    return Err(self.oversized(observed));
                }
            }

            if self.eof {
                return self.finish_concatenated();
            }
            self.fill().await?;
        }
    }

    fn finish_concatenated(&mut self) -> Result<RawRecord, ReadError> {
        if self.resync || self.scanner.is_idle() {
            return Err(ReadError::EndOfStream);
        }
        let pending = self.scanner.finish(&self.buf);
        match pending {
            Some(end) => self.take_scanned(end),
            None => {
                let observed = self.buf.len();
                self.discard_failed_span(observed);
                Err(ReadError::Malformed {
                    reason: format!("record truncated by end of stream after {observed} bytes"),
                })
            }
        }
    }

    async fn read_length_prefixed(&mut self) -> Result<RawRecord, ReadError> {
        loop {
            if self.skip_bytes > 0 {
                let skipped = self.skip_bytes.min(self.buf.len());
                self.buf.drain(..skipped);
                self.skip_bytes -= skipped;
            }

            if self.skip_bytes == 0 {
                match self.frame_len {
                    Some(len) if self.buf.len() >= len => {
                        self.frame_len = None;
                        return self.take_record(len);
                    }
                    Some(_) => {}
                    None => {
                        self.trim_leading_whitespace();
                        if let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
                            let prefix: Vec<u8> = self.buf.drain(..=idx).collect();
                            self.accept_prefix(&prefix[..idx])?;
                            continue;
                        }
                        if self.buf.len() > MAX_PREFIX_BYTES {
                            let observed = self.buf.len();
                            self.buf.clear();
                            return Err(ReadError::Malformed {
                                reason: format!(
                                    "length prefix exceeds {MAX_PREFIX_BYTES} bytes ({observed} buffered)"
                                ),
                            });
                        }
                    }
                }
            }

            if self.eof {
                if self.frame_len.take().is_some() {
                    self.buf.clear();
                    return Err(ReadError::Malformed {
                        reason: "frame truncated by end of stream".to_string(),
                    });
                }
                return Err(ReadError::EndOfStream);
            }
            self.fill().await?;
        }
    }

    fn accept_prefix(&mut self, line: &[u8]) -> Result<(), ReadError> {
        let text = std::str::from_utf8(line).unwrap_or_default().trim();
        let len = text
            .parse::<usize>()
            .map_err(|_| ReadError::Malformed {
                reason: format!("invalid length prefix `{}`", String::from_utf8_lossy(line)),
            })?;
        if len > self.limits.max_record_bytes {
            self.skip_bytes = len;
            return Err(self.oversized(len));
        }
        self.frame_len = Some(len);
        Ok(())
    }

    /// Parses `buf[..end]` and consumes it whether or not it parses.
    fn take_record(&mut self, end: usize) -> Result<RawRecord, ReadError> {
        let outcome = parse_record(&self.buf[..end]);
        self.buf.drain(..end);
        self.scanner.reset();
        outcome
    }

    /// Like [`RecordReader::take_record`] for scanned values, but a rejected span
    /// only costs its first line.
    fn take_scanned(&mut self, end: usize) -> Result<RawRecord, ReadError> {
        let outcome = parse_record(&self.buf[..end]);
        match outcome {
            Ok(_) => {
                self.buf.drain(..end);
                self.scanner.reset();
            }
            Err(_) => self.discard_failed_span(end),
        }
        outcome
    }

    /// Drops a rejected span. A span that runs over a line break is cut at the
    /// first one, so values on the following lines are scanned again.
    fn discard_failed_span(&mut self, end: usize) {
        let cut = self.buf[..end]
            .iter()
            .position(|b| *b == b'\n')
            .map_or(end, |idx| idx + 1);
        self.buf.drain(..cut);
        self.scanner.reset();
    }

    fn trim_leading_whitespace(&mut self) {
        let leading = self
            .buf
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        if leading > 0 {
            self.buf.drain(..leading);
        }
    }

    fn oversized(&self, observed_bytes: usize) -> ReadError {
        ReadError::Malformed {
            reason: format!(
                "record too large (observed_bytes={observed_bytes}, max_record_bytes={})",
                self.limits.max_record_bytes
            ),
        }
    }

    async fn fill(&mut self) -> Result<(), ReadError> {
        self.buf.reserve(self.limits.read_chunk_bytes);
        match self.reader.read_buf(&mut self.buf).await {
            Ok(0) => {
                self.eof = true;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => Ok(()),
            Err(err) => Err(ReadError::Transport(err)),
        }
    }
}

fn parse_record(bytes: &[u8]) -> Result<RawRecord, ReadError> {
    serde_json::from_slice::<Value>(bytes).map_err(|err| ReadError::Malformed {
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn reader(input: &[u8], framing: Framing) -> RecordReader<Cursor<Vec<u8>>> {
        RecordReader::new(
            Cursor::new(input.to_vec()),
            framing,
            StreamLimits {
                max_record_bytes: 64,
                read_chunk_bytes: 7,
            },
        )
    }

    async fn collect_records(
        mut reader: RecordReader<Cursor<Vec<u8>>>,
    ) -> Vec<Result<Value, String>> {
        let mut out = Vec::new();
        loop {
            match reader.read_record().await {
                Ok(value) => out.push(Ok(value)),
                Err(ReadError::Malformed { reason }) => out.push(Err(reason)),
                Err(_) => return out,
            }
        }
    }

    #[tokio::test]
    async fn newline_delimited_records_with_keepalives() {
        let input = b"{\"n\":1}\r\n\r\n\r\n{\"n\":2}\n";
        let records = collect_records(reader(input, Framing::Concatenated)).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap()["n"], 1);
        assert_eq!(records[1].as_ref().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn back_to_back_values_without_separators() {
        let input = br#"{"n":1}{"n":2}[3]"tail""#;
        let records = collect_records(reader(input, Framing::Concatenated)).await;
        let values: Vec<_> = records.into_iter().map(Result::unwrap).collect();
        assert_eq!(values[0]["n"], 1);
        assert_eq!(values[1]["n"], 2);
        assert_eq!(values[2][0], 3);
        assert_eq!(values[3], "tail");
    }

    #[tokio::test]
    async fn malformed_record_is_skipped_and_reading_continues() {
        let input = b"{\"n\":1}\n{\"n\":,}\nnot json\n{\"n\":2}\n";
        let records = collect_records(reader(input, Framing::Concatenated)).await;
        // `not` and `json` are rejected separately.
        assert_eq!(records.len(), 5);
        assert!(records[0].is_ok());
        assert!(records[1..4].iter().all(Result::is_err));
        assert_eq!(records[4].as_ref().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn stray_token_does_not_swallow_values_on_its_line() {
        let input = b"{\"n\":1}\ngarbage {\"n\":2}\n1 2\n{\"n\":3}\n";
        let records = collect_records(reader(input, Framing::Concatenated)).await;
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].as_ref().unwrap()["n"], 1);
        assert!(records[1].is_err());
        assert_eq!(records[2].as_ref().unwrap()["n"], 2);
        assert_eq!(records[3].as_ref().unwrap(), &Value::from(1));
        assert_eq!(records[4].as_ref().unwrap(), &Value::from(2));
        assert_eq!(records[5].as_ref().unwrap()["n"], 3);
    }

    #[tokio::test]
    async fn truncated_line_only_costs_that_line() {
        let input = b"{\"n\":1}\n{\"n\":\n{\"n\":2}\n{\"n\":3}\n";
        let records = collect_records(reader(input, Framing::Concatenated)).await;
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].as_ref().unwrap()["n"], 1);
        assert!(records[1].as_ref().unwrap_err().contains("truncated"));
        assert_eq!(records[2].as_ref().unwrap()["n"], 2);
        assert_eq!(records[3].as_ref().unwrap()["n"], 3);
    }

    #[tokio::test]
    async fn unbalanced_line_is_cut_at_its_line_break_when_limit_trips() {
        let mut input = b"{\"n\":1}\n{\"oops\":[\n".to_vec();
        for _ in 0..12 {
            input.extend_from_slice(b"{\"n\":2}\n");
        }
        let records = collect_records(reader(&input, Framing::Concatenated)).await;
        assert_eq!(records.len(), 14);
        assert_eq!(records[0].as_ref().unwrap()["n"], 1);
        assert!(records[1].is_err());
        assert!(records[2..].iter().all(|r| r.as_ref().unwrap()["n"] == 2));
    }

    #[tokio::test]
    async fn unparsable_multiline_span_is_cut_at_first_line_break() {
        let input = b"{\"n\":1,\n{\"n\":2}}\n";
        let records = collect_records(reader(input, Framing::Concatenated)).await;
        assert_eq!(records.len(), 3);
        assert!(records[0].is_err());
        assert_eq!(records[1].as_ref().unwrap()["n"], 2);
        assert!(records[2].is_err());
    }

    #[tokio::test]
    async fn oversized_record_resyncs_at_next_line() {
        let mut input = b"{\"big\":\"".to_vec();
        input.extend_from_slice(&[b'a'; 100]);
        input.extend_from_slice(b"\"}\n{\"n\":2}\n");
        let records = collect_records(reader(&input, Framing::Concatenated)).await;
        assert_eq!(records.len(), 2);
        assert!(records[0].as_ref().unwrap_err().contains("too large"));
        assert_eq!(records[1].as_ref().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn truncated_tail_is_malformed_then_end_of_stream() {
        let mut reader = reader(b"{\"n\":1}\n{\"n\":", Framing::Concatenated);
        assert!(reader.read_record().await.is_ok());
        assert!(matches!(
            reader.read_record().await,
            Err(ReadError::Malformed { .. })
        ));
        assert!(matches!(
            reader.read_record().await,
            Err(ReadError::EndOfStream)
        ));
        assert!(matches!(
            reader.read_record().await,
            Err(ReadError::EndOfStream)
        ));
    }

    #[tokio::test]
    async fn length_prefixed_frames() {
        let first = br#"{"n":1}"#;
        let second = b"{\"n\":\n2}\r\n";
        let mut input = Vec::new();
        input.extend_from_slice(format!("{}\r\n", first.len()).as_bytes());
        input.extend_from_slice(first);
        input.extend_from_slice(b"\r\n\r\n");
        input.extend_from_slice(format!("{}\r\n", second.len()).as_bytes());
        input.extend_from_slice(second);

        let records = collect_records(reader(&input, Framing::LengthPrefixed)).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap()["n"], 1);
        assert_eq!(records[1].as_ref().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn length_prefixed_bad_prefix_and_oversized_frame() {
        let mut input = b"abc\n".to_vec();
        input.extend_from_slice(b"100\n");
        input.extend_from_slice(&[b' '; 100]);
        input.extend_from_slice(b"7\n{\"n\":3}");

        let records = collect_records(reader(&input, Framing::LengthPrefixed)).await;
        assert_eq!(records.len(), 3);
        assert!(records[0].as_ref().unwrap_err().contains("invalid length prefix"));
        assert!(records[1].as_ref().unwrap_err().contains("too large"));
        assert_eq!(records[2].as_ref().unwrap()["n"], 3);
    }
}
