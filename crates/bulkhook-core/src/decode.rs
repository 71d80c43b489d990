//! Streaming JSONL decoder.
//!
//! Turns a byte stream into a lazy, forward-only sequence of records, one per
//! line. Only the current partial line is buffered. A corrupt line fails the
//! sequence instead of being skipped: callers expect the export to be
//! complete.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use thiserror::Error;

use crate::domain::{DecodedRecord, FetchError, TransportError};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed record at line {line_number}: {raw_line}")]
    MalformedRecord {
        line_number: u64,
        raw_line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("result stream failed: {0}")]
    Source(#[from] TransportError),
}

impl From<DecodeError> for FetchError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::MalformedRecord {
                line_number,
                raw_line,
                source,
            } => FetchError::MalformedRecord {
                line_number,
                raw_line,
                source,
            },
            DecodeError::Source(e) => FetchError::Transport(e),
        }
    }
}

/// Decoder over any stream of byte chunks.
///
/// Not restartable: once the source ends or an error is returned, every
/// later call yields `None`.
pub struct NdjsonDecoder<S> {
    source: S,
    buffer: BytesMut,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
    /// Physical lines consumed so far, blank ones included.
    line_number: u64,
    records_yielded: u64,
    source_done: bool,
    fused: bool,
}

impl<S> NdjsonDecoder<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: BytesMut::new(),
            scanned: 0,
            line_number: 0,
            records_yielded: 0,
            source_done: false,
            fused: false,
        }
    }

    pub fn records_yielded(&self) -> u64 {
        self.records_yielded
    }

    /// Next record, reading more of the source only when no full line is
    /// buffered.
    pub async fn next_record(&mut self) -> Option<Result<DecodedRecord, DecodeError>> {
        if self.fused {
            return None;
        }
        loop {
            if let Some(line) = self.take_line() {
                self.line_number += 1;
                match decode_line(&line, self.line_number) {
                    Ok(None) => continue,
                    Ok(Some(record)) => {
                        self.records_yielded += 1;
                        return Some(Ok(record));
                    }
                    Err(e) => {
                        self.fused = true;
                        return Some(Err(e));
                    }
                }
            }

            if self.source_done {
                self.fused = true;
                return None;
            }

            match self.source.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.fused = true;
                    return Some(Err(DecodeError::Source(e)));
                }
                None => self.source_done = true,
            }
        }
    }

    /// Split the next complete line off the buffer. After the source ended,
    /// the remainder counts as a final line even without a newline.
    fn take_line(&mut self) -> Option<BytesMut> {
        if let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let mut line = self.buffer.split_to(end + 1);
            line.truncate(end);
            self.scanned = 0;
            return Some(line);
        }
        self.scanned = self.buffer.len();

        if self.source_done && !self.buffer.is_empty() {
            self.scanned = 0;
            return Some(self.buffer.split());
        }
        None
    }

    /// Drain the rest of the sequence into memory.
    pub async fn collect_records(mut self) -> Result<Vec<DecodedRecord>, DecodeError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await {
            records.push(record?);
        }
        Ok(records)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<DecodedRecord, DecodeError>> {
        futures::stream::unfold(self, |mut decoder| async move {
            decoder.next_record().await.map(|item| (item, decoder))
        })
    }
}

/// `Ok(None)` for blank lines.
fn decode_line(line: &[u8], line_number: u64) -> Result<Option<DecodedRecord>, DecodeError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<serde_json::Value>(line)
        .map(|value| Some(DecodedRecord::new(value)))
        .map_err(|source| DecodeError::MalformedRecord {
            line_number,
            raw_line: String::from_utf8_lossy(line).into_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use rstest::rstest;
    use serde_json::json;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, TransportError>> + Unpin + use<> {
        let owned: Vec<Result<Bytes, TransportError>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(owned)
    }

    fn values(records: Vec<DecodedRecord>) -> Vec<serde_json::Value> {
        records.into_iter().map(DecodedRecord::into_value).collect()
    }

    #[tokio::test]
    async fn yields_one_record_per_line_in_order() {
        let decoder = NdjsonDecoder::new(chunks(&["{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n"]));
        let records = decoder.collect_records().await.unwrap();

        assert_eq!(values(records), vec![json!({"id":1}), json!({"id":2}), json!({"id":3})]);
    }

    #[rstest]
    #[case::blank_middle(&["{\"id\":1}\n\n{\"id\":2}\n"])]
    #[case::blank_trailing(&["{\"id\":1}\n{\"id\":2}\n\n"])]
    #[case::crlf(&["{\"id\":1}\r\n\r\n{\"id\":2}\r\n"])]
    #[case::no_final_newline(&["{\"id\":1}\n{\"id\":2}"])]
    #[case::split_inside_record(&["{\"i", "d\":1}\n{\"id\"", ":2}\n"])]
    #[case::split_at_newline(&["{\"id\":1}", "\n", "{\"id\":2}", "\n"])]
    #[case::empty_chunks(&["", "{\"id\":1}\n", "", "{\"id\":2}\n", ""])]
    fn decodes_two_records(#[case] parts: &[&str]) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let records = rt
            .block_on(NdjsonDecoder::new(chunks(parts)).collect_records())
            .unwrap();

        assert_eq!(values(records), vec![json!({"id":1}), json!({"id":2})]);
    }

    #[tokio::test]
    async fn malformed_line_stops_the_sequence() {
        let body = "{\"id\":1}\n{\"id\":2}\n{\"id\":\n{\"id\":4}\n{\"id\":5}\n";
        let mut decoder = NdjsonDecoder::new(chunks(&[body]));

        assert_eq!(decoder.next_record().await.unwrap().unwrap().into_value(), json!({"id":1}));
        assert_eq!(decoder.next_record().await.unwrap().unwrap().into_value(), json!({"id":2}));

        match decoder.next_record().await {
            Some(Err(DecodeError::MalformedRecord {
                line_number,
                raw_line,
                ..
            })) => {
                assert_eq!(line_number, 3);
                assert_eq!(raw_line, "{\"id\":");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }

        // records 4 and 5 are never yielded
        assert!(decoder.next_record().await.is_none());
        assert_eq!(decoder.records_yielded(), 2);
    }

    #[tokio::test]
    async fn line_numbers_count_blank_lines() {
        let mut decoder = NdjsonDecoder::new(chunks(&["{\"id\":1}\n\nnot json\n"]));
        decoder.next_record().await.unwrap().unwrap();

        let err = decoder.next_record().await.unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::MalformedRecord { line_number: 3, .. }));
    }

    #[tokio::test]
    async fn source_error_is_surfaced_after_buffered_records() {
        let parts: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"{\"id\":1}\n{\"id\"")),
            Err(TransportError::Unavailable("connection reset".to_string())),
        ];
        let mut decoder = NdjsonDecoder::new(stream::iter(parts));

        assert!(decoder.next_record().await.unwrap().is_ok());
        let err = decoder.next_record().await.unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::Source(TransportError::Unavailable(_))));
        assert!(decoder.next_record().await.is_none());
    }

    #[tokio::test]
    async fn empty_source_yields_nothing() {
        let mut decoder = NdjsonDecoder::new(chunks(&[]));
        assert!(decoder.next_record().await.is_none());
        assert!(decoder.next_record().await.is_none());
    }

    #[tokio::test]
    async fn into_stream_is_lazy_and_ordered() {
        let stream = NdjsonDecoder::new(chunks(&["{\"id\":1}\n{\"id\":2}\n"])).into_stream();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_ref().unwrap().id(), None);
        assert_eq!(items[1].as_ref().unwrap().as_value()["id"], 2);
    }

    #[test]
    fn decode_error_converts_into_fetch_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: FetchError = DecodeError::MalformedRecord {
            line_number: 7,
            raw_line: "{".to_string(),
            source,
        }
        .into();

        assert!(matches!(err, FetchError::MalformedRecord { line_number: 7, .. }));
    }
}
