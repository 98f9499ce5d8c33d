//! Newline-delimited JSON (NDJSON) processing for streaming responses.
//!
//! This module handles parsing of NDJSON streams from the model server,
//! converting raw byte streams into structured event objects. Each line of
//! the stream is one JSON document; blank lines are skipped and a line of
//! the shape `{"error": "..."}` surfaces a server-side failure.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Process a stream of bytes into a stream of newline-delimited JSON values.
///
/// This function takes a byte stream from an HTTP response and converts it
/// into a stream of parsed values, handling line reassembly across chunk
/// boundaries, buffering, and error conditions. Chunks may split a line
/// anywhere, including inside a multi-byte UTF-8 character, so bytes are
/// buffered raw and decoded only once a full line is present. A final
/// unterminated line is flushed when the byte stream ends.
pub fn process_ndjson<S, T>(byte_stream: S) -> impl Stream<Item = Result<T>>
where
    S: Stream<Item = Result<Bytes>> + Unpin + 'static,
    T: DeserializeOwned,
{
    // Use a state machine to reassemble lines out of arbitrary chunks
    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (byte_stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                // First drain any complete lines already in the buffer
                while let Some(line) = split_line(&mut buffer) {
                    match line {
                        Ok(line) => {
                            if let Some(item) = parse_line::<T>(&line) {
                                return Some((item, (stream, buffer)));
                            }
                        }
                        Err(e) => return Some((Err(e), (stream, buffer))),
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // End of stream: flush a final unterminated line
                        if !buffer.is_empty() {
                            match decode_line(std::mem::take(&mut buffer)) {
                                Ok(line) => {
                                    if let Some(item) = parse_line::<T>(&line) {
                                        return Some((item, (stream, buffer)));
                                    }
                                }
                                Err(e) => return Some((Err(e), (stream, buffer))),
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Split the first complete line off the buffer and decode it as UTF-8.
fn split_line(buffer: &mut Vec<u8>) -> Option<Result<String>> {
    let idx = buffer.iter().position(|&b| b == b'\n')?;
    let rest = buffer.split_off(idx + 1);
    let mut line = std::mem::replace(buffer, rest);
    line.pop();
    Some(decode_line(line))
}

fn decode_line(line: Vec<u8>) -> Result<String> {
    String::from_utf8(line)
        .map_err(|e| Error::encoding(format!("invalid UTF-8 in stream: {e}"), Some(Box::new(e))))
}

/// An error payload embedded in the stream body.
#[derive(Deserialize)]
struct ErrorLine {
    error: String,
}

/// Parse a single NDJSON line. Returns None for blank lines.
fn parse_line<T: DeserializeOwned>(line: &str) -> Option<Result<T>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Ok(ErrorLine { error }) = serde_json::from_str::<ErrorLine>(line) {
        return Some(Err(Error::backend(error)));
    }
    match serde_json::from_str::<T>(line) {
        Ok(value) => Some(Ok(value)),
        Err(e) => Some(Err(Error::serialization(
            format!("malformed stream line '{line}': {e}"),
            Some(Box::new(e)),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tokio_test::{assert_pending, task};

    use crate::ChatResponse;

    fn byte_stream(chunks: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from(c))),
        ))
    }

    #[test]
    fn split_line_needs_newline() {
        let mut buffer = b"partial".to_vec();
        assert!(split_line(&mut buffer).is_none());
        assert_eq!(buffer, b"partial");

        let mut buffer = b"one\ntwo\n".to_vec();
        assert_eq!(split_line(&mut buffer).unwrap().unwrap(), "one");
        assert_eq!(buffer, b"two\n");
    }

    #[test]
    fn parse_line_skips_blank() {
        assert!(parse_line::<ChatResponse>("").is_none());
        assert!(parse_line::<ChatResponse>("   ").is_none());
    }

    #[test]
    fn parse_line_surfaces_server_error() {
        let item = parse_line::<ChatResponse>(r#"{"error": "model not loaded"}"#).unwrap();
        let err = item.unwrap_err();
        assert_eq!(err.to_string(), "server error: model not loaded");
    }

    #[tokio::test]
    async fn parse_single_event() {
        let data: &[u8] =
            b"{\"model\":\"m\",\"created_at\":\"2024-01-01T00:00:00Z\",\"done\":true}\n";
        let stream = byte_stream(vec![data]);

        let mut events = Box::pin(process_ndjson::<_, ChatResponse>(stream));
        let event = events.next().await.unwrap().unwrap();
        assert!(event.done);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_split_event() {
        // Simulate a line split across multiple chunks
        let chunk1: &[u8] = b"{\"model\":\"m\",\"created_at\":";
        let chunk2: &[u8] = b"\"2024-01-01T00:00:00Z\",\"done\":false}\n";
        let stream = byte_stream(vec![chunk1, chunk2]);

        let mut events = Box::pin(process_ndjson::<_, ChatResponse>(stream));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.model, "m");
        assert!(!event.done);
    }

    #[tokio::test]
    async fn handle_multibyte_character_split_across_chunks() {
        // The e-acute (0xC3 0xA9) straddles the chunk boundary
        let chunk1: &[u8] = b"{\"model\":\"m\",\"created_at\":\"2024-01-01T00:00:00Z\",\"message\":{\"role\":\"assistant\",\"content\":\"caf\xc3";
        let chunk2: &[u8] = b"\xa9\"},\"done\":true}\n";
        let stream = byte_stream(vec![chunk1, chunk2]);

        let mut events = Box::pin(process_ndjson::<_, ChatResponse>(stream));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.message.unwrap().content, "café");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn flush_unterminated_final_line() {
        let data: &[u8] = b"{\"model\":\"m\",\"created_at\":\"2024-01-01T00:00:00Z\",\"done\":true}";
        let stream = byte_stream(vec![data]);

        let mut events = Box::pin(process_ndjson::<_, ChatResponse>(stream));
        let event = events.next().await.unwrap().unwrap();
        assert!(event.done);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_malformed_line() {
        let data: &[u8] = b"not json at all\n";
        let stream = byte_stream(vec![data]);

        let mut events = Box::pin(process_ndjson::<_, ChatResponse>(stream));
        let event = events.next().await.unwrap();
        assert!(event.is_err());
    }

    #[test]
    fn no_event_until_line_completes() {
        let chunks = stream::iter(vec![Ok(Bytes::from(&b"{\"model\":\"m\""[..]))]);
        let source = Box::pin(chunks.chain(stream::pending()));
        let mut events = task::spawn(process_ndjson::<_, ChatResponse>(source));
        assert_pending!(events.poll_next());
    }

    #[tokio::test]
    async fn multiple_events_in_one_chunk() {
        let data: &[u8] = b"{\"model\":\"m\",\"created_at\":\"2024-01-01T00:00:00Z\",\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n{\"model\":\"m\",\"created_at\":\"2024-01-01T00:00:01Z\",\"done\":true}\n";
        let stream = byte_stream(vec![data]);

        let mut events = Box::pin(process_ndjson::<_, ChatResponse>(stream));

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first.message.unwrap().content, "Hi");

        let second = events.next().await.unwrap().unwrap();
        assert!(second.done);

        assert!(events.next().await.is_none());
    }
}
