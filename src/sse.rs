//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! OpenAI-compatible endpoints send one `data: {json}` event per chunk, separated by blank
//! lines, and finish with `data: [DONE]`.  This module turns the raw byte stream of such a
//! response into a stream of [`ChatCompletionChunk`]s.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::{ChatCompletionChunk, Error, Result};

/// The payload that marks the end of the stream.
const DONE_MARKER: &str = "[DONE]";

/// Process a stream of bytes into a stream of completion chunks.
///
/// The returned stream ends at `[DONE]` or when the byte stream ends.  Transport errors,
/// malformed events and error payloads are yielded as `Err` items.
///
/// ```
/// # tokio_test::block_on(async {
/// use bytes::Bytes;
/// use futures::StreamExt;
///
/// let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(
///     b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n",
/// ))]);
/// let chunks: Vec<_> = seekchat::sse::process_sse(body).collect().await;
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].as_ref().unwrap().delta_text(), Some("Hi"));
/// # });
/// ```
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    // Bytes rather than a String so multi-byte characters split across reads survive.
    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                // First check if we have a complete event in the buffer
                if let Some(event) = take_event(&mut buffer) {
                    match parse_event(&event) {
                        Parsed::Chunk(chunk) => return Some((chunk, (stream, buffer, false))),
                        Parsed::Done => return None,
                        Parsed::Skip => continue,
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (stream, buffer, true))),
                    None => {
                        // End of stream; a final event may lack its trailing blank line.
                        if buffer.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        let event = std::mem::take(&mut buffer);
                        return match parse_event(&event) {
                            Parsed::Chunk(chunk) => Some((chunk, (stream, buffer, true))),
                            Parsed::Done | Parsed::Skip => None,
                        };
                    }
                }
            }
        },
    )
}

enum Parsed {
    Chunk(Result<ChatCompletionChunk>),
    Done,
    Skip,
}

/// Remove the first complete event (terminated by a blank line) from the buffer.
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let (end, delimiter_len) = find_delimiter(buffer)?;
    let event = buffer[..end].to_vec();
    buffer.drain(..end + delimiter_len);
    Some(event)
}

fn find_delimiter(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buffer.len() {
        if buffer[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        if buffer[i..].starts_with(b"\n\n") {
            return Some((i, 2));
        }
        i += 1;
    }
    None
}

/// Parse one raw event.
///
/// Comment lines (keep-alives) and events without data are skipped.  Multiple `data:` lines are
/// joined with newlines per the SSE format.
fn parse_event(event: &[u8]) -> Parsed {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            return Parsed::Chunk(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    match data.as_deref().map(str::trim) {
        None | Some("") => Parsed::Skip,
        Some(DONE_MARKER) => Parsed::Done,
        Some(json) => Parsed::Chunk(parse_chunk(json)),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

fn parse_chunk(json: &str) -> Result<ChatCompletionChunk> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(json) {
        return Err(Error::api(
            500,
            envelope
                .error
                .error_type
                .or_else(|| Some("stream_error".to_string())),
            envelope
                .error
                .message
                .unwrap_or_else(|| "error event in stream".to_string()),
        ));
    }
    serde_json::from_str::<ChatCompletionChunk>(json).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    type ByteResult = std::result::Result<Bytes, std::io::Error>;

    async fn collect(parts: &[&'static str]) -> Vec<Result<ChatCompletionChunk>> {
        let parts: Vec<ByteResult> = parts
            .iter()
            .map(|part| Ok(Bytes::from_static(part.as_bytes())))
            .collect();
        process_sse(stream::iter(parts)).collect().await
    }

    #[tokio::test]
    async fn parse_chunks_until_done() {
        let chunks = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ])
        .await;

        let texts: Vec<_> = chunks
            .iter()
            .map(|c| c.as_ref().unwrap().delta_text().unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn handle_split_event() {
        let chunks = collect(&[
            "data: {\"choices\":[{\"del",
            "ta\":{\"content\":\"Hi\"}}]}\n",
            "\ndata: [DONE]\n\n",
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta_text(), Some("Hi"));
    }

    #[tokio::test]
    async fn handle_multibyte_character_split_across_reads() {
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\n".as_bytes();
        // Split inside the three-byte encoding of the first character.
        let split = event.iter().position(|b| *b >= 0x80).unwrap() + 1;
        let parts: Vec<ByteResult> = vec![
            Ok(Bytes::copy_from_slice(&event[..split])),
            Ok(Bytes::copy_from_slice(&event[split..])),
        ];
        let chunks: Vec<_> = process_sse(stream::iter(parts)).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta_text(), Some("你好"));
    }

    #[tokio::test]
    async fn skip_keep_alive_comments() {
        let chunks = collect(&[
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n",
            "data: [DONE]\r\n\r\n",
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta_text(), Some("ok"));
    }

    #[tokio::test]
    async fn final_event_without_trailing_blank_line() {
        let chunks = collect(&["data: {\"usage\":{\"total_tokens\":10}}"]).await;
        assert_eq!(chunks.len(), 1);
        let usage = chunks[0].as_ref().unwrap().usage;
        assert_eq!(usage.and_then(|u| u.total_tokens), Some(10));
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let chunks = collect(&["data: {not json}\n\n"]).await;
        assert_eq!(chunks.len(), 1);
        let err = chunks[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("Failed to parse event JSON"));
    }

    #[tokio::test]
    async fn error_payload_becomes_api_error() {
        let chunks = collect(&[
            "data: {\"error\":{\"message\":\"overloaded\",\"type\":\"server_error\"}}\n\n",
        ])
        .await;
        let err = chunks[0].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "server_error: overloaded");
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let parts: Vec<ByteResult> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            )),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ];
        let chunks: Vec<_> = process_sse(stream::iter(parts)).collect().await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(chunks[1].as_ref().unwrap_err().is_streaming());
    }
}
