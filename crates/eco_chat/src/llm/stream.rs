//! Line framing for streamed HTTP bodies.
//!
//! Both backends stream line-oriented bodies (SSE `data:` lines and
//! newline-delimited JSON). Lines are split on raw bytes so a multi-byte
//! character cut across two network chunks is reassembled before decoding.

use std::fmt::Display;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};

use crate::error::{ChatError, ChatResult};

struct LineState<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Split a byte stream into trimmed, non-empty text lines.
///
/// A read error is yielded once and ends the stream.
pub(crate) fn lines<S, B, E>(body: S) -> impl Stream<Item = ChatResult<String>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        body: Box::pin(body),
        buffer: Vec::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = state.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                return Some((Ok(line), state));
            }

            if state.finished {
                if state.buffer.is_empty() {
                    return None;
                }
                let raw = std::mem::take(&mut state.buffer);
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    return None;
                }
                return Some((Ok(line), state));
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    state.buffer.clear();
                    state.finished = true;
                    return Some((
                        Err(ChatError::Backend(format!("stream read error: {}", e))),
                        state,
                    ));
                }
                None => state.finished = true,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = Result<Vec<u8>, String>> + Send + 'static {
        stream::iter(parts.into_iter().map(|p| Ok(p.to_vec())))
    }

    #[tokio::test]
    async fn test_lines_across_chunk_boundaries() {
        let body = chunks(vec![b"first li", b"ne\nsecond\n\n", b"third"]);
        let collected: Vec<String> = lines(body).map(|l| l.unwrap()).collect().await;
        assert_eq!(collected, vec!["first line", "second", "third"]);
    }

    #[tokio::test]
    async fn test_multibyte_split_is_reassembled() {
        let text = "caf\u{e9} \u{1f30d}\n".as_bytes();
        let (a, b) = text.split_at(4);
        let a: &'static [u8] = Box::leak(a.to_vec().into_boxed_slice());
        let b: &'static [u8] = Box::leak(b.to_vec().into_boxed_slice());

        let collected: Vec<String> = lines(chunks(vec![a, b])).map(|l| l.unwrap()).collect().await;
        assert_eq!(collected, vec!["caf\u{e9} \u{1f30d}"]);
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let body = stream::iter(vec![
            Ok(b"one\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"two\n".to_vec()),
        ]);
        let collected: Vec<ChatResult<String>> = lines(body).collect().await;

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].as_ref().unwrap(), "one");
        assert!(matches!(collected[1], Err(ChatError::Backend(_))));
    }
}
