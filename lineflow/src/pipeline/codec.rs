//! Conversion between byte chunks and lines.
//!
//! Decoding splits on `\n`, strips one trailing `\r`, and decodes each line
//! as UTF-8 with invalid sequences replaced by U+FFFD. A final fragment
//! without a terminator is still a line; an empty one is not.

use super::{ByteStream, LineResultStream};
use crate::errors::{LineflowError, LineflowResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Incremental line splitter.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    /// Prefix of `buf` already searched for `\n`.
    scanned: usize,
}

impl LineDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            from = start;
        }
        if start > 0 {
            self.buf.drain(..start);
        }
        self.scanned = self.buf.len();
        lines
    }

    /// Returns the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = decode_line(&self.buf);
        self.buf.clear();
        self.scanned = 0;
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

struct DecodeState {
    bytes: ByteStream,
    decoder: LineDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Decodes a byte stream into lines.
///
/// The first error ends the stream; a partial line buffered at that point is
/// discarded.
pub fn decode_lines(bytes: ByteStream) -> LineResultStream {
    let state = DecodeState {
        bytes,
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.pending.pop_front() {
                return Some((Ok(line), st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => st.pending.extend(st.decoder.push(&chunk)),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    st.pending.extend(st.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

/// Encodes each line followed by `\n`.
pub fn encode_lines(lines: LineResultStream) -> ByteStream {
    lines
        .map_ok(|line| {
            let mut bytes = line.into_bytes();
            bytes.push(b'\n');
            bytes
        })
        .boxed()
}

/// Streams an async reader in chunks of at most `chunk_size` bytes.
pub fn reader_stream<R>(reader: R, chunk_size: usize) -> ByteStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    stream::try_unfold(reader, move |mut reader| async move {
        let mut buf = vec![0u8; chunk_size];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, LineflowError>(None);
        }
        buf.truncate(n);
        Ok(Some((buf, reader)))
    })
    .boxed()
}

/// Drains a byte stream into a (lossily decoded) string.
pub async fn collect_text(bytes: ByteStream) -> LineflowResult<String> {
    let raw = bytes
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunks(parts: &[&[u8]]) -> ByteStream {
        let owned: Vec<_> = parts.iter().map(|p| Ok(p.to_vec())).collect();
        stream::iter(owned).boxed()
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let lines: Vec<String> = decode_lines(chunks(&[b"li", b"ne1\nline", b"2\n"]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(lines, vec!["line1", "line2"]);
    }

    #[test]
    fn test_long_line_is_scanned_once() {
        let mut decoder = LineDecoder::new();
        let chunk = [b'x'; 256];
        for round in 1..=4096 {
            assert!(decoder.push(&chunk).is_empty());
            assert_eq!(decoder.scanned, round * chunk.len());
        }

        let lines = decoder.push(b"\r\nnext");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 4096 * 256);
        assert!(lines[0].bytes().all(|b| b == b'x'));
        assert_eq!(decoder.scanned, 4);
        assert_eq!(decoder.finish().as_deref(), Some("next"));
        assert_eq!(decoder.scanned, 0);
    }

    #[test]
    fn test_crlf_split_after_scanned_prefix() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"ab").is_empty());
        assert!(decoder.push(b"c\r").is_empty());
        assert_eq!(decoder.push(b"\nd\ne"), vec!["abc", "d"]);
        assert_eq!(decoder.finish().as_deref(), Some("e"));
    }

    #[tokio::test]
    async fn test_crlf_and_unterminated_tail() {
        let lines: Vec<String> = decode_lines(chunks(&[b"a\r\nb\r\n\nfoo\nbar"]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(lines, vec!["a", "b", "", "foo", "bar"]);
    }

    #[tokio::test]
    async fn test_multibyte_char_split_between_chunks() {
        let text = "héllo\n".as_bytes();
        let lines: Vec<String> = decode_lines(chunks(&[&text[..2], &text[2..]]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(lines, vec!["héllo"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let lines: Vec<String> = decode_lines(chunks(&[b"a\xffb\n"])).try_collect().await.unwrap();
        assert_eq!(lines, vec!["a\u{fffd}b"]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let lines: Vec<String> = decode_lines(chunks(&[])).try_collect().await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_error_discards_partial_line() {
        let bytes = stream::iter(vec![
            Ok(b"done\npart".to_vec()),
            Err(LineflowError::cancelled("stop")),
        ])
        .boxed();
        let out: Vec<_> = decode_lines(bytes).collect().await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "done");
        assert!(out[1].is_err());
    }

    #[tokio::test]
    async fn test_encode_then_decode_round_trips() {
        let original = vec!["x".to_string(), String::new(), "z".to_string()];
        let encoded = encode_lines(stream::iter(original.clone()).map(Ok).boxed());

        assert_eq!(collect_text(encoded).await.unwrap(), "x\n\nz\n");

        let encoded = encode_lines(stream::iter(original.clone()).map(Ok).boxed());
        let decoded: Vec<String> = decode_lines(encoded).try_collect().await.unwrap();
        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn test_reader_stream_chunks() {
        let data: &[u8] = b"abcdefg";
        let parts: Vec<Vec<u8>> = reader_stream(data, 3).try_collect().await.unwrap();
        assert_eq!(parts, vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
    }
}
