//! Newline-delimited frame splitting for streamed responses.
//!
//! Network chunks do not respect line boundaries, and a multi-byte UTF-8
//! character may be cut in half between two chunks. The decoder buffers raw
//! bytes and only decodes a line once its terminating `\n` has arrived, so
//! the output is identical however the body was chunked.

/// Splits a chunked byte stream into complete lines.
#[derive(Debug, Default)]
pub struct StreamFrameDecoder {
    /// Bytes after the last newline seen so far.
    pending: Vec<u8>,
    /// Prefix of `pending` already searched for a newline.
    scanned: usize,
}

impl StreamFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed, in order.
    ///
    /// Blank lines are skipped and a trailing `\r` is removed. Parsing the
    /// lines is the caller's job.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.pending[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            if let Some(line) = decode_line(&self.pending[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            from = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
        lines
    }

    /// Drain the unterminated tail once the stream has ended.
    pub fn flush(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.pending);
        self.scanned = 0;
        decode_line(&tail).map(|line| line.trim().to_string())
    }

    /// Whether bytes are waiting for a newline.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        return None;
    }
    Some(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = concat!(
        r#"{"choices":[{"message":{"content":"Grüße 👋","context":{"citations":[]}}}]}"#,
        "\n",
        r#"{"choices":[{"delta":{"content":" – naïve"}}]}"#,
        "\r\n\n",
        r#"{"choices":[{"delta":{"content":"!"}}]}"#,
    );

    fn decode_in_chunks(body: &[u8], size: usize) -> Vec<String> {
        let mut decoder = StreamFrameDecoder::new();
        let mut lines: Vec<String> = body
            .chunks(size)
            .flat_map(|chunk| decoder.push_chunk(chunk))
            .collect();
        lines.extend(decoder.flush());
        lines
    }

    #[test]
    fn single_chunk_yields_all_lines() {
        let lines = decode_in_chunks(BODY.as_bytes(), BODY.len());
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Grüße 👋"));
        assert!(lines[1].ends_with('}'));
    }

    #[test]
    fn chunking_does_not_change_output() {
        let expected = decode_in_chunks(BODY.as_bytes(), BODY.len());
        for size in 1..=17 {
            assert_eq!(decode_in_chunks(BODY.as_bytes(), size), expected, "chunk size {size}");
        }
    }

    #[test]
    fn multibyte_character_split_at_boundary() {
        let line = "{\"c\":\"👋\"}\n";
        let bytes = line.as_bytes();
        let emoji_start = line.find('👋').unwrap();

        let mut decoder = StreamFrameDecoder::new();
        assert!(decoder.push_chunk(&bytes[..emoji_start + 2]).is_empty());
        let lines = decoder.push_chunk(&bytes[emoji_start + 2..]);
        assert_eq!(lines, vec!["{\"c\":\"👋\"}".to_string()]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut decoder = StreamFrameDecoder::new();
        assert!(decoder.push_chunk(b"{\"a\":").is_empty());
        assert!(decoder.has_pending());
        assert_eq!(decoder.push_chunk(b"1}\n{\"b\""), vec!["{\"a\":1}".to_string()]);
        assert_eq!(decoder.flush().as_deref(), Some("{\"b\""));
    }

    #[test]
    fn flush_ignores_whitespace_tail() {
        let mut decoder = StreamFrameDecoder::new();
        decoder.push_chunk(b"{}\n  \r");
        assert_eq!(decoder.flush(), None);
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn several_lines_in_one_chunk() {
        let mut decoder = StreamFrameDecoder::new();
        let lines = decoder.push_chunk(b"1\n2\n\n3\n");
        assert_eq!(lines, vec!["1", "2", "3"]);
    }

    #[test]
    fn long_line_in_tiny_chunks_is_scanned_once() {
        let content = "x".repeat(10_000);
        let line = format!("{{\"c\":\"{content}\"}}\n");

        let mut decoder = StreamFrameDecoder::new();
        let mut lines = Vec::new();
        for byte in line.as_bytes().chunks(1) {
            lines.extend(decoder.push_chunk(byte));
            assert_eq!(decoder.scanned, decoder.pending.len());
        }
        assert_eq!(lines, vec![line.trim_end().to_string()]);
        assert!(!decoder.has_pending());
    }
}
