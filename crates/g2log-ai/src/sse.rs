//! Incremental server-sent-event decoding.
//!
//! Only `data:` fields matter for chat-completion streams; `event:`, `id:`,
//! `retry:` and comment lines are dropped.

const DONE_SENTINEL: &str = "[DONE]";

/// Splits an arbitrarily chunked byte stream into SSE event bodies.
///
/// Bytes are buffered until a blank line (`\n\n` or `\r\n\r\n`) closes a
/// record, so chunk boundaries may fall anywhere, including inside a
/// delimiter or inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    // Bytes already searched without finding a delimiter.
    scanned: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns the bodies of every record it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut bodies = Vec::new();
        // A delimiter may straddle the previous chunk end, so back up by up to three bytes.
        let mut from = self.scanned.saturating_sub(3);
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf, from) {
            if let Some(body) = parse_record(&self.buf[..idx]) {
                bodies.push(body);
            }
            self.buf.drain(..idx + delim_len);
            from = 0;
        }
        self.scanned = self.buf.len();
        bodies
    }

    /// Parses whatever is left once the transport reports end of stream.
    ///
    /// Recovers a final record that was closed by end-of-stream instead of a
    /// blank line. The buffer is empty afterwards.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        parse_record(&rest)
    }

    /// Number of buffered bytes not yet resolved into a record.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

/// True for the `[DONE]` end-of-stream marker.
pub fn is_done_sentinel(body: &str) -> bool {
    body.trim() == DONE_SENTINEL
}

fn find_frame_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_record(bytes: &[u8]) -> Option<String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r').trim_start();
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        return None;
    }
    let body = data_lines.join("\n").trim().to_string();
    if body.is_empty() {
        return None;
    }
    Some(body)
}
