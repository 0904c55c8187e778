//! Response framer
//!
//! Reassembles engine output chunks into complete GTP responses. A response
//! starts with `=` (success) or `?` (failure), optionally followed by a
//! numeric id, and ends with an empty line. Chunk boundaries are arbitrary:
//! a terminator split across two chunks, or several responses in one chunk,
//! are both handled.

/// One complete response block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: Option<u32>,
    pub success: bool,
    /// Payload with surrounding whitespace trimmed; may span several lines.
    pub payload: String,
}

/// Result of feeding one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Framed {
    pub responses: Vec<Response>,
    /// Set when the chunk was not part of any response.
    pub unexpected: Option<String>,
}

/// Accumulating framer state.
#[derive(Debug, Default)]
pub struct ResponseFramer {
    buf: String,
    /// Consecutive newlines seen at the end of `buf`.
    newlines: u8,
}

impl ResponseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a partial response is buffered.
    pub fn is_mid_response(&self) -> bool {
        !self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.newlines = 0;
    }

    /// Feed a chunk of output.
    ///
    /// With no partial response buffered, output that does not start with
    /// `=` or `?` is not a response at all: the rest of the chunk is returned
    /// as unexpected and never matched to a command.
    pub fn push(&mut self, bytes: &[u8]) -> Framed {
        let text = String::from_utf8_lossy(bytes);
        let mut out = Framed::default();

        for (i, ch) in text.char_indices() {
            match ch {
                '\r' => continue,
                '\n' => {
                    // Blank lines between responses.
                    if self.buf.is_empty() {
                        continue;
                    }
                    self.buf.push('\n');
                    self.newlines += 1;
                    if self.newlines == 2 {
                        out.responses.push(parse_block(&self.buf));
                        self.clear();
                    }
                }
                '=' | '?' if self.buf.is_empty() => {
                    self.buf.push(ch);
                    self.newlines = 0;
                }
                _ if self.buf.is_empty() => {
                    out.unexpected = Some(text[i..].to_string());
                    break;
                }
                _ => {
                    self.buf.push(ch);
                    self.newlines = 0;
                }
            }
        }

        out
    }
}

/// Split `=12 payload` / `? payload` into its parts.
fn parse_block(block: &str) -> Response {
    let success = block.starts_with('=');
    let rest = block.get(1..).unwrap_or("");

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let id = rest[..digits].parse().ok();
    let rest = &rest[digits..];
    let payload = rest.strip_prefix(' ').unwrap_or(rest).trim();

    Response {
        id,
        success,
        payload: payload.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(framer: &mut ResponseFramer, chunks: &[&str]) -> Vec<Response> {
        chunks
            .iter()
            .flat_map(|c| framer.push(c.as_bytes()).responses)
            .collect()
    }

    #[test]
    fn single_success_response() {
        let mut f = ResponseFramer::new();
        let r = feed(&mut f, &["= 2\n\n"]);
        assert_eq!(
            r,
            vec![Response {
                id: None,
                success: true,
                payload: "2".into()
            }]
        );
        assert!(!f.is_mid_response());
    }

    #[test]
    fn id_is_parsed_and_stripped() {
        let mut f = ResponseFramer::new();
        let r = feed(&mut f, &["=1 D4\n\n"]);
        assert_eq!(r[0].id, Some(1));
        assert_eq!(r[0].payload, "D4");

        let r = feed(&mut f, &["?17 illegal move\n\n"]);
        assert_eq!(r[0].id, Some(17));
        assert!(!r[0].success);
        assert_eq!(r[0].payload, "illegal move");
    }

    #[test]
    fn empty_payload() {
        let mut f = ResponseFramer::new();
        let r = feed(&mut f, &["=\n\n", "= \n\n"]);
        assert_eq!(r.len(), 2);
        assert!(r.iter().all(|r| r.success && r.payload.is_empty()));
    }

    #[test]
    fn terminator_split_across_chunks() {
        let mut f = ResponseFramer::new();
        assert!(f.push(b"= Leela").responses.is_empty());
        assert!(f.push(b" Zero\n").responses.is_empty());
        assert!(f.is_mid_response());
        let r = f.push(b"\n").responses;
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].payload, "Leela Zero");
    }

    #[test]
    fn multi_line_payload_is_kept() {
        let mut f = ResponseFramer::new();
        let r = feed(&mut f, &["= genmove\nplay\n", "boardsize\n\n"]);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].payload, "genmove\nplay\nboardsize");
    }

    #[test]
    fn several_responses_in_one_chunk() {
        let mut f = ResponseFramer::new();
        let r = feed(&mut f, &["= 2\n\n= Leela\n\n?  unknown command\n\n"]);
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].payload, "2");
        assert_eq!(r[1].payload, "Leela");
        assert!(!r[2].success);
        assert_eq!(r[2].payload, "unknown command");
    }

    #[test]
    fn crlf_line_endings() {
        let mut f = ResponseFramer::new();
        let r = feed(&mut f, &["= D4\r\n\r\n"]);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].payload, "D4");
    }

    #[test]
    fn leading_blank_lines_are_skipped() {
        let mut f = ResponseFramer::new();
        let r = feed(&mut f, &["\n\n= ok\n\n"]);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].payload, "ok");
    }

    #[test]
    fn non_response_output_is_unexpected() {
        let mut f = ResponseFramer::new();
        let out = f.push(b"Leela Zero 0.17 loading weights...\n");
        assert!(out.responses.is_empty());
        assert_eq!(
            out.unexpected.as_deref(),
            Some("Leela Zero 0.17 loading weights...\n")
        );
        assert!(!f.is_mid_response());

        // The framer is unaffected afterwards.
        let r = feed(&mut f, &["= 2\n\n"]);
        assert_eq!(r[0].payload, "2");
    }

    #[test]
    fn trailing_noise_after_response_is_unexpected() {
        let mut f = ResponseFramer::new();
        let out = f.push(b"= ok\n\nNN eval=0.51\n");
        assert_eq!(out.responses.len(), 1);
        assert_eq!(out.unexpected.as_deref(), Some("NN eval=0.51\n"));
        assert!(!f.is_mid_response());
    }

    #[test]
    fn continuation_chunk_is_not_unexpected() {
        let mut f = ResponseFramer::new();
        f.push(b"= A1 B2");
        let out = f.push(b" C3\n\n");
        assert!(out.unexpected.is_none());
        assert_eq!(out.responses[0].payload, "A1 B2 C3");
    }
}
