//! Incremental UTF-8 decoding for byte streams
//!
//! The relay streams raw model output bytes with no framing, so a multi-byte
//! character can be split across chunk boundaries. The decoder carries the
//! incomplete tail of one chunk into the next instead of decoding each chunk
//! independently.

/// Stateful UTF-8 decoder for chunked byte streams.
///
/// Incomplete trailing sequences are held back until more bytes arrive.
/// Bytes that can never form a valid sequence decode to U+FFFD, matching
/// lossy decoding semantics.
#[derive(Default)]
pub struct Utf8StreamDecoder {
    carry: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.carry.extend_from_slice(chunk);

        let mut out = String::new();
        let mut rest: &[u8] = &self.carry;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    // Safe split: everything before the error is valid UTF-8.
                    out.push_str(std::str::from_utf8(&rest[..valid_up_to]).unwrap_or(""));
                    match err.error_len() {
                        Some(invalid_len) => {
                            out.push('\u{FFFD}');
                            rest = &rest[valid_up_to + invalid_len..];
                        }
                        None => {
                            // Incomplete sequence at the end; keep it for the
                            // next chunk.
                            rest = &rest[valid_up_to..];
                            break;
                        }
                    }
                }
            }
        }

        self.carry = rest.to_vec();
        out
    }

    /// Flush any bytes still held after the stream ends.
    ///
    /// A non-empty carry at end of stream is a truncated sequence and decodes
    /// to a single replacement character.
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            String::new()
        } else {
            self.carry.clear();
            "\u{FFFD}".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ascii_chunks_unchanged() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"He"), "He");
        assert_eq!(decoder.decode(b"llo!"), "llo!");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn holds_split_multibyte_sequence_across_chunks() {
        // "é" is 0xC3 0xA9; split it between two chunks.
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[0x63, 0x61, 0x66, 0xC3]), "caf");
        assert_eq!(decoder.decode(&[0xA9]), "é");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn holds_split_four_byte_emoji() {
        // U+1F600 is F0 9F 98 80; split after each byte.
        let bytes = "😀".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&decoder.decode(&[*b]));
        }
        assert_eq!(out, "😀");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn replaces_invalid_bytes() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[0x61, 0xFF, 0x62]), "a\u{FFFD}b");
    }

    #[test]
    fn finish_replaces_truncated_tail() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[0xE2, 0x82]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        // Decoder is reusable after finish.
        assert_eq!(decoder.decode(b"ok"), "ok");
    }
}
