//! Incremental extraction of string fields from a chunked JSON stream
//!
//! Streamed generation endpoints deliver a JSON document in arbitrary byte
//! chunks. Chunk boundaries do not line up with JSON tokens: a key, a value,
//! an escape sequence or a multi-byte character can be split anywhere. The
//! extractor keeps just enough state between chunks to recognise
//! `"<key>" : "<value>"` pairs and emits each decoded value once its closing
//! quote arrives.
//!
//! The extractor does not validate the surrounding document. A value whose
//! escapes fail to decode contributes nothing; the stream carries on.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Between tokens
    Structural,
    /// Inside a string literal
    InString { escaped: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Nothing,
    /// The last literal was the key; a colon should follow
    Colon,
    /// Key and colon seen; the next literal is the value
    Value,
}

/// Streaming extractor for every string value stored under one key
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    key: Vec<u8>,
    state: ScanState,
    expect: Expect,
    literal: Vec<u8>,
}

impl FieldExtractor {
    /// Creates an extractor for values stored under `key`
    pub fn new(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
            state: ScanState::Structural,
            expect: Expect::Nothing,
            literal: Vec::new(),
        }
    }

    /// Creates an extractor for `"text"` fields
    pub fn text() -> Self {
        Self::new("text")
    }

    /// Feeds the next chunk and returns the values completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut completed = Vec::new();

        for &byte in chunk {
            match self.state {
                ScanState::InString { escaped: true } => {
                    self.buffer(byte);
                    self.state = ScanState::InString { escaped: false };
                }
                ScanState::InString { escaped: false } => match byte {
                    b'\\' => {
                        self.buffer(byte);
                        self.state = ScanState::InString { escaped: true };
                    }
                    b'"' => {
                        self.state = ScanState::Structural;
                        if let Some(value) = self.close_literal() {
                            completed.push(value);
                        }
                    }
                    _ => self.buffer(byte),
                },
                ScanState::Structural => match byte {
                    b'"' => {
                        self.literal.clear();
                        self.state = ScanState::InString { escaped: false };
                        if self.expect == Expect::Colon {
                            self.expect = Expect::Nothing;
                        }
                    }
                    b':' if self.expect == Expect::Colon => self.expect = Expect::Value,
                    b if b.is_ascii_whitespace() => {}
                    _ => self.expect = Expect::Nothing,
                },
            }
        }

        completed
    }

    /// Only values need their full bytes; other literals are kept just long
    /// enough to tell whether they equal the key.
    fn buffer(&mut self, byte: u8) {
        if self.expect == Expect::Value || self.literal.len() <= self.key.len() {
            self.literal.push(byte);
        }
    }

    fn close_literal(&mut self) -> Option<String> {
        if self.expect == Expect::Value {
            self.expect = Expect::Nothing;
            return decode_literal(&self.literal);
        }

        self.expect = if self.literal == self.key {
            Expect::Colon
        } else {
            Expect::Nothing
        };
        None
    }
}

fn decode_literal(raw: &[u8]) -> Option<String> {
    let mut quoted = Vec::with_capacity(raw.len() + 2);
    quoted.push(b'"');
    quoted.extend_from_slice(raw);
    quoted.push(b'"');

    match serde_json::from_slice::<String>(&quoted) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, bytes = raw.len(), "Dropping undecodable text fragment from stream");
            None
        }
    }
}

/// Accumulates all `"text"` values of a stream in arrival order
#[derive(Debug, Clone)]
pub struct StreamedText {
    extractor: FieldExtractor,
    text: String,
}

impl Default for StreamedText {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamedText {
    pub fn new() -> Self {
        Self {
            extractor: FieldExtractor::text(),
            text: String::new(),
        }
    }

    /// Feeds the next chunk of the response body
    pub fn feed(&mut self, chunk: &[u8]) {
        for value in self.extractor.push(chunk) {
            self.text.push_str(&value);
        }
    }

    /// Returns the accumulated text, trimmed
    pub fn finish(self) -> String {
        self.text.trim().to_string()
    }
}
