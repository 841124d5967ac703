//! Dotenv-style file parsing
//!
//! A small, explicit grammar for `KEY=value` files such as `.env.local`.
//!
//! - Blank lines and lines starting with `#` are ignored.
//! - An optional `export ` prefix is accepted.
//! - Quoted values may span lines. A body starting with `{` is scanned as a JSON
//!   object, so quote characters inside its strings do not end the value.
//! - Otherwise single-quoted values are literal up to the next `'`, and
//!   double-quoted values end at the next unescaped `"`.
//! - Unquoted values run to the end of the line; a trailing ` # comment` is dropped.
//!
//! Backslash sequences are never interpreted. A service-account key holding
//! `\n` escapes inside its private key comes out byte-for-byte as written.
//!
//! A leading byte-order mark is ignored.
//!
//! Malformed entries are recorded as [`SyntaxError`]s and skipped; the rest of
//! the file is still parsed.

use std::fmt;

/// One `KEY=value` assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    /// 1-based line where the assignment starts
    pub line: usize,
    /// Quote character wrapping the value, if any
    pub quote: Option<char>,
}

/// Why an entry could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    MissingEquals,
    InvalidKey(String),
    Unterminated(char),
    TrailingCharacters,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::MissingEquals => write!(f, "expected KEY=value"),
            SyntaxErrorKind::InvalidKey(key) => write!(f, "invalid key {:?}", key),
            SyntaxErrorKind::Unterminated(quote) => write!(f, "unterminated {} quote", quote),
            SyntaxErrorKind::TrailingCharacters => {
                write!(f, "unexpected characters after closing quote")
            }
        }
    }
}

/// A malformed entry, with the key when it could be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct SyntaxError {
    pub line: usize,
    pub key: Option<String>,
    pub kind: SyntaxErrorKind,
}

/// Parsed contents of an env file
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    entries: Vec<Entry>,
    errors: Vec<SyntaxError>,
}

impl EnvFile {
    /// Parse file content. Never fails as a whole; see [`EnvFile::errors`].
    pub fn parse(content: &str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut cursor = Cursor::new(content);
        let mut file = EnvFile::default();

        loop {
            cursor.skip_whitespace();
            if cursor.is_eof() {
                break;
            }

            if cursor.peek() == Some('#') {
                cursor.skip_line();
                continue;
            }

            let start = cursor.pos;
            let start_line = cursor.line;
            match parse_entry(&mut cursor) {
                Ok(entry) => file.entries.push(entry),
                Err(err) => {
                    tracing::debug!("env file: skipping malformed entry: {}", err);
                    // The value was closed; only the rest of its last line is bad
                    if err.kind == SyntaxErrorKind::TrailingCharacters {
                        cursor.skip_line();
                    } else {
                        cursor.resync_after_line(start, start_line);
                    }
                    file.errors.push(err);
                }
            }
        }

        file
    }

    /// Value of the first assignment of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|e| e.value.as_str())
    }

    /// First assignment of `key`
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// First syntax error attributed to `key`
    pub fn error_for(&self, key: &str) -> Option<&SyntaxError> {
        self.errors
            .iter()
            .find(|e| e.key.as_deref() == Some(key))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }
}

fn parse_entry(cursor: &mut Cursor<'_>) -> Result<Entry, SyntaxError> {
    let line = cursor.line;

    if cursor.rest().starts_with("export ") || cursor.rest().starts_with("export\t") {
        cursor.advance("export".len());
        cursor.skip_inline_space();
    }

    let Some(eq) = cursor.rest_of_line().find('=') else {
        return Err(SyntaxError {
            line,
            key: None,
            kind: SyntaxErrorKind::MissingEquals,
        });
    };

    let key = cursor.rest()[..eq].trim().to_string();
    if !is_valid_key(&key) {
        return Err(SyntaxError {
            line,
            key: None,
            kind: SyntaxErrorKind::InvalidKey(key),
        });
    }
    cursor.advance(eq + 1);
    cursor.skip_inline_space();

    let error = |kind| SyntaxError {
        line,
        key: Some(key.clone()),
        kind,
    };

    let (value, quote) = match cursor.peek() {
        Some(q @ ('\'' | '"')) => {
            cursor.bump();
            let value = cursor
                .take_quoted(q)
                .ok_or_else(|| error(SyntaxErrorKind::Unterminated(q)))?;
            (value, Some(q))
        }
        _ => (cursor.take_unquoted(), None),
    };

    if quote.is_some() && !cursor.finish_line() {
        return Err(error(SyntaxErrorKind::TrailingCharacters));
    }

    Ok(Entry {
        key,
        value: value.to_string(),
        line,
        quote,
    })
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Byte cursor over the file, tracking the current line
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn rest_of_line(&self) -> &'a str {
        let rest = self.rest();
        match rest.find('\n') {
            Some(end) => &rest[..end],
            None => rest,
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Advance by `n` bytes that are known not to contain a newline
    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn skip_inline_space(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Jump to the line after the one starting at `start`
    fn resync_after_line(&mut self, start: usize, start_line: usize) {
        match self.src[start..].find('\n') {
            Some(offset) => {
                self.pos = start + offset + 1;
                self.line = start_line + 1;
            }
            None => self.pos = self.src.len(),
        }
    }

    /// Consume the remainder of the line after a closing quote.
    /// Only whitespace and a `#` comment are allowed there.
    fn finish_line(&mut self) -> bool {
        self.skip_inline_space();
        match self.peek() {
            None => true,
            Some('\n' | '\r') => {
                self.skip_line();
                true
            }
            Some('#') => {
                self.skip_line();
                true
            }
            Some(_) => false,
        }
    }

    fn take_until_quote(&mut self, quote: char) -> Option<&'a str> {
        let start = self.pos;
        loop {
            match self.bump()? {
                c if c == quote => return Some(&self.src[start..self.pos - 1]),
                _ => {}
            }
        }
    }

    /// Body of a value opened with `quote`, consuming the closing quote
    fn take_quoted(&mut self, quote: char) -> Option<&'a str> {
        let start = self.pos;
        let start_line = self.line;

        if self.peek() == Some('{') {
            if let Some(end) = self.scan_json_object() {
                if self.peek() == Some(quote) {
                    self.bump();
                    return Some(&self.src[start..end]);
                }
            }
            // Not a well-formed object; fall back to plain quoting
            self.pos = start;
            self.line = start_line;
        }

        match quote {
            '"' => self.take_until_unescaped_quote(),
            _ => self.take_until_quote(quote),
        }
    }

    fn take_until_unescaped_quote(&mut self) -> Option<&'a str> {
        let start = self.pos;
        loop {
            match self.bump()? {
                '\\' => {
                    self.bump()?;
                }
                '"' => return Some(&self.src[start..self.pos - 1]),
                _ => {}
            }
        }
    }

    /// Scan a brace-balanced object, honouring JSON strings.
    /// Returns the byte offset just past the closing brace.
    fn scan_json_object(&mut self) -> Option<usize> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        loop {
            let c = self.bump()?;
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(self.pos);
                    }
                }
                _ => {}
            }
        }
    }

    fn take_unquoted(&mut self) -> &'a str {
        let line = self.rest_of_line();
        self.advance(line.len());
        self.bump(); // newline

        let value = match line.find(" #").or_else(|| line.find("\t#")) {
            Some(idx) => &line[..idx],
            None => line,
        };
        value.trim()
    }
}
